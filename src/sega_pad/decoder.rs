use super::buttons::ButtonMask;
use super::port::{ActivityIndicator, LineSampler, PortError, ReportSink, SelectDriver};
use super::report::{CycleFinalizer, GamepadReport};
use super::sequencer::{StrobeSequencer, TickOutcome, CYCLE_STEPS};

/// High-level interface for one Mega Drive controller port.
///
/// Bundles the pin port, the strobe sequencer and the cycle finalizer. The
/// owner calls [`PadDecoder::begin_cycle`] at the poll rate and
/// [`PadDecoder::tick`] at the strobe rate; each completed cycle produces one
/// report that is pushed to the sink.
pub struct PadDecoder<P, I, S> {
    port: P,
    sequencer: StrobeSequencer,
    finalizer: CycleFinalizer<I, S>,
}

impl<P, I, S> PadDecoder<P, I, S>
where
    P: LineSampler + SelectDriver,
    I: ActivityIndicator,
    S: ReportSink,
{
    pub fn new(port: P, indicator: I, sink: S) -> Self {
        Self {
            port,
            sequencer: StrobeSequencer::new(),
            finalizer: CycleFinalizer::new(indicator, sink),
        }
    }

    /// Arm the sequencer. No-op while a cycle is in flight.
    pub fn begin_cycle(&mut self) -> bool {
        self.sequencer.begin_cycle()
    }

    /// Advance the sequencer by one step, finalizing when the cycle closes.
    pub fn tick(&mut self) -> Result<Option<GamepadReport>, PortError> {
        match self.sequencer.tick(&mut self.port)? {
            TickOutcome::Completed(mask) => Ok(Some(self.finalizer.finalize(mask))),
            _ => Ok(None),
        }
    }

    /// Drive a whole cycle synchronously. Finishes the in-flight cycle if one
    /// is already running.
    pub fn run_cycle(&mut self) -> Result<GamepadReport, PortError> {
        self.begin_cycle();
        loop {
            if let Some(report) = self.tick()? {
                return Ok(report);
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        self.sequencer.is_idle()
    }

    /// See [`StrobeSequencer::sample_follows_strobe`].
    pub fn needs_settle(&self) -> bool {
        self.sequencer.sample_follows_strobe()
    }

    pub fn mask(&self) -> ButtonMask {
        self.sequencer.mask()
    }

    pub fn sequencer(&self) -> &StrobeSequencer {
        &self.sequencer
    }

    pub fn cycles_completed(&self) -> u64 {
        self.finalizer.completed()
    }

    pub fn indicator(&self) -> &I {
        self.finalizer.indicator()
    }
}

/// Ticks needed for one full cycle.
pub const TICKS_PER_CYCLE: u32 = CYCLE_STEPS as u32;
