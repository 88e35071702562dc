use tracing::trace;

use super::buttons::ButtonMask;
use super::lanes::Lane;
use super::port::{LineSampler, PortError, SelectDriver, SelectLevel};

/// Ticks in one strobe cycle (steps 0 through 16).
pub const CYCLE_STEPS: u8 = 17;

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No cycle armed; nothing happened.
    Idle,
    /// Odd step: the select line was driven to this level.
    Strobed(SelectLevel),
    /// Even step: the lines were sampled into the mask.
    Sampled(Lane),
    /// Step 16 was sampled and the cycle closed with this mask.
    Completed(ButtonMask),
}

/// The 17-step strobe/sample state machine.
///
/// Owns the button mask so that it outlives the cycle; the step counter and
/// select level are reset each time a cycle closes.
#[derive(Debug, Clone, Default)]
pub struct StrobeSequencer {
    step: u8,
    select: SelectLevel,
    armed: bool,
    mask: ButtonMask,
}

impl StrobeSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a new cycle. Returns `false` and leaves the state untouched when a
    /// cycle is already in flight.
    pub fn begin_cycle(&mut self) -> bool {
        if self.armed {
            trace!(step = self.step, "begin_cycle ignored, cycle in flight");
            return false;
        }
        self.step = 0;
        self.select = SelectLevel::High;
        self.armed = true;
        true
    }

    /// Advance one transition.
    ///
    /// On a port error the step is not consumed, so the next tick retries it.
    pub fn tick<P>(&mut self, port: &mut P) -> Result<TickOutcome, PortError>
    where
        P: LineSampler + SelectDriver,
    {
        if !self.armed {
            return Ok(TickOutcome::Idle);
        }

        let step = self.step;
        let outcome = match Lane::for_step(step) {
            Some(lane) => {
                let sample = port.read_lines()?;
                lane.apply(&sample, &mut self.mask);
                trace!(step, ?lane, ?sample, "sampled");
                TickOutcome::Sampled(lane)
            }
            None => {
                let level = self.select.toggled();
                port.drive_select(level)?;
                self.select = level;
                trace!(step, ?level, "strobed");
                TickOutcome::Strobed(level)
            }
        };

        self.step += 1;
        if self.step < CYCLE_STEPS {
            return Ok(outcome);
        }

        self.step = 0;
        self.select = SelectLevel::High;
        self.armed = false;
        Ok(TickOutcome::Completed(self.mask))
    }

    pub fn step(&self) -> u8 {
        self.step
    }

    pub fn select_level(&self) -> SelectLevel {
        self.select
    }

    pub fn is_idle(&self) -> bool {
        !self.armed
    }

    /// True when the next tick samples lines the previous tick just switched
    /// with a select toggle.
    pub fn sample_follows_strobe(&self) -> bool {
        self.armed && self.step > 0 && Lane::for_step(self.step).is_some()
    }

    /// Last known button state; may be mid-update while a cycle runs.
    pub fn mask(&self) -> ButtonMask {
        self.mask
    }
}
