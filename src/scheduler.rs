use std::{
    sync::mpsc::{self, RecvTimeoutError, Sender},
    thread,
    time::{Duration, Instant},
};

use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::sega_pad::{
    ActivityIndicator, LineSampler, PadDecoder, PortError, ReportSink, SelectDriver,
};

const THREAD_NAME: &str = "md-pad-strobe";

/// Runs the poll and strobe timers for one decoder on a dedicated thread.
///
/// The decoder is moved into the thread and never shared; reports leave
/// through its sink.
#[derive(Debug)]
pub struct PollScheduler {
    tx: Sender<Command>,
    thread: Option<thread::JoinHandle<()>>,
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("failed to spawn strobe thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("strobe thread has stopped")]
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Pause,
    Resume,
    Shutdown,
}

/// Fixed rates for the two timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub poll_period: Duration,
    pub tick_period: Duration,
}

impl PollScheduler {
    pub fn spawn<P, I, S>(
        decoder: PadDecoder<P, I, S>,
        timing: Timing,
    ) -> Result<Self, SchedulerError>
    where
        P: LineSampler + SelectDriver + Send + 'static,
        I: ActivityIndicator + Send + 'static,
        S: ReportSink + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Command>();

        let thread = thread::Builder::new()
            .name(THREAD_NAME.into())
            .spawn(move || run_strobe(decoder, rx, timing))?;

        Ok(Self {
            tx,
            thread: Some(thread),
        })
    }

    /// Stop issuing poll events and ticks. An in-flight cycle resumes where it stopped.
    pub fn pause(&self) -> Result<(), SchedulerError> {
        self.send_command(Command::Pause)
    }

    pub fn resume(&self) -> Result<(), SchedulerError> {
        self.send_command(Command::Resume)
    }

    fn send_command(&self, command: Command) -> Result<(), SchedulerError> {
        self.tx.send(command).map_err(|_| SchedulerError::Stopped)
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        if self.tx.send(Command::Shutdown).is_ok() {
            if let Some(handle) = self.thread.take() {
                let _ = handle.join();
            }
        }
    }
}

/// Collapses a run of consecutive tick failures into a single warning.
#[derive(Debug, Default)]
struct FailureRun {
    count: u64,
}

impl FailureRun {
    /// Returns `true` when this failure opened a new run and was logged as a warning.
    fn failed(&mut self, err: &PortError) -> bool {
        self.count += 1;
        if self.count == 1 {
            warn!("strobe tick failed, retrying: {err}");
            true
        } else {
            trace!(failures = self.count, "strobe tick failed: {err}");
            false
        }
    }

    fn succeeded(&mut self) {
        if self.count > 0 {
            info!(failures = self.count, "strobe port recovered");
            self.count = 0;
        }
    }
}

fn run_strobe<P, I, S>(
    mut decoder: PadDecoder<P, I, S>,
    rx: mpsc::Receiver<Command>,
    timing: Timing,
) where
    P: LineSampler + SelectDriver,
    I: ActivityIndicator,
    S: ReportSink,
{
    let Timing {
        poll_period,
        tick_period,
    } = timing;
    let mut running = true;
    let mut failures = FailureRun::default();
    let mut next_cycle = Instant::now();
    let mut next_tick = next_cycle;

    debug!(?poll_period, ?tick_period, "strobe thread started");

    loop {
        if running {
            let now = Instant::now();

            if now >= next_cycle {
                if decoder.begin_cycle() {
                    next_tick = now;
                } else {
                    trace!("poll event while a cycle is in flight");
                }
                next_cycle += poll_period;
                if next_cycle <= now {
                    // Fell a whole period behind; drop the missed polls.
                    next_cycle = now + poll_period;
                }
                continue;
            }

            if !decoder.is_idle() && now >= next_tick {
                match decoder.tick() {
                    Ok(_) => failures.succeeded(),
                    Err(err) => {
                        failures.failed(&err);
                    }
                }
                // Overdue ticks may run back-to-back, except that a sample
                // always waits a full period after the toggle before it.
                next_tick = if decoder.needs_settle() {
                    Instant::now() + tick_period
                } else {
                    next_tick + tick_period
                };
                continue;
            }

            let deadline = if decoder.is_idle() {
                next_cycle
            } else {
                next_tick.min(next_cycle)
            };

            match rx.recv_timeout(deadline.saturating_duration_since(now)) {
                Ok(Command::Pause) => {
                    debug!(cycles = decoder.cycles_completed(), "strobe paused");
                    running = false;
                }
                Ok(Command::Resume) => {}
                Ok(Command::Shutdown) => break,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match rx.recv() {
                Ok(Command::Resume) => {
                    debug!("strobe resumed");
                    running = true;
                    next_cycle = Instant::now();
                    next_tick = next_cycle;
                }
                Ok(Command::Pause) => {}
                Ok(Command::Shutdown) => break,
                Err(_) => break,
            }
        }
    }

    debug!(cycles = decoder.cycles_completed(), "strobe thread stopped");
}
