use std::{
    path::PathBuf,
    sync::mpsc::{self, RecvTimeoutError},
    thread,
    time::{Duration, Instant},
};

use anyhow::bail;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use md_pad_bridge::{
    config::{BoardConfig, ScriptStep},
    scheduler::{PollScheduler, Timing},
    sega_pad::{Button, ButtonMask, GamepadReport, LogIndicator, PadDecoder},
    virtual_pad::{VirtualPad, VirtualPadHandle},
};

const REPORT_WAIT: Duration = Duration::from_millis(2);
const SCRIPT_TAIL: Duration = Duration::from_millis(250);

/// Mega Drive six-button pad decoder
#[derive(Parser, Debug)]
#[command(name = "md-pad-bridge")]
#[command(about = "Decode a Mega Drive pad into gamepad reports", long_about = None)]
struct Args {
    /// Board description (YAML)
    #[arg(short, long, default_value = "board.yml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: Level,

    /// Stop after this many milliseconds. Defaults to the end of the button
    /// script; runs forever when the script is empty.
    #[arg(long)]
    duration_ms: Option<u64>,

    /// Print the raw 12-bit button mask instead of gamepad reports
    #[arg(long)]
    raw: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = BoardConfig::load(&args.config)?;
    info!(
        pad = ?config.pad,
        poll_hz = config.poll_rate_hz,
        tick_hz = config.tick_rate_hz,
        steps = config.script.len(),
        "board loaded from {}",
        args.config.display()
    );

    let run_for = args
        .duration_ms
        .map(Duration::from_millis)
        .or_else(|| {
            config
                .script
                .last()
                .map(|step| step.offset() + SCRIPT_TAIL)
        });

    let (pad, handle) = VirtualPad::new(config.pad);
    let player = ScriptPlayer::new(config.script.clone(), handle);

    if args.raw {
        run_raw(pad, player, &config, run_for)
    } else {
        run_reports(pad, player, &config, run_for)
    }
}

/// Threaded mode: the strobe thread produces reports, this thread logs them.
fn run_reports(
    pad: VirtualPad,
    mut player: ScriptPlayer,
    config: &BoardConfig,
    run_for: Option<Duration>,
) -> anyhow::Result<()> {
    let (tx, rx) = mpsc::channel::<GamepadReport>();
    let decoder = PadDecoder::new(pad, LogIndicator::default(), tx);
    let scheduler = PollScheduler::spawn(
        decoder,
        Timing {
            poll_period: config.poll_period(),
            tick_period: config.tick_period(),
        },
    )?;

    let start = Instant::now();
    let mut last: Option<GamepadReport> = None;
    let mut received: u64 = 0;

    loop {
        let elapsed = start.elapsed();
        if run_for.is_some_and(|limit| elapsed >= limit) {
            break;
        }
        player.apply_due(elapsed);

        match rx.recv_timeout(REPORT_WAIT) {
            Ok(report) => {
                received += 1;
                // Only the newest report matters.
                let report = rx.try_iter().fold(report, |_, newer| {
                    received += 1;
                    newer
                });
                if last != Some(report) {
                    info!(
                        x = report.x,
                        y = report.y,
                        buttons = format_args!("{:#010b}", report.buttons),
                        bytes = ?report.to_bytes(),
                        "report"
                    );
                    last = Some(report);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => bail!("strobe thread exited unexpectedly"),
        }
    }

    drop(scheduler);
    info!(reports = received, "done");
    Ok(())
}

/// Bench mode: cycle the decoder on this thread and show the raw mask.
fn run_raw(
    pad: VirtualPad,
    mut player: ScriptPlayer,
    config: &BoardConfig,
    run_for: Option<Duration>,
) -> anyhow::Result<()> {
    let mut decoder = PadDecoder::new(pad, LogIndicator::default(), |_: &GamepadReport| {});
    let poll_period = config.poll_period();
    let start = Instant::now();
    let mut last: Option<ButtonMask> = None;

    loop {
        let elapsed = start.elapsed();
        if run_for.is_some_and(|limit| elapsed >= limit) {
            break;
        }
        player.apply_due(elapsed);

        decoder.run_cycle()?;
        let mask = decoder.mask();
        if last != Some(mask) {
            let held: Vec<&str> = mask.held().map(Button::name).collect();
            info!(
                mask = format_args!("{:#014b}", mask.bits()),
                held = %held.join(" "),
                led = decoder.indicator().is_active(),
                "buttons"
            );
            last = Some(mask);
        }

        thread::sleep(poll_period);
    }

    info!(cycles = decoder.cycles_completed(), "done");
    Ok(())
}

/// Presses buttons on the virtual pad as the script comes due.
struct ScriptPlayer {
    steps: Vec<ScriptStep>,
    next: usize,
    handle: VirtualPadHandle,
}

impl ScriptPlayer {
    fn new(steps: Vec<ScriptStep>, handle: VirtualPadHandle) -> Self {
        Self {
            steps,
            next: 0,
            handle,
        }
    }

    fn apply_due(&mut self, elapsed: Duration) {
        while let Some(step) = self.steps.get(self.next) {
            if step.offset() > elapsed {
                break;
            }
            let mask = step.mask();
            info!(at_ms = step.after_ms, hold = ?step.hold, "script");
            self.handle.set_held(mask);
            self.next += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::ScriptPlayer;
    use md_pad_bridge::config::ScriptStep;
    use md_pad_bridge::sega_pad::{Button, ButtonMask};
    use md_pad_bridge::virtual_pad::{PadKind, VirtualPad};

    #[test]
    fn script_player_applies_steps_in_order() {
        let (_pad, handle) = VirtualPad::new(PadKind::SixButton);
        let steps = vec![
            ScriptStep {
                after_ms: 0,
                hold: vec![Button::Up],
            },
            ScriptStep {
                after_ms: 10,
                hold: vec![Button::A, Button::Start],
            },
        ];
        let mut player = ScriptPlayer::new(steps, handle.clone());

        player.apply_due(Duration::from_millis(5));
        assert_eq!(handle.held(), ButtonMask::UP);

        player.apply_due(Duration::from_millis(10));
        assert_eq!(handle.held(), ButtonMask::A | ButtonMask::START);
    }
}
