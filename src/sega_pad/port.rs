use std::sync::mpsc::Sender;

use embedded_hal::digital::{Error as _, ErrorKind, InputPin, OutputPin, PinState};
use thiserror::Error;
use tracing::{info, trace, warn};

use super::lanes::{Line, RawLineSample};
use super::report::GamepadReport;

/// Level of the multiplexer select line (DB-9 pin 7).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectLevel {
    #[default]
    High,
    Low,
}

impl SelectLevel {
    pub fn toggled(self) -> Self {
        match self {
            SelectLevel::High => SelectLevel::Low,
            SelectLevel::Low => SelectLevel::High,
        }
    }

    pub fn is_high(self) -> bool {
        self == SelectLevel::High
    }
}

impl From<SelectLevel> for PinState {
    fn from(level: SelectLevel) -> Self {
        PinState::from(level.is_high())
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PortError {
    #[error("failed to read line {line:?}: {kind:?}")]
    Sample { line: Line, kind: ErrorKind },
    #[error("failed to drive select line {level:?}: {kind:?}")]
    Select { level: SelectLevel, kind: ErrorKind },
    #[error("failed to drive activity indicator: {kind:?}")]
    Indicator { kind: ErrorKind },
}

/// Reads the six protocol lines.
pub trait LineSampler {
    fn read_lines(&mut self) -> Result<RawLineSample, PortError>;
}

/// Drives the select line.
pub trait SelectDriver {
    fn drive_select(&mut self, level: SelectLevel) -> Result<(), PortError>;
}

/// Output that shows whether any button was held during the last cycle.
pub trait ActivityIndicator {
    fn set_active(&mut self, active: bool);
}

/// Destination for finished reports. Delivery is never awaited or retried.
pub trait ReportSink {
    fn send_report(&mut self, report: &GamepadReport);
}

impl<F> ActivityIndicator for F
where
    F: FnMut(bool),
{
    fn set_active(&mut self, active: bool) {
        self(active)
    }
}

impl<F> ReportSink for F
where
    F: FnMut(&GamepadReport),
{
    fn send_report(&mut self, report: &GamepadReport) {
        self(report)
    }
}

impl ReportSink for Sender<GamepadReport> {
    fn send_report(&mut self, report: &GamepadReport) {
        if self.send(*report).is_err() {
            warn!("report receiver is gone, dropping report");
        }
    }
}

/// The six input pins and the select output of one controller port.
///
/// All inputs share one pin type, which is what GPIO banks usually hand out.
pub struct PinBank<I, O> {
    p1: I,
    p2: I,
    p3: I,
    p4: I,
    p6: I,
    p9: I,
    select: O,
}

impl<I, O> PinBank<I, O>
where
    I: InputPin,
    O: OutputPin,
{
    /// Take ownership of the pins in connector order and park select HIGH.
    pub fn new(inputs: [I; 6], mut select: O) -> Result<Self, PortError> {
        select.set_high().map_err(|err| PortError::Select {
            level: SelectLevel::High,
            kind: err.kind(),
        })?;
        let [p1, p2, p3, p4, p6, p9] = inputs;
        Ok(Self {
            p1,
            p2,
            p3,
            p4,
            p6,
            p9,
            select,
        })
    }

    fn pin(&mut self, line: Line) -> &mut I {
        match line {
            Line::P1 => &mut self.p1,
            Line::P2 => &mut self.p2,
            Line::P3 => &mut self.p3,
            Line::P4 => &mut self.p4,
            Line::P6 => &mut self.p6,
            Line::P9 => &mut self.p9,
        }
    }
}

impl<I, O> LineSampler for PinBank<I, O>
where
    I: InputPin,
    O: OutputPin,
{
    fn read_lines(&mut self) -> Result<RawLineSample, PortError> {
        let mut sample = RawLineSample::default();
        for line in Line::ALL {
            let high = self.pin(line).is_high().map_err(|err| PortError::Sample {
                line,
                kind: err.kind(),
            })?;
            sample.set_level(line, high);
        }
        Ok(sample)
    }
}

impl<I, O> SelectDriver for PinBank<I, O>
where
    I: InputPin,
    O: OutputPin,
{
    fn drive_select(&mut self, level: SelectLevel) -> Result<(), PortError> {
        self.select
            .set_state(level.into())
            .map_err(|err| PortError::Select {
                level,
                kind: err.kind(),
            })
    }
}

/// Activity LED on a GPIO output.
pub struct PinIndicator<O> {
    pin: O,
    active_low: bool,
}

impl<O: OutputPin> PinIndicator<O> {
    /// Take the LED pin and switch it off.
    pub fn new(pin: O, active_low: bool) -> Result<Self, PortError> {
        let mut indicator = Self { pin, active_low };
        let off = indicator.level(false);
        indicator
            .pin
            .set_state(off)
            .map_err(|err| PortError::Indicator { kind: err.kind() })?;
        Ok(indicator)
    }

    fn level(&self, active: bool) -> PinState {
        PinState::from(active != self.active_low)
    }
}

impl<O: OutputPin> ActivityIndicator for PinIndicator<O> {
    fn set_active(&mut self, active: bool) {
        let state = self.level(active);
        if let Err(err) = self.pin.set_state(state) {
            warn!("activity indicator write failed: {:?}", err.kind());
        }
    }
}

/// Indicator that only logs transitions.
#[derive(Debug, Default)]
pub struct LogIndicator {
    active: bool,
}

impl LogIndicator {
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl ActivityIndicator for LogIndicator {
    fn set_active(&mut self, active: bool) {
        if active != self.active {
            info!(active, "activity indicator");
        } else {
            trace!(active, "activity indicator unchanged");
        }
        self.active = active;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::convert::Infallible;
    use std::rc::Rc;
    use std::sync::mpsc;

    use embedded_hal::digital::{ErrorKind, ErrorType, InputPin, OutputPin};

    use super::{
        ActivityIndicator, LineSampler, PinBank, PinIndicator, PortError, ReportSink,
        SelectDriver, SelectLevel,
    };
    use crate::sega_pad::lanes::{Line, RawLineSample};
    use crate::sega_pad::report::GamepadReport;

    #[derive(Clone, Default)]
    struct FakeInput(Rc<RefCell<bool>>);

    impl ErrorType for FakeInput {
        type Error = Infallible;
    }

    impl InputPin for FakeInput {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Ok(*self.0.borrow())
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Ok(!*self.0.borrow())
        }
    }

    #[derive(Clone, Default)]
    struct FakeOutput(Rc<RefCell<Vec<bool>>>);

    impl ErrorType for FakeOutput {
        type Error = Infallible;
    }

    impl OutputPin for FakeOutput {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.0.borrow_mut().push(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.0.borrow_mut().push(true);
            Ok(())
        }
    }

    struct BrokenPin;

    impl ErrorType for BrokenPin {
        type Error = ErrorKind;
    }

    impl InputPin for BrokenPin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Err(ErrorKind::Other)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Err(ErrorKind::Other)
        }
    }

    impl OutputPin for BrokenPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            Err(ErrorKind::Other)
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            Err(ErrorKind::Other)
        }
    }

    fn inputs() -> [FakeInput; 6] {
        Default::default()
    }

    #[test]
    fn pin_bank_parks_select_high() {
        let select = FakeOutput::default();
        let _bank = PinBank::new(inputs(), select.clone()).unwrap();
        assert_eq!(*select.0.borrow(), [true]);
    }

    #[test]
    fn pin_bank_reads_lines_in_connector_order() {
        let pins = inputs();
        *pins[1].0.borrow_mut() = true;
        *pins[5].0.borrow_mut() = true;
        let mut bank = PinBank::new(pins, FakeOutput::default()).unwrap();
        assert_eq!(
            bank.read_lines().unwrap(),
            RawLineSample::with_high(&[Line::P2, Line::P9])
        );
    }

    #[test]
    fn pin_bank_drives_select_levels() {
        let select = FakeOutput::default();
        let mut bank = PinBank::new(inputs(), select.clone()).unwrap();
        bank.drive_select(SelectLevel::Low).unwrap();
        bank.drive_select(SelectLevel::High).unwrap();
        assert_eq!(*select.0.borrow(), [true, false, true]);
    }

    #[test]
    fn pin_bank_reports_failing_line() {
        let pins = [BrokenPin, BrokenPin, BrokenPin, BrokenPin, BrokenPin, BrokenPin];
        let mut bank = PinBank::new(pins, FakeOutput::default()).unwrap();
        assert_eq!(
            bank.read_lines(),
            Err(PortError::Sample {
                line: Line::P1,
                kind: ErrorKind::Other
            })
        );
    }

    #[test]
    fn indicator_starts_off() {
        let led = FakeOutput::default();
        let _indicator = PinIndicator::new(led.clone(), true).unwrap();
        assert_eq!(*led.0.borrow(), [true]);

        let led = FakeOutput::default();
        let _indicator = PinIndicator::new(led.clone(), false).unwrap();
        assert_eq!(*led.0.borrow(), [false]);
    }

    #[test]
    fn indicator_reports_failing_pin() {
        assert_eq!(
            PinIndicator::new(BrokenPin, true).err(),
            Some(PortError::Indicator {
                kind: ErrorKind::Other
            })
        );
    }

    #[test]
    fn active_low_indicator_inverts() {
        let led = FakeOutput::default();
        let mut indicator = PinIndicator::new(led.clone(), true).unwrap();
        indicator.set_active(true);
        indicator.set_active(false);
        assert_eq!(*led.0.borrow(), [true, false, true]);
    }

    #[test]
    fn channel_sink_survives_closed_receiver() {
        let (mut tx, rx) = mpsc::channel();
        tx.send_report(&GamepadReport::default());
        assert_eq!(rx.recv().unwrap(), GamepadReport::default());
        drop(rx);
        tx.send_report(&GamepadReport::default());
    }
}
