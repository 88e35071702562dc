//! Strobe/sample decoding of the Mega Drive pad protocol.

mod buttons;
mod decoder;
mod lanes;
mod port;
mod report;
mod sequencer;

pub use buttons::{Button, ButtonMask};
pub use decoder::{PadDecoder, TICKS_PER_CYCLE};
pub use lanes::{Lane, Line, RawLineSample};
pub use port::{
    ActivityIndicator, LineSampler, LogIndicator, PinBank, PinIndicator, PortError, ReportSink,
    SelectDriver, SelectLevel,
};
pub use report::{CycleFinalizer, GamepadReport, AXIS_MAX, AXIS_MIN};
pub use sequencer::{StrobeSequencer, TickOutcome, CYCLE_STEPS};
