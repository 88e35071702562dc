use tracing::debug;

use super::buttons::ButtonMask;
use super::port::{ActivityIndicator, ReportSink};

pub const AXIS_MIN: i8 = -128;
pub const AXIS_MAX: i8 = 127;

/// Host-facing report, three packed bytes on the wire: `x`, `y`, `buttons`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GamepadReport {
    pub x: i8,
    pub y: i8,
    /// `A B C X Y Z Start Mode`, most significant bit first.
    pub buttons: u8,
}

impl GamepadReport {
    pub const LEN: usize = 3;

    pub fn from_mask(mask: ButtonMask) -> Self {
        Self {
            x: axis(mask, ButtonMask::LEFT, ButtonMask::RIGHT),
            y: axis(mask, ButtonMask::UP, ButtonMask::DOWN),
            buttons: mask.face_byte(),
        }
    }

    pub fn to_bytes(self) -> [u8; Self::LEN] {
        [self.x as u8, self.y as u8, self.buttons]
    }
}

/// Negative direction wins only when the positive one is released, and the
/// other way round. Both or neither held centers the axis.
fn axis(mask: ButtonMask, negative: ButtonMask, positive: ButtonMask) -> i8 {
    match (mask.contains(negative), mask.contains(positive)) {
        (true, false) => AXIS_MIN,
        (false, true) => AXIS_MAX,
        _ => 0,
    }
}

/// Turns the final mask of a cycle into a report and pushes it out.
pub struct CycleFinalizer<I, S> {
    indicator: I,
    sink: S,
    completed: u64,
}

impl<I, S> CycleFinalizer<I, S>
where
    I: ActivityIndicator,
    S: ReportSink,
{
    pub fn new(indicator: I, sink: S) -> Self {
        Self {
            indicator,
            sink,
            completed: 0,
        }
    }

    /// Derive the report, drive the indicator and hand the report to the sink.
    ///
    /// Delivery is fire-and-forget; the sink decides what to do with failures.
    pub fn finalize(&mut self, mask: ButtonMask) -> GamepadReport {
        let report = GamepadReport::from_mask(mask);
        self.indicator.set_active(!mask.is_empty());
        self.sink.send_report(&report);
        self.completed = self.completed.wrapping_add(1);
        debug!(
            cycle = self.completed,
            mask = format_args!("{:#06x}", mask.bits()),
            x = report.x,
            y = report.y,
            buttons = format_args!("{:#010b}", report.buttons),
            "strobe cycle finalized"
        );
        report
    }

    /// Number of cycles finalized so far.
    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }
}

#[cfg(test)]
mod tests {
    use super::{CycleFinalizer, GamepadReport};
    use crate::sega_pad::buttons::ButtonMask;
    use proptest::prelude::*;

    #[test]
    fn vertical_axis_truth_table() {
        let cases = [
            (ButtonMask::UP, -128),
            (ButtonMask::DOWN, 127),
            (ButtonMask::UP | ButtonMask::DOWN, 0),
            (ButtonMask::empty(), 0),
        ];
        for (mask, y) in cases {
            let report = GamepadReport::from_mask(mask);
            assert_eq!(report.y, y, "mask {mask:?}");
            assert_eq!(report.x, 0, "mask {mask:?}");
        }
    }

    #[test]
    fn horizontal_axis_truth_table() {
        let cases = [
            (ButtonMask::LEFT, -128),
            (ButtonMask::RIGHT, 127),
            (ButtonMask::LEFT | ButtonMask::RIGHT, 0),
            (ButtonMask::empty(), 0),
        ];
        for (mask, x) in cases {
            let report = GamepadReport::from_mask(mask);
            assert_eq!(report.x, x, "mask {mask:?}");
            assert_eq!(report.y, 0, "mask {mask:?}");
        }
    }

    #[test]
    fn wire_layout_is_x_y_buttons() {
        let report = GamepadReport::from_mask(ButtonMask::LEFT | ButtonMask::DOWN | ButtonMask::A);
        assert_eq!(report.to_bytes(), [0x80, 0x7F, 0x80]);
    }

    #[test]
    fn finalize_drives_indicator_and_sink() {
        let mut sent = Vec::new();
        let mut led = false;
        {
            let mut finalizer = CycleFinalizer::new(
                |active: bool| led = active,
                |report: &GamepadReport| sent.push(*report),
            );
            finalizer.finalize(ButtonMask::START);
            assert_eq!(finalizer.completed(), 1);
        }
        assert!(led);
        assert_eq!(
            sent,
            [GamepadReport {
                x: 0,
                y: 0,
                buttons: 0b0000_0010
            }]
        );
    }

    proptest! {
        #[test]
        fn buttons_byte_ignores_dpad(face in 0u16..=0xFF, dpad in 0u16..=0xF) {
            let mask = ButtonMask::from_bits_truncate((face << 4) | dpad);
            prop_assert_eq!(GamepadReport::from_mask(mask).buttons, face as u8);
        }

        #[test]
        fn indicator_tracks_nonzero_mask(bits in 0u16..=0x0FFF) {
            let mask = ButtonMask::from_bits_truncate(bits);
            let mut led = None;
            CycleFinalizer::new(|active: bool| led = Some(active), |_: &GamepadReport| {})
                .finalize(mask);
            prop_assert_eq!(led, Some(bits != 0));
        }
    }
}
