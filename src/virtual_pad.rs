use std::sync::{
    atomic::{AtomicU16, Ordering},
    Arc,
};

use serde::{Deserialize, Serialize};

use crate::sega_pad::{ButtonMask, LineSampler, PortError, RawLineSample, SelectDriver, SelectLevel};

/// Which member of the pad family to emulate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PadKind {
    #[default]
    SixButton,
    ThreeButton,
}

/// Host-side model of a Mega Drive pad behind the inverting input stage.
///
/// Lines read HIGH for held buttons. The pad counts LOW pulses on select to
/// decide which lane to present; the counter wraps after the fourth pulse,
/// which stands in for the idle timeout of the real controller.
#[derive(Debug)]
pub struct VirtualPad {
    kind: PadKind,
    held: Arc<AtomicU16>,
    select: SelectLevel,
    pulses: u8,
}

/// Cloneable handle used to press buttons on a [`VirtualPad`] from any thread.
#[derive(Debug, Clone)]
pub struct VirtualPadHandle {
    held: Arc<AtomicU16>,
}

impl VirtualPadHandle {
    pub fn set_held(&self, mask: ButtonMask) {
        self.held.store(mask.bits(), Ordering::Relaxed);
    }

    pub fn press(&self, mask: ButtonMask) {
        self.held.fetch_or(mask.bits(), Ordering::Relaxed);
    }

    pub fn release(&self, mask: ButtonMask) {
        self.held.fetch_and(!mask.bits(), Ordering::Relaxed);
    }

    pub fn held(&self) -> ButtonMask {
        ButtonMask::from_bits_truncate(self.held.load(Ordering::Relaxed))
    }
}

impl VirtualPad {
    pub fn new(kind: PadKind) -> (Self, VirtualPadHandle) {
        let held = Arc::new(AtomicU16::new(0));
        let pad = Self {
            kind,
            held: Arc::clone(&held),
            select: SelectLevel::High,
            pulses: 0,
        };
        (pad, VirtualPadHandle { held })
    }

    fn held(&self) -> ButtonMask {
        ButtonMask::from_bits_truncate(self.held.load(Ordering::Relaxed))
    }
}

impl LineSampler for VirtualPad {
    fn read_lines(&mut self) -> Result<RawLineSample, PortError> {
        let held = self.held();
        let is = |button: ButtonMask| held.contains(button);
        let six = self.kind == PadKind::SixButton;

        let sample = match (self.select, self.pulses) {
            (SelectLevel::High, 3) if six => RawLineSample {
                p1: is(ButtonMask::Z),
                p2: is(ButtonMask::Y),
                p3: is(ButtonMask::X),
                p4: is(ButtonMask::MODE),
                p6: is(ButtonMask::B),
                p9: is(ButtonMask::C),
            },
            (SelectLevel::High, _) => RawLineSample {
                p1: is(ButtonMask::UP),
                p2: is(ButtonMask::DOWN),
                p3: is(ButtonMask::LEFT),
                p4: is(ButtonMask::RIGHT),
                p6: is(ButtonMask::B),
                p9: is(ButtonMask::C),
            },
            // Third LOW pulse grounds P1..P4: the six-button signature.
            (SelectLevel::Low, 3) if six => RawLineSample {
                p1: true,
                p2: true,
                p3: true,
                p4: true,
                p6: is(ButtonMask::A),
                p9: is(ButtonMask::START),
            },
            // Fourth LOW pulse releases P1..P4.
            (SelectLevel::Low, 4) if six => RawLineSample {
                p1: false,
                p2: false,
                p3: false,
                p4: false,
                p6: is(ButtonMask::A),
                p9: is(ButtonMask::START),
            },
            (SelectLevel::Low, _) => RawLineSample {
                p1: is(ButtonMask::UP),
                p2: is(ButtonMask::DOWN),
                p3: true,
                p4: true,
                p6: is(ButtonMask::A),
                p9: is(ButtonMask::START),
            },
        };
        Ok(sample)
    }
}

impl SelectDriver for VirtualPad {
    fn drive_select(&mut self, level: SelectLevel) -> Result<(), PortError> {
        if self.select == SelectLevel::High && level == SelectLevel::Low {
            self.pulses = self.pulses % 4 + 1;
        }
        self.select = level;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{PadKind, VirtualPad, VirtualPadHandle};
    use crate::sega_pad::{Button, ButtonMask, GamepadReport, LogIndicator, PadDecoder};
    use proptest::prelude::*;

    type TestDecoder<S> = PadDecoder<VirtualPad, LogIndicator, S>;

    fn decoder(kind: PadKind) -> (TestDecoder<impl FnMut(&GamepadReport)>, VirtualPadHandle) {
        let (pad, handle) = VirtualPad::new(kind);
        (
            PadDecoder::new(pad, LogIndicator::default(), |_: &GamepadReport| {}),
            handle,
        )
    }

    #[test]
    fn six_button_pad_reports_every_button() {
        let (mut decoder, handle) = decoder(PadKind::SixButton);
        for button in Button::ALL {
            handle.set_held(button.mask());
            decoder.run_cycle().unwrap();
            assert_eq!(decoder.mask(), button.mask(), "{}", button.name());
        }
    }

    #[test]
    fn three_button_pad_mirrors_dpad_into_extended_lane() {
        let (mut decoder, handle) = decoder(PadKind::ThreeButton);
        handle.set_held(ButtonMask::UP | ButtonMask::LEFT | ButtonMask::A | ButtonMask::X);
        decoder.run_cycle().unwrap();
        // No extended lane on this pad: step 12 sees the d-pad again.
        assert_eq!(
            decoder.mask(),
            ButtonMask::UP | ButtonMask::LEFT | ButtonMask::A | ButtonMask::Z | ButtonMask::X
        );
    }

    #[test]
    fn release_is_seen_next_cycle() {
        let (mut decoder, handle) = decoder(PadKind::SixButton);
        handle.press(ButtonMask::RIGHT | ButtonMask::C);
        let report = decoder.run_cycle().unwrap();
        assert_eq!(report.x, 127);
        handle.release(ButtonMask::RIGHT);
        let report = decoder.run_cycle().unwrap();
        assert_eq!(report.x, 0);
        assert_eq!(report.buttons, ButtonMask::C.face_byte());
        assert_eq!(handle.held(), ButtonMask::C);
    }

    proptest! {
        #[test]
        fn six_button_pad_decodes_any_combination(bits in 0u16..=0x0FFF) {
            let (mut decoder, handle) = decoder(PadKind::SixButton);
            let held = ButtonMask::from_bits_truncate(bits);
            handle.set_held(held);
            let first = decoder.run_cycle().unwrap();
            let second = decoder.run_cycle().unwrap();
            prop_assert_eq!(decoder.mask(), held);
            prop_assert_eq!(first, second);
            prop_assert_eq!(first, GamepadReport::from_mask(held));
        }
    }
}
