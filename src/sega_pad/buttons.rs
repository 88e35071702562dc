use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Logical button state accumulated over one strobe cycle.
    ///
    /// A set bit means the corresponding line read HIGH after the inverting
    /// input stage, i.e. the button is held.
    ///
    /// ```text
    /// bit    11 10  9  8  7  6    5     4   3    2    1     0
    ///         A  B  C  X  Y  Z Start Mode  Up Down Left Right
    /// ```
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct ButtonMask: u16 {
        const RIGHT = 1 << 0;
        const LEFT = 1 << 1;
        const DOWN = 1 << 2;
        const UP = 1 << 3;
        const MODE = 1 << 4;
        const START = 1 << 5;
        const Z = 1 << 6;
        const Y = 1 << 7;
        const X = 1 << 8;
        const C = 1 << 9;
        const B = 1 << 10;
        const A = 1 << 11;
    }
}

impl ButtonMask {
    /// The four d-pad bits. They never reach the report's button byte.
    pub const DPAD: Self = Self::UP
        .union(Self::DOWN)
        .union(Self::LEFT)
        .union(Self::RIGHT);

    /// Number of low bits occupied by the d-pad.
    pub const DPAD_BITS: u32 = 4;

    /// Write one button bit from a sampled line level.
    #[inline]
    pub fn record(&mut self, button: ButtonMask, line_high: bool) {
        self.set(button, line_high);
    }

    /// Remaining eight buttons packed into a byte (`A B C X Y Z Start Mode`, MSB first).
    #[inline]
    pub fn face_byte(self) -> u8 {
        (self.bits() >> Self::DPAD_BITS) as u8
    }

    /// Iterate over the held buttons as [`Button`] values, highest bit first.
    pub fn held(self) -> impl Iterator<Item = Button> {
        Button::ALL
            .into_iter()
            .filter(move |button| self.contains(button.mask()))
    }
}

/// One of the twelve buttons of the six-button pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    A,
    B,
    C,
    X,
    Y,
    Z,
    Start,
    Mode,
    Up,
    Down,
    Left,
    Right,
}

impl Button {
    pub const ALL: [Button; 12] = [
        Button::A,
        Button::B,
        Button::C,
        Button::X,
        Button::Y,
        Button::Z,
        Button::Start,
        Button::Mode,
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
    ];

    pub fn mask(self) -> ButtonMask {
        match self {
            Button::A => ButtonMask::A,
            Button::B => ButtonMask::B,
            Button::C => ButtonMask::C,
            Button::X => ButtonMask::X,
            Button::Y => ButtonMask::Y,
            Button::Z => ButtonMask::Z,
            Button::Start => ButtonMask::START,
            Button::Mode => ButtonMask::MODE,
            Button::Up => ButtonMask::UP,
            Button::Down => ButtonMask::DOWN,
            Button::Left => ButtonMask::LEFT,
            Button::Right => ButtonMask::RIGHT,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Button::A => "A",
            Button::B => "B",
            Button::C => "C",
            Button::X => "X",
            Button::Y => "Y",
            Button::Z => "Z",
            Button::Start => "Start",
            Button::Mode => "Mode",
            Button::Up => "Up",
            Button::Down => "Down",
            Button::Left => "Left",
            Button::Right => "Right",
        }
    }
}

impl FromIterator<Button> for ButtonMask {
    fn from_iter<T: IntoIterator<Item = Button>>(iter: T) -> Self {
        iter.into_iter()
            .fold(ButtonMask::empty(), |mask, button| mask | button.mask())
    }
}
