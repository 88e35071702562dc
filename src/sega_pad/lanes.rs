use super::buttons::ButtonMask;

/// Input pins of the DB-9 connector as seen by the sampler.
///
/// P5 is +5V, P7 is the select output and P8 is ground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Line {
    P1,
    P2,
    P3,
    P4,
    P6,
    P9,
}

impl Line {
    pub const ALL: [Line; 6] = [Line::P1, Line::P2, Line::P3, Line::P4, Line::P6, Line::P9];
}

/// Levels of the six input lines captured at one sample event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawLineSample {
    pub p1: bool,
    pub p2: bool,
    pub p3: bool,
    pub p4: bool,
    pub p6: bool,
    pub p9: bool,
}

impl RawLineSample {
    pub fn level(&self, line: Line) -> bool {
        match line {
            Line::P1 => self.p1,
            Line::P2 => self.p2,
            Line::P3 => self.p3,
            Line::P4 => self.p4,
            Line::P6 => self.p6,
            Line::P9 => self.p9,
        }
    }

    pub fn set_level(&mut self, line: Line, high: bool) {
        let slot = match line {
            Line::P1 => &mut self.p1,
            Line::P2 => &mut self.p2,
            Line::P3 => &mut self.p3,
            Line::P4 => &mut self.p4,
            Line::P6 => &mut self.p6,
            Line::P9 => &mut self.p9,
        };
        *slot = high;
    }

    /// Sample with every listed line HIGH and the rest LOW.
    pub fn with_high(lines: &[Line]) -> Self {
        let mut sample = Self::default();
        for &line in lines {
            sample.set_level(line, true);
        }
        sample
    }
}

/// Line-to-button mapping presented by the pad for a given strobe phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    /// Select HIGH: d-pad plus B and C.
    Directional,
    /// Select LOW: only A and Start are meaningful.
    AStart,
    /// Select HIGH after the third LOW pulse: Z, Y, X, Mode plus B and C.
    Extended,
}

const DIRECTIONAL: [(Line, ButtonMask); 6] = [
    (Line::P1, ButtonMask::UP),
    (Line::P2, ButtonMask::DOWN),
    (Line::P3, ButtonMask::LEFT),
    (Line::P4, ButtonMask::RIGHT),
    (Line::P6, ButtonMask::B),
    (Line::P9, ButtonMask::C),
];

const A_START: [(Line, ButtonMask); 2] =
    [(Line::P6, ButtonMask::A), (Line::P9, ButtonMask::START)];

const EXTENDED: [(Line, ButtonMask); 6] = [
    (Line::P1, ButtonMask::Z),
    (Line::P2, ButtonMask::Y),
    (Line::P3, ButtonMask::X),
    (Line::P4, ButtonMask::MODE),
    (Line::P6, ButtonMask::B),
    (Line::P9, ButtonMask::C),
];

impl Lane {
    /// Which lane, if any, is sampled at `step`. Odd steps only strobe.
    pub const fn for_step(step: u8) -> Option<Lane> {
        match step {
            0 | 4 | 8 | 16 => Some(Lane::Directional),
            2 | 6 | 10 | 14 => Some(Lane::AStart),
            12 => Some(Lane::Extended),
            _ => None,
        }
    }

    pub fn routes(self) -> &'static [(Line, ButtonMask)] {
        match self {
            Lane::Directional => &DIRECTIONAL,
            Lane::AStart => &A_START,
            Lane::Extended => &EXTENDED,
        }
    }

    /// Every bit this lane may write.
    pub fn coverage(self) -> ButtonMask {
        self.routes()
            .iter()
            .fold(ButtonMask::empty(), |acc, &(_, bit)| acc | bit)
    }

    /// Overwrite the bits owned by this lane from `sample`. Other bits are left alone.
    pub fn apply(self, sample: &RawLineSample, mask: &mut ButtonMask) {
        for &(line, bit) in self.routes() {
            mask.record(bit, sample.level(line));
        }
    }
}
