use std::fmt;

pub type Result<T> = anyhow::Result<T>;

pub type Vec3 = [f64; 3];

/// Lattice axis selector, also used as the "height direction" of the
/// depth-resolved DOS (the axis the inverse FFT runs along).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    A,
    B,
    C,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::C => 2,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::A => "a1",
            Self::B => "a2",
            Self::C => "a3",
        };
        f.write_str(s)
    }
}
