pub mod cli;
pub mod fft;
pub mod ldos;
pub mod matrix;
pub mod types;
pub mod vasp_parsers;

pub use types::{Axis, Result};

pub use matrix::Matrix;

pub use vasp_parsers::wavecar::{
    KpointData,
    WFPrecType,
    Wavecar,
};

pub use vasp_parsers::outcar::Outcar;

pub use ldos::writer::{
    LdosHeader,
    LdosRecord,
    LdosWriter,
};
