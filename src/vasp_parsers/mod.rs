pub mod binary_io;
pub mod outcar;
pub mod wavecar;
