use std::path::PathBuf;

use clap::Parser;
use log::info;

use crate::ldos::pipeline::{self, choose_height_direction, fft_shape};
use crate::ldos::writer::LdosWriter;
use crate::types::{Axis, Result};
use crate::vasp_parsers::outcar::Outcar;
use crate::vasp_parsers::wavecar::Wavecar;

#[derive(Debug, Parser)]
#[command(name = "rsldos",
          about = "Extract the depth-resolved DOS from a VASP WAVECAR file",
          version,
          author = "@Ionizing github.com/Ionizing")]
pub struct Opt {
    #[arg(long, short = 'w', default_value = "./WAVECAR")]
    /// WAVECAR file name.
    wavecar: PathBuf,

    #[arg(long, short = 'o', default_value = "./OUTCAR")]
    /// OUTCAR file name, used to get the Fermi level.
    outcar: PathBuf,

    #[arg(long)]
    /// Fermi level (eV). When given, OUTCAR is not read at all.
    efermi: Option<f64>,

    #[arg(long, short = 'l')]
    /// Output LDOS file name. When absent, the parsed WAVECAR info is
    /// printed and nothing is written.
    ldos: Option<PathBuf>,

    #[arg(long, short = 'c', default_value = "")]
    /// Free-text comment stored in the LDOS header.
    comment: String,
}

impl Opt {
    pub fn process(&self) -> Result<()> {
        let efermi = match self.efermi {
            Some(e) => e,
            None => {
                info!("Reading OUTCAR: {:?}", &self.outcar);
                let outcar = Outcar::from_file(&self.outcar)?;
                println!("{}", outcar);
                outcar.efermi
            }
        };

        info!("Reading WAVECAR: {:?}", &self.wavecar);
        let mut wavecar = Wavecar::from_file(&self.wavecar)?;
        println!("{}", wavecar);

        let ldos_path = match &self.ldos {
            Some(p) => p,
            None => return Ok(()), // inspect-only mode
        };

        let direction = choose_height_direction([
            wavecar.a_norm(Axis::A),
            wavecar.a_norm(Axis::B),
            wavecar.a_norm(Axis::C),
        ])?;
        let shape = fft_shape(&wavecar, direction);
        info!("Height direction: {} ({:.5} Ang), {} layers, {} transforms per band",
              direction, wavecar.a_norm(direction), shape.len, shape.n_transforms);

        let mut writer = LdosWriter::new(
            ldos_path,
            wavecar.n_spins(),
            wavecar.n_kpoints(),
            wavecar.n_bands(),
            shape.len,
            wavecar.a_norm(direction),
            efermi,
            &self.comment,
        )?;

        pipeline::process(&mut wavecar, &mut writer, direction)?;
        info!("LDOS written to {:?}", ldos_path);

        Ok(())
    }
}

pub fn run() -> Result<()> {
    Opt::parse().process()
}
