use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use anyhow::{bail, Context};
use byteorder::{LittleEndian, ReadBytesExt};
use num_complex::Complex;
use rustfft::FftNum;

use crate::matrix::Matrix;
use crate::types::{Axis, Result, Vec3};
use crate::vasp_parsers::binary_io::ReadValuesExt;

/// 2m/hbar^2 in 1/(eV * Ang^2), the conversion factor between the plane-wave
/// cutoff energy and the G-sphere radius squared.
pub const TWO_M_OVER_HBAR_SQ: f64 = 0.262465831;

const PI: f64 = std::f64::consts::PI;

const SINGLE_PRECISION_TAG: f64 = 45200.0;
const DOUBLE_PRECISION_TAG: f64 = 45210.0;

/// Wavefunction precision type.
///
/// VASP stores the band coefficients either as complex32 or complex64; the
/// precision tag in WAVECAR's header tells which one, and it is fixed for
/// the whole file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WFPrecType {
    Complex32,
    Complex64,
}

/// Scalar type of the on-disk plane-wave coefficients, f32 or f64.
pub trait WavecarPrec: FftNum {
    const PREC_TYPE: WFPrecType;

    fn read_complex_into<R: Read>(reader: &mut R, buf: &mut [Complex<Self>]) -> io::Result<()>;

    fn as_f32(self) -> f32;
}

impl WavecarPrec for f32 {
    const PREC_TYPE: WFPrecType = WFPrecType::Complex32;

    fn read_complex_into<R: Read>(reader: &mut R, buf: &mut [Complex<f32>]) -> io::Result<()> {
        for c in buf.iter_mut() {
            let re = reader.read_f32::<LittleEndian>()?;
            let im = reader.read_f32::<LittleEndian>()?;
            *c = Complex::new(re, im);
        }
        Ok(())
    }

    fn as_f32(self) -> f32 {
        self
    }
}

impl WavecarPrec for f64 {
    const PREC_TYPE: WFPrecType = WFPrecType::Complex64;

    fn read_complex_into<R: Read>(reader: &mut R, buf: &mut [Complex<f64>]) -> io::Result<()> {
        for c in buf.iter_mut() {
            let re = reader.read_f64::<LittleEndian>()?;
            let im = reader.read_f64::<LittleEndian>()?;
            *c = Complex::new(re, im);
        }
        Ok(())
    }

    fn as_f32(self) -> f32 {
        self as f32
    }
}

/// One (spin, kpoint)'s worth of WAVECAR content.
///
/// Designed to be reused: `Wavecar::get_kpoint_data` refills it in place and
/// only reallocates when a buffer is too small.
#[derive(Debug, Clone)]
pub struct KpointData<T> {
    pub k: Vec3,
    pub n_plane_waves: usize,
    pub energies: Vec<f64>,
    pub occupations: Vec<f64>,
    /// G-sphere indices, in the exact order the coefficients are stored.
    pub gs: Vec<[usize; 3]>,
    /// Plane-wave coefficients, one column per band.
    pub coeffs: Matrix<Complex<T>>,
}

impl<T> Default for KpointData<T> {
    fn default() -> Self {
        Self {
            k: [0.0; 3],
            n_plane_waves: 0,
            energies: Vec::new(),
            occupations: Vec::new(),
            gs: Vec::new(),
            coeffs: Matrix::default(),
        }
    }
}

/// WAVECAR reader.
///
/// Parses the two header records eagerly and derives the reciprocal lattice
/// and the G-sphere bounds; band coefficients are pulled per (spin, kpoint)
/// on demand.
#[derive(Debug)]
pub struct Wavecar {
    file: BufReader<File>,
    record_length: u64,

    n_spins: usize,
    n_kpoints: usize,
    n_bands: usize,

    e_cut: f64,
    a: [Vec3; 3], // direct lattice
    b: [Vec3; 3], // reciprocal lattice

    // Maximum index i_m of reciprocal lattice vectors in the expansion,
    // the total number of vectors along that axis is 2 * i_m + 1.
    max_g: [usize; 3],

    prec_type: WFPrecType,
}

impl Wavecar {
    pub fn from_file(path: &(impl AsRef<Path> + ?Sized)) -> Result<Self> {
        let file = File::open(path.as_ref())
            .context(format!("Failed to open WAVECAR {:?}", path.as_ref()))?;

        let mut wavecar = Self {
            file: BufReader::new(file),
            record_length: 0,
            n_spins: 0,
            n_kpoints: 0,
            n_bands: 0,
            e_cut: 0.0,
            a: [[0.0; 3]; 3],
            b: [[0.0; 3]; 3],
            max_g: [0; 3],
            prec_type: WFPrecType::Complex64,
        };

        wavecar.read_header()?;
        wavecar.compute_reciprocal()?;
        Ok(wavecar)
    }

    pub fn prec_type(&self) -> WFPrecType {
        self.prec_type
    }

    pub fn is_single_precision(&self) -> bool {
        self.prec_type == WFPrecType::Complex32
    }

    pub fn n_spins(&self) -> usize {
        self.n_spins
    }

    pub fn n_kpoints(&self) -> usize {
        self.n_kpoints
    }

    pub fn n_bands(&self) -> usize {
        self.n_bands
    }

    pub fn e_cut(&self) -> f64 {
        self.e_cut
    }

    pub fn a(&self, axis: Axis) -> &Vec3 {
        &self.a[axis.index()]
    }

    pub fn a_norm(&self, axis: Axis) -> f64 {
        norm(&self.a[axis.index()])
    }

    /// Extent of the G grid along `axis`, always odd.
    pub fn size_g(&self, axis: Axis) -> usize {
        2 * self.max_g[axis.index()] + 1
    }

    /// Refills `data` with everything stored for one (spin, kpoint).
    ///
    /// The G-sphere is recomputed from the header geometry and this kpoint's
    /// wavevector; its size must agree with the plane-wave count stored on
    /// disk, otherwise the file is rejected.
    pub fn get_kpoint_data<T: WavecarPrec>(
        &mut self,
        ispin: usize,
        ikpoint: usize,
        data: &mut KpointData<T>,
    ) -> Result<()> {
        debug_assert!(ispin < self.n_spins);
        debug_assert!(ikpoint < self.n_kpoints);
        debug_assert_eq!(T::PREC_TYPE, self.prec_type);

        data.energies.resize(self.n_bands, 0.0);
        data.occupations.resize(self.n_bands, 0.0);

        let mut record = 2 + (self.n_bands as u64 + 1)
            * (ispin as u64 * self.n_kpoints as u64 + ikpoint as u64);
        self.seek_record(record)?;

        let n_plane_waves = self.file.read_f64::<LittleEndian>()?;
        data.n_plane_waves = to_positive_usize(n_plane_waves)?;

        data.k = self.file.read_vec3()?;

        for iband in 0 .. self.n_bands {
            data.energies[iband] = self.file.read_f64::<LittleEndian>()?;
            // Imaginary part of the eigenvalue, zero in practice, not checked.
            self.file.seek_relative(8)?;
            data.occupations[iband] = self.file.read_f64::<LittleEndian>()?;
        }

        data.gs.reserve(data.n_plane_waves);
        self.compute_g_sphere(&data.k, &mut data.gs);

        if data.gs.len() != data.n_plane_waves {
            bail!(
                "Bad WAVECAR file: inconsistent number of plane waves at spin {} kpoint {}: \
                 {} stored vs {} expected from the cutoff sphere",
                ispin + 1, ikpoint + 1, data.n_plane_waves, data.gs.len(),
            );
        }

        data.coeffs.resize(data.n_plane_waves, self.n_bands);
        for iband in 0 .. self.n_bands {
            record += 1;
            self.seek_record(record)?;
            T::read_complex_into(&mut self.file, data.coeffs.column_mut(iband))?;
        }

        Ok(())
    }

    /// Enumerates the G-sphere for wavevector `k`: all grid points whose
    /// kinetic energy lies below the cutoff. The nesting order (outer a3,
    /// middle a2, inner a1) matches the coefficient order on disk.
    pub fn compute_g_sphere(&self, k: &Vec3, gs: &mut Vec<[usize; 3]>) {
        let cutoff_sq = TWO_M_OVER_HBAR_SQ * self.e_cut;

        gs.clear();
        for i2 in 0 .. self.size_g(Axis::C) {
            let i2s = index_shift(i2, self.max_g[2]);
            let g2 = scale(k[2] + i2s as f64, &self.b[2]);
            for i1 in 0 .. self.size_g(Axis::B) {
                let i1s = index_shift(i1, self.max_g[1]);
                let g2_p_g1 = add(&g2, &scale(k[1] + i1s as f64, &self.b[1]));
                for i0 in 0 .. self.size_g(Axis::A) {
                    let i0s = index_shift(i0, self.max_g[0]);
                    let g = add(&g2_p_g1, &scale(k[0] + i0s as f64, &self.b[0]));
                    if norm_sq(&g) < cutoff_sq {
                        gs.push([i0, i1, i2]);
                    }
                }
            }
        }
    }

    fn read_header(&mut self) -> Result<()> {
        let record_length = self.file.read_f64::<LittleEndian>()?;
        let n_spins = self.file.read_f64::<LittleEndian>()?;
        let prec_tag = self.file.read_f64::<LittleEndian>()?;

        self.record_length = to_positive_usize(record_length)? as u64;
        self.n_spins = to_positive_usize(n_spins)?;

        self.prec_type = if prec_tag == SINGLE_PRECISION_TAG {
            WFPrecType::Complex32
        } else if prec_tag == DOUBLE_PRECISION_TAG {
            WFPrecType::Complex64
        } else {
            bail!("Bad WAVECAR file: unsupported RTAG value {}", prec_tag);
        };

        self.seek_record(1)?;

        self.n_kpoints = to_positive_usize(self.file.read_f64::<LittleEndian>()?)?;
        self.n_bands = to_positive_usize(self.file.read_f64::<LittleEndian>()?)?;
        self.e_cut = self.file.read_f64::<LittleEndian>()?;

        self.a[0] = self.file.read_vec3()?;
        self.a[1] = self.file.read_vec3()?;
        self.a[2] = self.file.read_vec3()?;

        Ok(())
    }

    fn compute_reciprocal(&mut self) -> Result<()> {
        let uc_volume = det(&self.a[0], &self.a[1], &self.a[2]);
        if uc_volume == 0.0 {
            bail!("Bad WAVECAR file: singular direct lattice");
        }

        self.b[0] = scale(2.0 * PI / uc_volume, &cross(&self.a[1], &self.a[2]));
        self.b[1] = scale(2.0 * PI / uc_volume, &cross(&self.a[2], &self.a[0]));
        self.b[2] = scale(2.0 * PI / uc_volume, &cross(&self.a[0], &self.a[1]));

        let g_max_over_2pi = (TWO_M_OVER_HBAR_SQ * self.e_cut).sqrt() / (2.0 * PI);

        // NB: for an oblique cell i_m is not Gm / |b_i| but Gm * |a_i| / 2pi.
        for i in 0 .. 3 {
            self.max_g[i] = (g_max_over_2pi * norm(&self.a[i])).floor() as usize + 1;
        }

        Ok(())
    }

    fn seek_record(&mut self, n: u64) -> io::Result<()> {
        self.file
            .seek(SeekFrom::Start(n * self.record_length))
            .map(|_| ())
    }
}

impl fmt::Display for Wavecar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "WAVECAR file:")?;
        writeln!(f, "  Precision: {}",
                 if self.is_single_precision() { "single" } else { "double" })?;
        writeln!(f, "  Number of spin components: {}", self.n_spins)?;
        writeln!(f, "  Number of k-points: {}", self.n_kpoints)?;
        writeln!(f, "  Number of bands: {}", self.n_bands)?;
        writeln!(f, "  Cut-off energy: {} eV", self.e_cut)?;
        writeln!(f, "  Direct lattice:")?;
        for axis in [Axis::A, Axis::B, Axis::C] {
            let a = self.a(axis);
            writeln!(f, "    {} = ({:11.5}, {:11.5}, {:11.5}) Ang",
                     axis, a[0], a[1], a[2])?;
        }
        write!(f, "  G-lattice size: {} x {} x {}",
               self.size_g(Axis::A), self.size_g(Axis::B), self.size_g(Axis::C))
    }
}

/// Maps an unsigned grid index in `[0, 2*i_max]` to the signed reciprocal
/// lattice integer, FFT wrap-around convention.
pub fn index_shift(i: usize, i_max: usize) -> i64 {
    if i > i_max {
        i as i64 - (2 * i_max as i64 + 1)
    } else {
        i as i64
    }
}

/// Checked cast of an on-disk count; WAVECAR stores them as doubles.
fn to_positive_usize(x: f64) -> Result<usize> {
    let r = x as usize;
    if x <= 0.0 || x != r as f64 {
        bail!("Bad WAVECAR file: positive integral value expected, got {}", x);
    }
    Ok(r)
}

fn scalar(x: &Vec3, y: &Vec3) -> f64 {
    x[0] * y[0] + x[1] * y[1] + x[2] * y[2]
}

fn norm_sq(x: &Vec3) -> f64 {
    scalar(x, x)
}

fn norm(x: &Vec3) -> f64 {
    norm_sq(x).sqrt()
}

fn cross(x: &Vec3, y: &Vec3) -> Vec3 {
    [
        x[1] * y[2] - x[2] * y[1],
        x[2] * y[0] - x[0] * y[2],
        x[0] * y[1] - x[1] * y[0],
    ]
}

fn det(a0: &Vec3, a1: &Vec3, a2: &Vec3) -> f64 {
    scalar(a0, &cross(a1, a2))
}

fn scale(s: f64, x: &Vec3) -> Vec3 {
    [s * x[0], s * x[1], s * x[2]]
}

fn add(x: &Vec3, y: &Vec3) -> Vec3 {
    [x[0] + y[0], x[1] + y[1], x[2] + y[2]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_shift() {
        assert_eq!(index_shift(0, 5), 0);
        assert_eq!(index_shift(3, 5), 3);
        assert_eq!(index_shift(5, 5), 5);
        assert_eq!(index_shift(6, 5), -5);
        assert_eq!(index_shift(10, 5), -1);
    }

    #[test]
    fn test_to_positive_usize() {
        assert_eq!(to_positive_usize(42.0).unwrap(), 42);
        assert!(to_positive_usize(0.0).is_err());
        assert!(to_positive_usize(-3.0).is_err());
        assert!(to_positive_usize(2.5).is_err());
    }

    #[test]
    fn test_cross_and_det() {
        let x = [1.0, 0.0, 0.0];
        let y = [0.0, 1.0, 0.0];
        assert_eq!(cross(&x, &y), [0.0, 0.0, 1.0]);
        assert_eq!(det(&x, &y, &[0.0, 0.0, 2.0]), 2.0);
    }
}
