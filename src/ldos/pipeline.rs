use anyhow::bail;
use log::info;
use num_complex::Complex;

use crate::fft::BatchedIfft;
use crate::matrix::Matrix;
use crate::types::{Axis, Result};
use crate::vasp_parsers::wavecar::{KpointData, WFPrecType, Wavecar, WavecarPrec};

use super::writer::LdosWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FftShape {
    /// Transform length, the G-grid extent along the height direction.
    pub len: usize,
    /// One transform per in-plane grid point.
    pub n_transforms: usize,
}

/// Picks the lattice axis of strictly greatest norm as the depth axis.
/// A cell without a strict maximum (near-cubic, or degenerate) is not a slab
/// and is rejected.
pub fn choose_height_direction(a_norms: [f64; 3]) -> Result<Axis> {
    let [n0, n1, n2] = a_norms;
    if n0 > n1 && n0 > n2 {
        Ok(Axis::A)
    } else if n1 > n2 && n1 > n0 {
        Ok(Axis::B)
    } else if n2 > n0 && n2 > n1 {
        Ok(Axis::C)
    } else {
        bail!("Bad supercell size: no lattice vector is strictly the longest \
               ({:.5}, {:.5}, {:.5} Ang)", n0, n1, n2);
    }
}

pub fn fft_shape(wavecar: &Wavecar, direction: Axis) -> FftShape {
    let (sa, sb, sc) = (
        wavecar.size_g(Axis::A),
        wavecar.size_g(Axis::B),
        wavecar.size_g(Axis::C),
    );
    match direction {
        Axis::A => FftShape { len: sa, n_transforms: sb * sc },
        Axis::B => FftShape { len: sb, n_transforms: sc * sa },
        Axis::C => FftShape { len: sc, n_transforms: sa * sb },
    }
}

/// Scatters one band's G-sphere coefficients into the dense FFT buffer.
///
/// The height direction becomes the row (transform) axis; the remaining two
/// G indices are flattened into the column index. Grid cells outside the
/// sphere stay zero.
pub fn map_g_sphere_to_fft_blocks<T: WavecarPrec>(
    cs: &mut Matrix<Complex<T>>,
    data: &KpointData<T>,
    band: usize,
    direction: Axis,
    size_g: [usize; 3],
) {
    cs.fill_zero();

    let coeffs = data.coeffs.column(band);
    match direction {
        Axis::A => {
            for (g, &c) in data.gs.iter().zip(coeffs) {
                cs[(g[0], g[1] + g[2] * size_g[1])] = c;
            }
        }
        Axis::B => {
            for (g, &c) in data.gs.iter().zip(coeffs) {
                cs[(g[1], g[2] + g[0] * size_g[2])] = c;
            }
        }
        Axis::C => {
            for (g, &c) in data.gs.iter().zip(coeffs) {
                cs[(g[2], g[0] + g[1] * size_g[0])] = c;
            }
        }
    }
}

/// Runs the whole accumulation over spins and k-points, dispatching on the
/// WAVECAR's precision tag.
pub fn process(wavecar: &mut Wavecar, writer: &mut LdosWriter, direction: Axis) -> Result<()> {
    match wavecar.prec_type() {
        WFPrecType::Complex32 => process_with_precision::<f32>(wavecar, writer, direction),
        WFPrecType::Complex64 => process_with_precision::<f64>(wavecar, writer, direction),
    }
}

fn process_with_precision<T: WavecarPrec>(
    wavecar: &mut Wavecar,
    writer: &mut LdosWriter,
    direction: Axis,
) -> Result<()> {
    let shape = fft_shape(wavecar, direction);
    let size_g = [
        wavecar.size_g(Axis::A),
        wavecar.size_g(Axis::B),
        wavecar.size_g(Axis::C),
    ];
    let n_bands = wavecar.n_bands();

    let mut cs = Matrix::<Complex<T>>::new(shape.len, shape.n_transforms);
    let mut cs_sq = Matrix::<f32>::new(shape.len, n_bands);
    let mut data = KpointData::<T>::default();
    let mut fft = BatchedIfft::<T>::new(shape.len, shape.n_transforms);

    let mut energy_min = f64::INFINITY;
    let mut energy_max = f64::NEG_INFINITY;
    let mut cs_sq_max = f32::NEG_INFINITY;

    for ispin in 0 .. wavecar.n_spins() {
        for ikpoint in 0 .. wavecar.n_kpoints() {
            info!("Processing spin {}, k-point {:3} ...", ispin + 1, ikpoint + 1);
            wavecar.get_kpoint_data(ispin, ikpoint, &mut data)?;

            cs_sq.fill_zero();

            for iband in 0 .. n_bands {
                energy_min = energy_min.min(data.energies[iband]);
                energy_max = energy_max.max(data.energies[iband]);

                map_g_sphere_to_fft_blocks(&mut cs, &data, iband, direction, size_g);
                fft.transform(&mut cs)?;

                // Sum |c|^2 over the in-plane G indices.
                for ip in 0 .. shape.n_transforms {
                    for il in 0 .. shape.len {
                        let sq = cs[(il, ip)].norm_sqr().as_f32();
                        cs_sq_max = cs_sq_max.max(sq);
                        cs_sq[(il, iband)] += sq;
                    }
                }
            }

            writer.write_ldos(&data.k, &data.energies, &data.occupations, &cs_sq)?;
        }
    }

    writer.write_minmax_values(energy_min, energy_max, cs_sq_max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choose_height_direction() {
        assert_eq!(choose_height_direction([12.0, 8.0, 9.0]).unwrap(), Axis::A);
        assert_eq!(choose_height_direction([8.0, 12.0, 9.0]).unwrap(), Axis::B);
        assert_eq!(choose_height_direction([8.0, 9.0, 12.0]).unwrap(), Axis::C);
    }

    #[test]
    fn test_degenerate_cell_is_rejected() {
        assert!(choose_height_direction([10.0, 10.0, 10.0]).is_err());
        assert!(choose_height_direction([10.0, 10.0, 8.0]).is_err());
    }

    #[test]
    fn test_scatter_single_point_sphere() {
        let mut data = KpointData::<f64>::default();
        data.n_plane_waves = 1;
        data.gs = vec![[2, 1, 0]];
        data.coeffs.resize(1, 1);
        data.coeffs[(0, 0)] = Complex::new(3.0, -1.0);

        // Height along a1; in-plane flattening uses size_g1 = 3.
        let mut cs = Matrix::<Complex<f64>>::new(5, 9);
        map_g_sphere_to_fft_blocks(&mut cs, &data, 0, Axis::A, [5, 3, 3]);

        assert_eq!(cs[(2, 1)], Complex::new(3.0, -1.0));
        let nonzero = cs.as_slice().iter().filter(|c| **c != Complex::new(0.0, 0.0)).count();
        assert_eq!(nonzero, 1);
    }
}
