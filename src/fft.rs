use std::sync::Arc;

use anyhow::ensure;
use num_complex::Complex;
use num_traits::Zero;
use rustfft::{FftNum, FftPlanner};

use crate::matrix::Matrix;
use crate::types::Result;

/// Batched in-place 1D inverse complex-to-complex FFT.
///
/// One transform per matrix column, transform length = number of rows. The
/// inverse transform is unnormalized (no 1/N factor), which is what the LDOS
/// accumulation expects.
pub struct BatchedIfft<T: FftNum> {
    plan: Arc<dyn rustfft::Fft<T>>,
    scratch: Vec<Complex<T>>,
    len: usize,
    n_transforms: usize,
}

impl<T: FftNum> BatchedIfft<T> {
    pub fn new(len: usize, n_transforms: usize) -> Self {
        assert!(len > 0);
        assert!(n_transforms > 0);

        let plan = FftPlanner::new().plan_fft_inverse(len);
        let scratch = vec![Complex::zero(); plan.get_inplace_scratch_len()];

        Self {
            plan,
            scratch,
            len,
            n_transforms,
        }
    }

    pub fn transform(&mut self, data: &mut Matrix<Complex<T>>) -> Result<()> {
        ensure!(
            data.nrow() == self.len && data.ncol() == self.n_transforms,
            "FFT buffer shape {}x{} does not match the plan ({}x{})",
            data.nrow(), data.ncol(), self.len, self.n_transforms,
        );

        for col in 0 .. self.n_transforms {
            self.plan
                .process_with_scratch(data.column_mut(col), &mut self.scratch);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_mode_transforms_to_plane_wave() {
        // A lone coefficient at G = 1 becomes exp(+2*pi*i*l/n) in real space.
        let n = 8;
        let mut data = Matrix::<Complex<f64>>::new(n, 1);
        data[(1, 0)] = Complex::new(1.0, 0.0);

        let mut fft = BatchedIfft::new(n, 1);
        fft.transform(&mut data).unwrap();

        for l in 0 .. n {
            let phase = 2.0 * std::f64::consts::PI * l as f64 / n as f64;
            assert_relative_eq!(data[(l, 0)].re, phase.cos(), epsilon = 1e-12);
            assert_relative_eq!(data[(l, 0)].im, phase.sin(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_batched_columns_are_independent() {
        let mut data = Matrix::<Complex<f64>>::new(4, 2);
        data[(0, 0)] = Complex::new(1.0, 0.0);
        data[(1, 1)] = Complex::new(1.0, 0.0);

        let mut fft = BatchedIfft::new(4, 2);
        fft.transform(&mut data).unwrap();

        // Column 0: constant; column 1: unit-modulus plane wave.
        for l in 0 .. 4 {
            assert_relative_eq!(data[(l, 0)].re, 1.0, epsilon = 1e-12);
            assert_relative_eq!(data[(l, 0)].im, 0.0, epsilon = 1e-12);
            assert_relative_eq!(data[(l, 1)].norm(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let mut data = Matrix::<Complex<f64>>::new(4, 3);
        let mut fft = BatchedIfft::new(4, 2);
        assert!(fft.transform(&mut data).is_err());
    }
}
