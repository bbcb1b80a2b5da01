use num_traits::Zero;

/// Column-major 2D buffer.
///
/// Used for the FFT workspace and the accumulated `|c|^2` slabs. `resize`
/// keeps the backing allocation when the new shape fits in the old capacity,
/// so per-kpoint buffers can be reused across the whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    data: Vec<T>,
    nrow: usize,
    ncol: usize,
}

impl<T> Default for Matrix<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            nrow: 0,
            ncol: 0,
        }
    }
}

impl<T: Copy + Zero> Matrix<T> {
    pub fn new(nrow: usize, ncol: usize) -> Self {
        Self {
            data: vec![T::zero(); nrow * ncol],
            nrow,
            ncol,
        }
    }

    pub fn nrow(&self) -> usize {
        self.nrow
    }

    pub fn ncol(&self) -> usize {
        self.ncol
    }

    /// Reshapes the matrix, reallocating only when the capacity is
    /// insufficient. The contents afterwards are unspecified.
    pub fn resize(&mut self, nrow: usize, ncol: usize) {
        self.nrow = nrow;
        self.ncol = ncol;
        self.data.resize(nrow * ncol, T::zero());
    }

    pub fn fill_zero(&mut self) {
        self.data.fill(T::zero());
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn column(&self, col: usize) -> &[T] {
        debug_assert!(col < self.ncol);
        &self.data[col * self.nrow .. (col + 1) * self.nrow]
    }

    pub fn column_mut(&mut self, col: usize) -> &mut [T] {
        debug_assert!(col < self.ncol);
        &mut self.data[col * self.nrow .. (col + 1) * self.nrow]
    }
}

impl<T> std::ops::Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    fn index(&self, (row, col): (usize, usize)) -> &T {
        debug_assert!(row < self.nrow && col < self.ncol);
        &self.data[row + col * self.nrow]
    }
}

impl<T> std::ops::IndexMut<(usize, usize)> for Matrix<T> {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
        debug_assert!(row < self.nrow && col < self.ncol);
        &mut self.data[row + col * self.nrow]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_major_layout() {
        let mut m = Matrix::<f64>::new(2, 3);
        m[(0, 0)] = 1.0;
        m[(1, 0)] = 2.0;
        m[(0, 2)] = 5.0;
        m[(1, 2)] = 6.0;

        assert_eq!(m.as_slice(), &[1.0, 2.0, 0.0, 0.0, 5.0, 6.0]);
        assert_eq!(m.column(0), &[1.0, 2.0]);
        assert_eq!(m.column(2), &[5.0, 6.0]);
    }

    #[test]
    fn test_resize_keeps_capacity() {
        let mut m = Matrix::<f64>::new(10, 10);
        let cap = m.data.capacity();

        m.resize(4, 5);
        assert_eq!((m.nrow(), m.ncol()), (4, 5));
        assert_eq!(m.data.capacity(), cap);

        m.resize(10, 10);
        assert_eq!(m.data.capacity(), cap);
    }

    #[test]
    fn test_fill_zero() {
        let mut m = Matrix::<f32>::new(3, 2);
        m[(2, 1)] = 42.0;
        m.fill_zero();
        assert!(m.as_slice().iter().all(|&v| v == 0.0));
    }
}
