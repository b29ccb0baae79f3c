use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use rand_distr::StandardNormal;

/// Dense row-major matrix. A layer stores its weights as one row per output
/// unit, so `rows` is the fan-out and `cols` the fan-in.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<f64>>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix {
            rows,
            cols,
            data: vec![vec![0.0; cols]; rows],
        }
    }

    /// He initialization: samples from N(0, sqrt(2 / cols)).
    ///
    /// Recommended before ReLU layers. The variance 2/fan_in accounts for
    /// the fact that ReLU zeroes half of its inputs on average.
    pub fn he<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Matrix {
        let std_dev = (2.0 / cols.max(1) as f64).sqrt();
        let mut res = Matrix::zeros(rows, cols);
        for row in res.data.iter_mut() {
            for w in row.iter_mut() {
                let z: f64 = rng.sample(StandardNormal);
                *w = z * std_dev;
            }
        }
        res
    }

    /// Xavier (Glorot) uniform initialization: samples from
    /// U(-sqrt(6 / (rows + cols)), sqrt(6 / (rows + cols))).
    ///
    /// Used for Sigmoid and Softmax layers.
    pub fn xavier_uniform<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Matrix {
        let bound = (6.0 / (rows + cols).max(1) as f64).sqrt();
        let dist = Uniform::new_inclusive(-bound, bound);
        let mut res = Matrix::zeros(rows, cols);
        for row in res.data.iter_mut() {
            for w in row.iter_mut() {
                *w = dist.sample(rng);
            }
        }
        res
    }

    /// Builds a matrix from rows. Every row must have the same length as the first.
    pub fn from_data(data: Vec<Vec<f64>>) -> Matrix {
        let cols = data.first().map_or(0, |row| row.len());
        debug_assert!(data.iter().all(|row| row.len() == cols));
        Matrix {
            rows: data.len(),
            cols,
            data,
        }
    }

    /// `self · v`, one output per row. `v.len()` must equal `cols`.
    pub fn mul_vec(&self, v: &[f64]) -> Vec<f64> {
        self.data.iter()
            .map(|row| row.iter().zip(v).map(|(w, x)| w * x).sum())
            .collect()
    }

    /// `selfᵀ · v`, one output per column. `v.len()` must equal `rows`.
    pub fn transpose_mul_vec(&self, v: &[f64]) -> Vec<f64> {
        let mut res = vec![0.0; self.cols];
        for (row, &scale) in self.data.iter().zip(v) {
            for (acc, w) in res.iter_mut().zip(row) {
                *acc += scale * w;
            }
        }
        res
    }

    /// Iterates all values row by row.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().flat_map(|row| row.iter().copied())
    }
}
