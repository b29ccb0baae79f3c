use crate::{
    error::{NetworkError, Result},
    network::network::Network,
};

/// Points whose output lies within this distance of 0.5 count as boundary.
const BOUNDARY_TOLERANCE: f64 = 0.05;

impl Network {
    /// Samples a `(resolution + 1)²` grid over `x_range × y_range` (both ends
    /// included) and returns the points where a single-output, two-input
    /// classifier is undecided: `|output - 0.5| < 0.05`.
    ///
    /// Points come out column by column, x outer and y inner.
    pub fn decision_boundary(
        &mut self,
        x_range: (f64, f64),
        y_range: (f64, f64),
        resolution: usize,
    ) -> Result<Vec<(f64, f64)>> {
        if resolution == 0 {
            return Err(NetworkError::InvalidConfiguration(
                "boundary resolution must be at least 1".to_owned(),
            ));
        }
        let step_x = (x_range.1 - x_range.0) / resolution as f64;
        let step_y = (y_range.1 - y_range.0) / resolution as f64;

        let mut boundary = Vec::new();
        for i in 0..=resolution {
            for j in 0..=resolution {
                let x = x_range.0 + i as f64 * step_x;
                let y = y_range.0 + j as f64 * step_y;
                let output = self.predict(&[x, y])?;
                let p = *output.first().ok_or_else(|| NetworkError::dimension(1, 0))?;
                if (p - 0.5).abs() < BOUNDARY_TOLERANCE {
                    boundary.push((x, y));
                }
            }
        }
        Ok(boundary)
    }
}
