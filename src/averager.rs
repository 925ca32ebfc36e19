use nalgebra::DVector;

/// Per component, inverse variance weighted running mean.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedAverager {
    sum_wx: DVector<f64>,
    sum_w: DVector<f64>,
    /// Number of folded vectors
    pub count: u64,
}

impl WeightedAverager {
    /// Builds new [WeightedAverager] for vectors of given size
    pub fn new(size: usize) -> Self {
        Self {
            count: 0,
            sum_w: DVector::zeros(size),
            sum_wx: DVector::zeros(size),
        }
    }

    /// Push new vector into [WeightedAverager].
    /// Components with non positive (or invalid) variance do not contribute.
    pub fn add(&mut self, x: &DVector<f64>, variances: &DVector<f64>) {
        self.count += 1;
        for i in 0..self.sum_w.len().min(x.len()).min(variances.len()) {
            let var = variances[i];
            if var > 0.0 && var.is_finite() && x[i].is_finite() {
                self.sum_w[i] += 1.0 / var;
                self.sum_wx[i] += x[i] / var;
            }
        }
    }

    /// Weighted mean. Components that never contributed are null.
    pub fn mean(&self) -> DVector<f64> {
        DVector::from_iterator(
            self.sum_w.len(),
            self.sum_w.iter().zip(self.sum_wx.iter()).map(
                |(w, wx)| {
                    if *w > 0.0 {
                        wx / w
                    } else {
                        0.0
                    }
                },
            ),
        )
    }

    /// Reset [WeightedAverager]
    pub fn reset(&mut self) {
        self.count = 0;
        self.sum_w.fill(0.0);
        self.sum_wx.fill(0.0);
    }
}

#[cfg(test)]
mod test {
    use super::WeightedAverager;
    use nalgebra::DVector;

    #[test]
    fn test_averager() {
        let mut avg = WeightedAverager::new(2);

        avg.add(
            &DVector::from_row_slice(&[1.0, 10.0]),
            &DVector::from_row_slice(&[1.0, 0.0]),
        );
        avg.add(
            &DVector::from_row_slice(&[4.0, 20.0]),
            &DVector::from_row_slice(&[0.5, 2.0]),
        );

        let mean = avg.mean();
        assert_eq!(avg.count, 2);
        // weights 1 and 2
        assert!((mean[0] - 3.0).abs() < 1.0E-12);
        // first sample has no variance
        assert!((mean[1] - 20.0).abs() < 1.0E-12);

        avg.reset();
        assert_eq!(avg.count, 0);
        assert_eq!(avg.mean(), DVector::zeros(2));
    }
}
