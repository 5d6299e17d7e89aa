use serde::Serialize;
use thiserror::Error;

use super::model::Dataset;

/// Ordinary least-squares fit of gain against period, with the fitted value
/// at every observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendFit {
    pub slope: f64,
    pub intercept: f64,
    pub periods: Vec<f64>,
    pub observed: Vec<f64>,
    pub predicted: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TrendError {
    #[error("insufficient data: {distinct_periods} distinct periods, need at least 2")]
    InsufficientData { distinct_periods: usize },
}

impl TrendFit {
    /// Projected gain at `period`.
    pub fn predict(&self, period: f64) -> f64 {
        self.intercept + self.slope * period
    }
}

/// Fit `gain = intercept + slope * period` over paired observations.
///
/// `periods` and `gains` are zipped; extra elements of the longer slice are
/// ignored.
pub fn fit(periods: &[f64], gains: &[f64]) -> Result<TrendFit, TrendError> {
    let n = periods.len().min(gains.len());
    let (xs, ys) = (&periods[..n], &gains[..n]);

    let mut distinct: Vec<f64> = xs.to_vec();
    distinct.sort_by(f64::total_cmp);
    distinct.dedup();
    if distinct.len() < 2 {
        return Err(TrendError::InsufficientData {
            distinct_periods: distinct.len(),
        });
    }

    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;
    let (sxy, sxx) = xs
        .iter()
        .zip(ys)
        .fold((0.0, 0.0), |(sxy, sxx), (x, y)| {
            (sxy + (x - mean_x) * (y - mean_y), sxx + (x - mean_x).powi(2))
        });

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    Ok(TrendFit {
        slope,
        intercept,
        periods: xs.to_vec(),
        observed: ys.to_vec(),
        predicted: xs.iter().map(|x| intercept + slope * x).collect(),
    })
}

/// Fit over every record carrying both a week and a gain, in dataset order.
pub fn fit_dataset(dataset: &Dataset) -> Result<TrendFit, TrendError> {
    let (periods, gains): (Vec<f64>, Vec<f64>) = dataset
        .records
        .iter()
        .filter_map(|r| Some((f64::from(r.week?), r.gain?)))
        .unzip();
    fit(&periods, &gains)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_two_points() {
        let t = fit(&[1.0, 2.0], &[1.0, 3.0]).unwrap();
        assert!(close(t.slope, 2.0));
        assert!(close(t.intercept, -1.0));
        assert!(close(t.predicted[0], 1.0));
        assert!(close(t.predicted[1], 3.0));
    }

    #[test]
    fn test_output_keeps_input_order_and_length() {
        let t = fit(&[3.0, 1.0, 2.0, 1.0], &[5.0, 1.0, 3.5, 1.2]).unwrap();
        assert_eq!(t.periods, vec![3.0, 1.0, 2.0, 1.0]);
        assert_eq!(t.observed, vec![5.0, 1.0, 3.5, 1.2]);
        assert_eq!(t.predicted.len(), 4);
        assert!(t.predicted[0] > t.predicted[2]);
    }

    #[test]
    fn test_single_distinct_period_is_insufficient() {
        assert_eq!(
            fit(&[4.0, 4.0, 4.0], &[1.0, 2.0, 3.0]),
            Err(TrendError::InsufficientData { distinct_periods: 1 })
        );
        assert_eq!(
            fit(&[], &[]),
            Err(TrendError::InsufficientData { distinct_periods: 0 })
        );
    }

    #[test]
    fn test_predict_projects_beyond_observations() {
        let t = fit(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
        assert!(close(t.predict(5.0), 10.0));
    }
}
