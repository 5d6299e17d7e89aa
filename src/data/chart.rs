use serde::Serialize;

use super::aggregate::by_primary;
use super::model::{Dataset, Field};

/// Metrics drawn as comparative box plots.
pub const FIGURE_METRICS: [Field; 3] = [Field::Gain, Field::FeedConversion, Field::CarcassYield];

// ---------------------------------------------------------------------------
// Box-plot data, one box per group
// ---------------------------------------------------------------------------

/// Five-number summary with 1.5×IQR whiskers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxStats {
    pub group: String,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

/// All boxes of one metric, ready for a renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub title: String,
    pub metric: String,
    pub group_label: String,
    pub boxes: Vec<BoxStats>,
}

/// Quantile by linear interpolation between closest ranks. `sorted` must be
/// ascending and non-empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

impl BoxStats {
    /// `None` for an empty sample.
    pub fn from_values(group: impl Into<String>, values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let q1 = quantile(&sorted, 0.25);
        let q3 = quantile(&sorted, 0.75);
        let iqr = q3 - q1;
        let (low_fence, high_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

        let inside = || sorted.iter().copied().filter(|v| *v >= low_fence && *v <= high_fence);
        Some(BoxStats {
            group: group.into(),
            count: sorted.len(),
            min: sorted[0],
            q1,
            median: quantile(&sorted, 0.5),
            q3,
            max: sorted[sorted.len() - 1],
            lower_whisker: inside().fold(f64::INFINITY, f64::min),
            upper_whisker: inside().fold(f64::NEG_INFINITY, f64::max),
            outliers: sorted
                .iter()
                .copied()
                .filter(|v| *v < low_fence || *v > high_fence)
                .collect(),
        })
    }
}

/// One figure per plotted metric, boxes in the same group order as the
/// primary summary.
pub fn figures(dataset: &Dataset) -> Vec<Figure> {
    let variant = dataset.variant;
    let groups: Vec<String> = by_primary(dataset)
        .rows
        .into_iter()
        .filter_map(|r| r.key)
        .collect();

    FIGURE_METRICS
        .iter()
        .map(|field| {
            let metric = dataset.layout.column(*field).to_string();
            let boxes = groups
                .iter()
                .filter_map(|group| {
                    let values: Vec<f64> = dataset
                        .records
                        .iter()
                        .filter(|r| variant.group_key(r).as_deref() == Some(group.as_str()))
                        .filter_map(|r| r.metric(*field))
                        .collect();
                    BoxStats::from_values(group.clone(), &values)
                })
                .collect();
            Figure {
                title: format!("{metric} por {}", variant.group_label()),
                metric,
                group_label: variant.group_label().to_string(),
                boxes,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quartiles_interpolate() {
        let b = BoxStats::from_values("T1", &[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(b.min, 1.0);
        assert_eq!(b.q1, 1.75);
        assert_eq!(b.median, 2.5);
        assert_eq!(b.q3, 3.25);
        assert_eq!(b.max, 4.0);
        assert!(b.outliers.is_empty());
        assert_eq!((b.lower_whisker, b.upper_whisker), (1.0, 4.0));
    }

    #[test]
    fn test_outlier_outside_whiskers() {
        let b = BoxStats::from_values("T1", &[1.0, 2.0, 2.0, 3.0, 50.0]).unwrap();
        assert_eq!(b.outliers, vec![50.0]);
        assert_eq!(b.upper_whisker, 3.0);
        assert_eq!(b.max, 50.0);
    }

    #[test]
    fn test_single_value() {
        let b = BoxStats::from_values("T1", &[2.5]).unwrap();
        assert_eq!((b.q1, b.median, b.q3), (2.5, 2.5, 2.5));
        assert_eq!(b.count, 1);
    }

    #[test]
    fn test_empty_sample_has_no_box() {
        assert!(BoxStats::from_values("T1", &[]).is_none());
    }
}
