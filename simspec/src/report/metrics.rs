//! Run metrics derived from a session.

use serde::{Deserialize, Serialize};

use crate::classify::AnalysisCategory;
use crate::core::STAGE_COUNT;
use crate::session::AnalysisSession;

/// Inference time statistics over succeeded stages, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingSummary {
    /// Arithmetic mean.
    pub mean_ms: f64,
    /// Median.
    pub median_ms: f64,
    /// Fastest stage.
    pub min_ms: u64,
    /// Slowest stage.
    pub max_ms: u64,
    /// Sample standard deviation; needs at least two samples.
    pub stdev_ms: Option<f64>,
}

impl TimingSummary {
    /// Summarizes `samples`, or returns `None` if there are none.
    #[must_use]
    pub fn from_samples(samples: &[u64]) -> Option<Self> {
        let mut sorted = samples.to_vec();
        sorted.sort_unstable();
        let (&min_ms, &max_ms) = (sorted.first()?, sorted.last()?);

        let n = sorted.len();
        let mean_ms = sorted.iter().map(|&v| v as f64).sum::<f64>() / n as f64;
        let median_ms = if n % 2 == 1 {
            sorted[n / 2] as f64
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0
        };
        let stdev_ms = (n >= 2).then(|| {
            let variance = sorted
                .iter()
                .map(|&v| (v as f64 - mean_ms).powi(2))
                .sum::<f64>()
                / (n - 1) as f64;
            variance.sqrt()
        });

        Some(Self {
            mean_ms,
            median_ms,
            min_ms,
            max_ms,
            stdev_ms,
        })
    }
}

/// Count of stages per analysis category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    /// The category.
    pub category: AnalysisCategory,
    /// Succeeded stages classified under it.
    pub count: usize,
}

/// Summary numbers for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    /// Stages that produced model text.
    pub stages_succeeded: usize,
    /// Stages recorded as failed.
    pub stages_failed: usize,
    /// Stages with no result yet.
    pub stages_pending: usize,
    /// Inference timings, if any stage succeeded.
    pub inference: Option<TimingSummary>,
    /// Non-zero category counts, in category order.
    pub category_distribution: Vec<CategoryCount>,
    /// Succeeded stages whose category has a follow-up question.
    pub questions_generated: usize,
}

impl SessionMetrics {
    /// Computes metrics over the session's recorded results.
    #[must_use]
    pub fn from_session(session: &AnalysisSession) -> Self {
        let succeeded: Vec<_> = session.results().iter().filter(|r| r.is_success()).collect();
        let samples: Vec<u64> = succeeded.iter().map(|r| r.elapsed_ms).collect();

        let category_distribution = AnalysisCategory::ALL
            .iter()
            .map(|&category| CategoryCount {
                category,
                count: succeeded
                    .iter()
                    .filter(|r| r.classification.category == category)
                    .count(),
            })
            .filter(|c| c.count > 0)
            .collect();

        Self {
            stages_succeeded: succeeded.len(),
            stages_failed: session.failed_stages(),
            stages_pending: STAGE_COUNT - session.results().len(),
            inference: TimingSummary::from_samples(&samples),
            category_distribution,
            questions_generated: succeeded
                .iter()
                .filter(|r| r.classification.follow_up().is_some())
                .count(),
        }
    }

    /// Share of succeeded stages in `category`, as a percentage.
    #[must_use]
    pub fn category_share(&self, category: AnalysisCategory) -> f64 {
        if self.stages_succeeded == 0 {
            return 0.0;
        }
        let count = self
            .category_distribution
            .iter()
            .find(|c| c.category == category)
            .map_or(0, |c| c.count);
        count as f64 * 100.0 / self.stages_succeeded as f64
    }
}
