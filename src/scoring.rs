//! Score model
//!
//! Turns per-dimension contribution/growth ratings into totals, a composite
//! score and a 9-box placement. Contribution drives the performance axis and
//! growth drives the potential axis.
//!
//! Nothing here validates ranges: the UI constrains inputs to 0-2 and
//! out-of-range values are summed as-is.

use crate::types::{Band, DimensionScores, NineBoxPosition};
use serde::{Deserialize, Serialize};

/// Upper bound of a "low" axis total (three dimensions, 0-2 each)
const LOW_BAND_MAX: f64 = 2.0;

/// Upper bound of a "medium" axis total
const MEDIUM_BAND_MAX: f64 = 4.0;

/// Totals derived from one set of dimension scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub total_contribution: i32,
    pub total_growth: i32,
    pub composite: i32,
}

impl ScoreSummary {
    pub fn nine_box(&self) -> NineBoxPosition {
        nine_box_for(self.total_contribution as f64, self.total_growth as f64)
    }
}

/// Sum contribution and growth across culture, competencies and execution
pub fn compute_scores(scores: &DimensionScores) -> ScoreSummary {
    let (total_contribution, total_growth) = scores
        .iter()
        .fold((0i32, 0i32), |(c, g), (_, score)| {
            (c + score.contribution, g + score.growth)
        });

    ScoreSummary {
        total_contribution,
        total_growth,
        composite: total_contribution + total_growth,
    }
}

/// Map an axis total (0.0 - 6.0) onto a 9-box band
pub fn band_for(total: f64) -> Band {
    if total <= LOW_BAND_MAX {
        Band::Low
    } else if total <= MEDIUM_BAND_MAX {
        Band::Medium
    } else {
        Band::High
    }
}

/// Place performance (contribution total) x potential (growth total)
pub fn nine_box_for(performance: f64, potential: f64) -> NineBoxPosition {
    NineBoxPosition {
        performance: band_for(performance),
        potential: band_for(potential),
    }
}
