use serde::{Deserialize, Serialize};

use crate::parse::CriterionScores;

/// How per-chunk sub-scores combine into one agent-level score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationStrategy {
    /// Weight each chunk by its character length (default)
    #[default]
    WeightedAverage,
    /// Plain arithmetic mean
    Average,
    /// Most conservative chunk wins; use when any bad chunk should dominate
    Min,
    Max,
    /// Mean of the first and last chunk only
    FirstLast,
}

impl std::fmt::Display for AggregationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AggregationStrategy::WeightedAverage => "weighted_average",
            AggregationStrategy::Average => "average",
            AggregationStrategy::Min => "min",
            AggregationStrategy::Max => "max",
            AggregationStrategy::FirstLast => "first_last",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for AggregationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weighted_average" | "weighted" => Ok(AggregationStrategy::WeightedAverage),
            "average" | "mean" => Ok(AggregationStrategy::Average),
            "min" => Ok(AggregationStrategy::Min),
            "max" => Ok(AggregationStrategy::Max),
            "first_last" => Ok(AggregationStrategy::FirstLast),
            _ => Err(format!("Unknown aggregation strategy: {}", s)),
        }
    }
}

/// Sub-scores for one chunk of an oversized output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkScore {
    pub chunk_index: usize,
    pub sub_scores: CriterionScores,
    /// Character length of the chunk, used as its weight
    pub chunk_size: usize,
}

/// Aggregate chunk scores criterion by criterion.
///
/// A single-element list returns that element's scores unchanged under
/// every strategy, and every strategy stays within [min, max] of its
/// inputs. An empty list yields the neutral scores.
pub fn aggregate(scores: &[ChunkScore], strategy: AggregationStrategy) -> CriterionScores {
    if scores.is_empty() {
        return CriterionScores::neutral();
    }
    if scores.len() == 1 {
        return scores[0].sub_scores.clone();
    }

    let field = |get: fn(&CriterionScores) -> f64| -> f64 {
        let values: Vec<(f64, usize)> = scores
            .iter()
            .map(|s| (get(&s.sub_scores), s.chunk_size))
            .collect();
        combine(&values, strategy)
    };

    CriterionScores {
        task_achievement: field(|s| s.task_achievement),
        context_utilization: field(|s| s.context_utilization),
        output_quality: field(|s| s.output_quality),
        instruction_following: field(|s| s.instruction_following),
        hallucination_free: field(|s| s.hallucination_free),
        error_handling: field(|s| s.error_handling),
    }
}

fn combine(values: &[(f64, usize)], strategy: AggregationStrategy) -> f64 {
    match strategy {
        AggregationStrategy::WeightedAverage => {
            let total_weight: f64 = values.iter().map(|(_, w)| (*w).max(1) as f64).sum();
            let weighted_sum: f64 = values
                .iter()
                .map(|(v, w)| v * (*w).max(1) as f64)
                .sum();
            weighted_sum / total_weight
        }
        AggregationStrategy::Average => {
            values.iter().map(|(v, _)| v).sum::<f64>() / values.len() as f64
        }
        AggregationStrategy::Min => values.iter().map(|(v, _)| *v).fold(f64::INFINITY, f64::min),
        AggregationStrategy::Max => values
            .iter()
            .map(|(v, _)| *v)
            .fold(f64::NEG_INFINITY, f64::max),
        AggregationStrategy::FirstLast => {
            let first = values.first().map(|(v, _)| *v).unwrap_or(0.0);
            let last = values.last().map(|(v, _)| *v).unwrap_or(0.0);
            (first + last) / 2.0
        }
    }
}
