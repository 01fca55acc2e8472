use serde::{Deserialize, Serialize};

use crate::{Result, ScaleBurnError};

/// Token usage reported for a single completion call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOutcome {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl RequestOutcome {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }
}

/// Sums over one worker's sequential calls at a single concurrency level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerTotal {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub elapsed_secs: f64,
}

impl WorkerTotal {
    pub fn record(&mut self, outcome: &RequestOutcome) {
        self.prompt_tokens += outcome.prompt_tokens;
        self.completion_tokens += outcome.completion_tokens;
    }
}

/// Per-request averages for one concurrency level: the mean worker total
/// divided by the number of calls each worker made.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelStatistic {
    pub prompt_tokens: f64,
    pub completion_tokens: f64,
    #[serde(rename = "elapsed_time")]
    pub elapsed_secs: f64,
}

impl LevelStatistic {
    pub fn reduce(totals: &[WorkerTotal], requests_per_worker: u32) -> Result<Self> {
        if totals.is_empty() {
            return Err(ScaleBurnError::InvalidWorkload(
                "cannot reduce a level with no workers".to_string(),
            ));
        }
        if requests_per_worker == 0 {
            return Err(ScaleBurnError::Config(
                "requests_per_worker must be at least 1".to_string(),
            ));
        }

        let n = totals.len() as f64;
        let r = requests_per_worker as f64;

        let prompt = totals.iter().map(|t| t.prompt_tokens as f64).sum::<f64>() / n;
        let completion = totals.iter().map(|t| t.completion_tokens as f64).sum::<f64>() / n;
        let elapsed = totals.iter().map(|t| t.elapsed_secs).sum::<f64>() / n;

        Ok(Self {
            prompt_tokens: prompt / r,
            completion_tokens: completion / r,
            elapsed_secs: elapsed / r,
        })
    }

    /// Prompt tokens processed per second of request latency.
    pub fn prefill_tps(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.prompt_tokens / self.elapsed_secs
    }

    /// Generated tokens per second of request latency.
    pub fn decode_tps(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.completion_tokens / self.elapsed_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total(p: u64, c: u64, secs: f64) -> WorkerTotal {
        WorkerTotal {
            prompt_tokens: p,
            completion_tokens: c,
            elapsed_secs: secs,
        }
    }

    #[test]
    fn test_record_accumulates() {
        let mut t = WorkerTotal::default();
        t.record(&RequestOutcome::new(100, 10));
        t.record(&RequestOutcome::new(50, 5));
        assert_eq!(t.prompt_tokens, 150);
        assert_eq!(t.completion_tokens, 15);
    }

    #[test]
    fn test_reduce_is_mean_over_workers_per_request() {
        let totals = [total(200, 20, 1.0), total(400, 40, 3.0)];
        let stat = LevelStatistic::reduce(&totals, 2).unwrap();
        assert_eq!(stat.prompt_tokens, 150.0);
        assert_eq!(stat.completion_tokens, 15.0);
        assert_eq!(stat.elapsed_secs, 1.0);
    }

    #[test]
    fn test_reduce_constant_cost_is_independent_of_worker_count() {
        let one = LevelStatistic::reduce(&[total(1000, 100, 0.5)], 10).unwrap();
        let many = LevelStatistic::reduce(&vec![total(1000, 100, 0.5); 8], 10).unwrap();
        assert_eq!(one, many);
        assert_eq!(one.prompt_tokens, 100.0);
        assert_eq!(one.completion_tokens, 10.0);
    }

    #[test]
    fn test_reduce_rejects_empty_level() {
        let err = LevelStatistic::reduce(&[], 10).unwrap_err();
        assert!(matches!(err, ScaleBurnError::InvalidWorkload(_)));
    }

    #[test]
    fn test_reduce_rejects_zero_requests() {
        let err = LevelStatistic::reduce(&[total(10, 1, 0.1)], 0).unwrap_err();
        assert!(matches!(err, ScaleBurnError::Config(_)));
    }

    #[test]
    fn test_throughput() {
        let stat = LevelStatistic {
            prompt_tokens: 500.0,
            completion_tokens: 50.0,
            elapsed_secs: 0.5,
        };
        assert_eq!(stat.prefill_tps(), 1000.0);
        assert_eq!(stat.decode_tps(), 100.0);
        assert_eq!(LevelStatistic::default().decode_tps(), 0.0);
    }
}
