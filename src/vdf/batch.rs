use log::debug;
use rayon::prelude::*;

use crate::core::errors::{WitnessError, WitnessResult};
use crate::vdf::hashchain::VdfProof;

/// Outcome of verifying one proof in a batch; `index` matches the
/// position in the input slice.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub index: usize,
    pub valid: bool,
    pub error: Option<String>,
}

/// Concurrent verifier for independent VDF proofs.
///
/// Proofs share no state, so verification parallelizes cleanly across a
/// bounded worker pool.
pub struct BatchVerifier {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl BatchVerifier {
    /// Create a verifier with `workers` threads; 0 selects the logical
    /// CPU count.
    pub fn new(workers: usize) -> WitnessResult<Self> {
        let workers = if workers == 0 {
            rayon::current_num_threads()
        } else {
            workers
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| WitnessError::params(format!("failed to build worker pool: {e}")))?;
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Verify every proof, preserving input order in the results.
    /// Missing proofs are reported invalid with an explanatory error.
    pub fn verify_batch(&self, proofs: &[Option<VdfProof>]) -> Vec<BatchResult> {
        debug!(
            "batch-verifying {} proofs on {} workers",
            proofs.len(),
            self.workers
        );
        self.pool.install(|| {
            proofs
                .par_iter()
                .enumerate()
                .map(|(index, proof)| match proof {
                    None => BatchResult {
                        index,
                        valid: false,
                        error: Some("missing proof".to_string()),
                    },
                    Some(p) => {
                        let valid = p.verify();
                        BatchResult {
                            index,
                            valid,
                            error: (!valid).then(|| "hash chain recomputation mismatch".to_string()),
                        }
                    }
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::utils::sha256;
    use crate::vdf::hashchain::compute_iterations;

    #[test]
    fn test_batch_preserves_order_and_validity() {
        let verifier = BatchVerifier::new(2).expect("verifier");

        let good = compute_iterations(sha256(b"a"), 50);
        let mut bad = compute_iterations(sha256(b"b"), 50);
        bad.output[0] ^= 0x01;

        let results = verifier.verify_batch(&[Some(good), None, Some(bad)]);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].index, 0);
        assert!(results[0].valid);
        assert!(results[0].error.is_none());

        assert_eq!(results[1].index, 1);
        assert!(!results[1].valid);
        assert_eq!(results[1].error.as_deref(), Some("missing proof"));

        assert_eq!(results[2].index, 2);
        assert!(!results[2].valid);
        assert!(results[2].error.is_some());
    }

    #[test]
    fn test_default_worker_count_is_cpu_count() {
        let verifier = BatchVerifier::new(0).expect("verifier");
        assert!(verifier.workers() >= 1);
    }

    #[test]
    fn test_empty_batch() {
        let verifier = BatchVerifier::new(1).expect("verifier");
        assert!(verifier.verify_batch(&[]).is_empty());
    }
}
