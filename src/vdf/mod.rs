pub mod batch;
pub mod hashchain;
pub mod pietrzak;

pub use batch::*;
pub use hashchain::*;
pub use pietrzak::*;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::errors::{WitnessError, WitnessResult};

/// A delay proof from either backend, tagged by type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Proof {
    HashChain(VdfProof),
    Pietrzak(PietrzakProof),
}

/// Unified delay-function engine.
///
/// The hash-chain backend verifies in O(T); the Pietrzak backend
/// verifies in O(log T) with succinct proofs at comparable proving cost
/// per sequential step.
pub enum Vdf {
    HashChain(Parameters),
    Pietrzak(PietrzakVdf),
}

impl Vdf {
    /// Compute a proof over a 32-byte input targeting a wall-clock
    /// duration.
    pub fn compute(&self, input: [u8; 32], target_duration: Duration) -> WitnessResult<Proof> {
        match self {
            Vdf::HashChain(params) => {
                hashchain::compute(input, target_duration, *params).map(Proof::HashChain)
            }
            Vdf::Pietrzak(vdf) => {
                let rate = vdf.params().squarings_per_second;
                let t = ((target_duration.as_secs_f64() * rate as f64) as u64).max(1);
                let x = group_element_from_bytes(&input, &vdf.params().modulus);
                vdf.evaluate(&x, t).map(Proof::Pietrzak)
            }
        }
    }

    /// Verify a proof produced by the matching backend.
    pub fn verify(&self, proof: &Proof) -> WitnessResult<bool> {
        match (self, proof) {
            (Vdf::HashChain(_), Proof::HashChain(p)) => Ok(p.verify()),
            (Vdf::Pietrzak(vdf), Proof::Pietrzak(p)) => vdf.verify(p),
            _ => Err(WitnessError::params(
                "proof type does not match configured VDF backend",
            )),
        }
    }

    /// Lower bound on the elapsed time a proof attests.
    pub fn min_elapsed_time(&self, proof: &Proof) -> WitnessResult<Duration> {
        match (self, proof) {
            (Vdf::HashChain(params), Proof::HashChain(p)) => Ok(p.min_elapsed_time(*params)),
            (Vdf::Pietrzak(vdf), Proof::Pietrzak(p)) => Ok(vdf.min_elapsed_time(p)),
            _ => Err(WitnessError::params(
                "proof type does not match configured VDF backend",
            )),
        }
    }

    /// Combined check: the proof verifies and attests at least
    /// `min_duration` of sequential compute.
    pub fn verify_min_duration(&self, proof: &Proof, min_duration: Duration) -> WitnessResult<bool> {
        Ok(self.verify(proof)? && self.min_elapsed_time(proof)? >= min_duration)
    }
}

/// Map 32 input bytes deterministically into [2, N).
fn group_element_from_bytes(input: &[u8; 32], modulus: &BigUint) -> BigUint {
    let span = modulus - BigUint::from(2u32);
    BigUint::from_bytes_be(input) % span + BigUint::from(2u32)
}
