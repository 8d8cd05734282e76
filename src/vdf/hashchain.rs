use log::{debug, info};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use crate::core::encoding::b64_hash;
use crate::core::errors::{WitnessError, WitnessResult};
use crate::core::types::*;
use crate::core::utils::sha256;

/// Calibrated parameters for the sequential-hash delay function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameters {
    /// Measured SHA-256 chain throughput of this machine
    pub iterations_per_second: u64,
    /// Floor applied to every computed proof
    pub min_iterations: u64,
    /// Ceiling above which computation is refused
    pub max_iterations: u64,
}

/// Conservative defaults usable without calibration.
///
/// The rate corresponds to low-end hardware so attested durations stay a
/// lower bound on faster machines too.
pub fn default_parameters() -> Parameters {
    let rate = 1_000_000;
    Parameters {
        iterations_per_second: rate,
        min_iterations: rate / MIN_ITERATIONS_DIVISOR,
        max_iterations: rate * MAX_ITERATIONS_WINDOW_SECS,
    }
}

/// Proof that at least `iterations` sequential SHA-256 operations were
/// performed starting from `input`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VdfProof {
    #[serde(with = "b64_hash")]
    pub input: [u8; 32],
    #[serde(with = "b64_hash")]
    pub output: [u8; 32],
    pub iterations: u64,
    /// Producer-observed compute time. Informational only, never a
    /// trusted time source.
    pub duration: Duration,
}

/// Derive the VDF input binding a proof to one chain position.
///
/// Prevents replaying a proof under another chain, content state, or
/// ordinal.
pub fn chain_input(content_hash: [u8; 32], previous_hash: [u8; 32], ordinal: u64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(VDF_CHAIN_INPUT_TAG);
    hasher.update(content_hash);
    hasher.update(previous_hash);
    hasher.update(ordinal.to_be_bytes());
    hasher.finalize().into()
}

/// Measure this machine's sequential SHA-256 throughput and derive
/// parameters from it.
///
/// Sampling durations under 100ms are rejected - the measurement noise
/// would dominate. Reproducibility within 2x is sufficient.
pub fn calibrate(duration: Duration) -> WitnessResult<Parameters> {
    if duration < Duration::from_millis(MIN_CALIBRATION_MS) {
        return Err(WitnessError::params(format!(
            "calibration duration too short: {:?} (minimum {}ms)",
            duration, MIN_CALIBRATION_MS
        )));
    }

    let mut state = sha256(CALIBRATION_INPUT_TAG);
    let start = Instant::now();
    let mut iterations = 0u64;
    while start.elapsed() < duration {
        for _ in 0..1024 {
            state = sha256(&state);
        }
        iterations += 1024;
    }
    let elapsed = start.elapsed().as_secs_f64();
    let rate = ((iterations as f64 / elapsed) as u64).max(1);

    info!("VDF calibration: {} iterations/sec", rate);

    Ok(Parameters {
        iterations_per_second: rate,
        min_iterations: (rate / MIN_ITERATIONS_DIVISOR).max(1),
        max_iterations: rate.saturating_mul(MAX_ITERATIONS_WINDOW_SECS),
    })
}

/// Compute a proof targeting a wall-clock duration under the calibrated
/// rate.
///
/// The iteration count is clamped up to `min_iterations`; exceeding
/// `max_iterations` is refused rather than clamped so a corrupted clock
/// cannot demand hours of compute.
pub fn compute(
    input: [u8; 32],
    target_duration: Duration,
    params: Parameters,
) -> WitnessResult<VdfProof> {
    let mut iterations =
        (target_duration.as_secs_f64() * params.iterations_per_second as f64) as u64;
    if iterations < params.min_iterations {
        iterations = params.min_iterations;
    }
    if iterations > params.max_iterations {
        return Err(WitnessError::params(format!(
            "required iterations {} exceed configured maximum {}",
            iterations, params.max_iterations
        )));
    }
    Ok(compute_iterations(input, iterations))
}

/// Compute a proof for an explicit iteration count.
pub fn compute_iterations(input: [u8; 32], iterations: u64) -> VdfProof {
    let start = Instant::now();
    let mut state = input;
    for _ in 0..iterations {
        state = sha256(&state);
    }
    let duration = start.elapsed();

    debug!(
        "VDF computed: {} iterations in {}ms",
        iterations,
        duration.as_millis()
    );

    VdfProof {
        input,
        output: state,
        iterations,
        duration,
    }
}

impl VdfProof {
    /// Re-run the hash chain and compare.
    ///
    /// A zero-iteration proof is the valid degenerate case where the
    /// output equals the input.
    pub fn verify(&self) -> bool {
        let mut state = self.input;
        for _ in 0..self.iterations {
            state = sha256(&state);
        }
        state == self.output
    }

    /// Verify while emitting fractional progress roughly every 1% of
    /// iterations. The sender is dropped (closing the channel) on
    /// completion; an absent receiver is tolerated.
    pub fn verify_with_progress(&self, progress: Option<Sender<f64>>) -> bool {
        let step = (self.iterations / 100).max(1);
        let mut state = self.input;
        let mut done = 0u64;
        while done < self.iterations {
            let batch = step.min(self.iterations - done);
            for _ in 0..batch {
                state = sha256(&state);
            }
            done += batch;
            if let Some(tx) = &progress {
                let _ = tx.send(done as f64 / self.iterations as f64);
            }
        }
        drop(progress);
        state == self.output
    }

    /// Verify with a soft deadline, checked every 1024 iterations.
    pub fn verify_with_deadline(&self, deadline: Option<Instant>) -> WitnessResult<bool> {
        let started = Instant::now();
        let mut state = self.input;
        let mut done = 0u64;
        while done < self.iterations {
            if let Some(limit) = deadline {
                if Instant::now() >= limit {
                    return Err(WitnessError::Timeout {
                        elapsed_ms: started.elapsed().as_millis() as u64,
                    });
                }
            }
            let batch = 1024.min(self.iterations - done);
            for _ in 0..batch {
                state = sha256(&state);
            }
            done += batch;
        }
        Ok(state == self.output)
    }

    /// Lower bound on the real time this proof attests, at the
    /// calibrated rate.
    pub fn min_elapsed_time(&self, params: Parameters) -> Duration {
        Duration::from_secs_f64(self.iterations as f64 / params.iterations_per_second as f64)
    }

    /// Fixed 80-byte wire encoding:
    /// `input(32) || output(32) || iterations(u64 BE) || duration_ns(u64 BE)`
    pub fn encode(&self) -> [u8; VDF_PROOF_WIRE_SIZE] {
        let mut buf = [0u8; VDF_PROOF_WIRE_SIZE];
        buf[0..32].copy_from_slice(&self.input);
        buf[32..64].copy_from_slice(&self.output);
        buf[64..72].copy_from_slice(&self.iterations.to_be_bytes());
        buf[72..80].copy_from_slice(&(self.duration.as_nanos() as u64).to_be_bytes());
        buf
    }

    /// Decode from wire format. Accepts any buffer of at least 80 bytes,
    /// ignoring trailing data.
    pub fn decode(data: &[u8]) -> WitnessResult<VdfProof> {
        if data.len() < VDF_PROOF_WIRE_SIZE {
            return Err(WitnessError::decode(format!(
                "VDF proof too short: {} bytes (need {})",
                data.len(),
                VDF_PROOF_WIRE_SIZE
            )));
        }
        let mut input = [0u8; 32];
        let mut output = [0u8; 32];
        input.copy_from_slice(&data[0..32]);
        output.copy_from_slice(&data[32..64]);
        let iterations = u64::from_be_bytes(data[64..72].try_into().expect("fixed slice"));
        let duration_ns = u64::from_be_bytes(data[72..80].try_into().expect("fixed slice"));
        Ok(VdfProof {
            input,
            output,
            iterations,
            duration: Duration::from_nanos(duration_ns),
        })
    }
}
