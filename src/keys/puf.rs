use hmac::{Hmac, Mac};
use log::{debug, info};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use std::fs;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

use crate::core::errors::{WitnessError, WitnessResult};
use crate::core::types::SOFTWARE_PUF_TAG;
use crate::core::utils::{atomic_write_private, create_private_dir, fingerprint_hex, sha256_concat};

type HmacSha256 = Hmac<Sha256>;

/// Device-bound challenge/response capability.
///
/// The core requires only that the same device always returns the same
/// response for the same challenge, and that different devices diverge
/// with overwhelming probability. Backends must not rely on the core to
/// keep state for them.
pub trait PufProvider: Send + Sync {
    fn get_response(&self, challenge: &[u8; 32]) -> WitnessResult<[u8; 32]>;
    fn device_id(&self) -> &str;
}

/// Software fingerprint backend.
///
/// A random 32-byte seed is persisted at a well-known path (0600 under a
/// 0700 directory) and mixed with stable machine characteristics, so the
/// binding is to this installation by convention rather than by
/// hardware.
#[derive(Debug)]
pub struct SoftwarePuf {
    seed: Zeroizing<[u8; 32]>,
    machine_fingerprint: [u8; 32],
    device_id: String,
    seed_path: PathBuf,
}

impl SoftwarePuf {
    /// Load the seed at `seed_path`, creating it on first use.
    pub fn open(seed_path: impl AsRef<Path>) -> WitnessResult<Self> {
        let seed_path = seed_path.as_ref().to_path_buf();

        let seed = if seed_path.exists() {
            let bytes = fs::read(&seed_path).map_err(|e| WitnessError::PufUnavailable {
                reason: format!("failed to read seed file: {e}"),
            })?;
            let arr: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| WitnessError::Puf {
                reason: format!("seed file corrupt: {} bytes (expected 32)", b.len()),
            })?;
            debug!("loaded software PUF seed from {}", seed_path.display());
            Zeroizing::new(arr)
        } else {
            if let Some(parent) = seed_path.parent() {
                create_private_dir(parent)?;
            }
            let mut fresh = Zeroizing::new([0u8; 32]);
            OsRng.fill_bytes(fresh.as_mut());
            atomic_write_private(&seed_path, fresh.as_ref())?;
            info!("generated software PUF seed at {}", seed_path.display());
            fresh
        };

        let machine_fingerprint = machine_fingerprint();
        let device_id = format!(
            "software-{}",
            fingerprint_hex(&[seed.as_ref(), &machine_fingerprint[..]].concat())
        );

        Ok(Self {
            seed,
            machine_fingerprint,
            device_id,
            seed_path,
        })
    }

    pub fn seed_path(&self) -> &Path {
        &self.seed_path
    }
}

impl PufProvider for SoftwarePuf {
    fn get_response(&self, challenge: &[u8; 32]) -> WitnessResult<[u8; 32]> {
        hmac_response(self.seed.as_ref(), &self.machine_fingerprint, challenge)
    }

    fn device_id(&self) -> &str {
        &self.device_id
    }
}

/// Fixed-seed backend for tests and as a stand-in where a hardware
/// capability supplies the seed material directly.
pub struct StaticPuf {
    seed: Zeroizing<[u8; 32]>,
    device_id: String,
}

impl StaticPuf {
    pub fn new(seed: [u8; 32], device_id: impl Into<String>) -> Self {
        Self {
            seed: Zeroizing::new(seed),
            device_id: device_id.into(),
        }
    }
}

impl PufProvider for StaticPuf {
    fn get_response(&self, challenge: &[u8; 32]) -> WitnessResult<[u8; 32]> {
        hmac_response(self.seed.as_ref(), &[0u8; 32], challenge)
    }

    fn device_id(&self) -> &str {
        &self.device_id
    }
}

fn hmac_response(
    seed: &[u8],
    machine_fingerprint: &[u8],
    challenge: &[u8; 32],
) -> WitnessResult<[u8; 32]> {
    let mut mac = HmacSha256::new_from_slice(seed).map_err(|e| WitnessError::Puf {
        reason: format!("invalid seed length: {e}"),
    })?;
    mac.update(SOFTWARE_PUF_TAG);
    mac.update(machine_fingerprint);
    mac.update(challenge);
    Ok(mac.finalize().into_bytes().into())
}

/// Stable characteristics of this machine, hashed.
fn machine_fingerprint() -> [u8; 32] {
    let hostname = fs::read_to_string("/etc/hostname")
        .map(|s| s.trim().to_string())
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_else(|_| "unknown-host".to_string());

    sha256_concat(&[
        hostname.as_bytes(),
        std::env::consts::OS.as_bytes(),
        std::env::consts::ARCH.as_bytes(),
    ])
}
