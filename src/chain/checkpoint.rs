use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::encoding::{b64_hash, b64_opt_sig};
use crate::core::errors::{WitnessError, WitnessResult};
use crate::core::types::*;
use crate::core::utils::{
    atomic_write_private, create_private_dir, document_id, timestamp_ns, PerformanceTimer,
};
use crate::vdf::hashchain::{self, Parameters, VdfProof};

/// A single content commit, hash-linked to its predecessor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub ordinal: u64,
    /// All-zero exactly on the genesis checkpoint
    #[serde(with = "b64_hash")]
    pub previous_hash: [u8; 32],
    /// Binding hash over the cryptographically meaningful fields
    #[serde(with = "b64_hash")]
    pub hash: [u8; 32],
    #[serde(with = "b64_hash")]
    pub content_hash: [u8; 32],
    pub content_size: i64,
    /// Advisory; serialized but excluded from the binding hash so the
    /// document may be renamed without breaking the chain
    pub file_path: String,
    /// Advisory wall-clock time; the VDF is the time authority
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Present on every non-genesis checkpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vdf_proof: Option<VdfProof>,
    /// Ratchet signature over `hash`, attached after the hash is fixed
    #[serde(default, with = "b64_opt_sig", skip_serializing_if = "Option::is_none")]
    pub signature: Option<[u8; 64]>,
}

impl Checkpoint {
    /// Recompute the binding hash:
    /// `SHA-256(tag || ordinal || previous_hash || content_hash ||
    /// content_size || timestamp_ns || vdf_encoding?)`.
    ///
    /// `file_path`, `message`, and `signature` are advisory and
    /// excluded; signatures are produced after this hash is fixed.
    pub fn compute_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(CHECKPOINT_TAG);
        hasher.update(self.ordinal.to_be_bytes());
        hasher.update(self.previous_hash);
        hasher.update(self.content_hash);
        hasher.update((self.content_size as u64).to_be_bytes());
        hasher.update((timestamp_ns(self.timestamp) as u64).to_be_bytes());
        if let Some(vdf) = &self.vdf_proof {
            hasher.update(vdf.encode());
        }
        hasher.finalize().into()
    }
}

/// The ordered checkpoint sequence for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chain {
    /// Hex of the first 8 bytes of SHA-256(absolute document path)
    pub document_id: String,
    pub document_path: String,
    pub created_at: DateTime<Utc>,
    pub checkpoints: Vec<Checkpoint>,
    pub vdf_params: Parameters,
    #[serde(skip)]
    storage_path: Option<PathBuf>,
}

impl Chain {
    /// Create an empty chain for a document.
    pub fn new(document_path: impl AsRef<Path>, vdf_params: Parameters) -> WitnessResult<Self> {
        let abs_path = fs::canonicalize(document_path.as_ref())?;
        let document_path = abs_path.to_string_lossy().to_string();

        Ok(Self {
            document_id: document_id(&document_path),
            document_path,
            created_at: Utc::now(),
            checkpoints: Vec::new(),
            vdf_params,
            storage_path: None,
        })
    }

    /// Commit the document's current content.
    ///
    /// The VDF target duration is the wall-clock gap since the previous
    /// checkpoint, so the attested time tracks real authoring time.
    pub fn commit(&mut self, message: Option<String>) -> WitnessResult<Checkpoint> {
        let target = match self.checkpoints.last() {
            Some(prev) => (Utc::now() - prev.timestamp)
                .to_std()
                .unwrap_or(Duration::ZERO),
            None => Duration::ZERO,
        };
        self.commit_with_vdf_duration(message, target)
    }

    /// Commit with an explicit VDF target duration.
    pub fn commit_with_vdf_duration(
        &mut self,
        message: Option<String>,
        vdf_duration: Duration,
    ) -> WitnessResult<Checkpoint> {
        let timer = PerformanceTimer::new("commit");
        let content = fs::read(&self.document_path)?;
        let content_hash: [u8; 32] = Sha256::digest(&content).into();
        let ordinal = self.checkpoints.len() as u64;

        let previous_hash = match self.checkpoints.last() {
            Some(prev) => prev.hash,
            None => [0u8; 32],
        };

        let mut checkpoint = Checkpoint {
            ordinal,
            previous_hash,
            hash: [0u8; 32],
            content_hash,
            content_size: content.len() as i64,
            file_path: self.document_path.clone(),
            timestamp: Utc::now(),
            message,
            vdf_proof: None,
            signature: None,
        };

        if ordinal > 0 {
            let input = hashchain::chain_input(content_hash, previous_hash, ordinal);
            let proof = hashchain::compute(input, vdf_duration, self.vdf_params)?;
            checkpoint.vdf_proof = Some(proof);
        }

        checkpoint.hash = checkpoint.compute_hash();
        self.checkpoints.push(checkpoint.clone());

        let elapsed = timer.finish();
        info!(
            "checkpoint {} committed for document {} ({} bytes) in {}ms",
            ordinal, self.document_id, checkpoint.content_size, elapsed
        );

        Ok(checkpoint)
    }

    /// Verify every binding hash, link, and VDF proof.
    ///
    /// Fails at the first violation, naming its kind and ordinal.
    /// Signatures are deliberately not checked here; they verify through
    /// the key-hierarchy evidence path.
    pub fn verify(&self) -> WitnessResult<()> {
        for (i, checkpoint) in self.checkpoints.iter().enumerate() {
            let ordinal = i as u64;

            if checkpoint.ordinal != ordinal || checkpoint.compute_hash() != checkpoint.hash {
                return Err(WitnessError::HashMismatch { ordinal });
            }

            if i == 0 {
                if checkpoint.previous_hash != [0u8; 32] {
                    return Err(WitnessError::BrokenLink { ordinal });
                }
                continue;
            }

            if checkpoint.previous_hash != self.checkpoints[i - 1].hash {
                return Err(WitnessError::BrokenLink { ordinal });
            }

            let vdf = checkpoint
                .vdf_proof
                .as_ref()
                .ok_or(WitnessError::MissingVdf { ordinal })?;
            let expected_input = hashchain::chain_input(
                checkpoint.content_hash,
                checkpoint.previous_hash,
                checkpoint.ordinal,
            );
            if vdf.input != expected_input {
                return Err(WitnessError::VdfInputMismatch { ordinal });
            }
            if !vdf.verify() {
                return Err(WitnessError::VdfInvalid { ordinal });
            }
        }

        Ok(())
    }

    /// Sum of the VDF-attested lower bounds across all checkpoints.
    pub fn total_elapsed_time(&self) -> Duration {
        self.checkpoints
            .iter()
            .filter_map(|cp| cp.vdf_proof.as_ref())
            .map(|vdf| vdf.min_elapsed_time(self.vdf_params))
            .sum()
    }

    pub fn summary(&self) -> ChainSummary {
        ChainSummary {
            document_id: self.document_id.clone(),
            document_path: self.document_path.clone(),
            checkpoint_count: self.checkpoints.len(),
            first_commit: self.checkpoints.first().map(|cp| cp.timestamp),
            last_commit: self.checkpoints.last().map(|cp| cp.timestamp),
            total_elapsed_time: self.total_elapsed_time(),
            final_content_hash: self.checkpoints.last().map(|cp| hex::encode(cp.content_hash)),
            chain_valid: self.verify().is_ok(),
        }
    }

    pub fn latest(&self) -> Option<&Checkpoint> {
        self.checkpoints.last()
    }

    pub fn at(&self, ordinal: u64) -> WitnessResult<&Checkpoint> {
        self.checkpoints
            .get(ordinal as usize)
            .ok_or_else(|| WitnessError::params(format!("ordinal {ordinal} out of range")))
    }

    /// Persist as JSON under a private directory (0700) and file (0600).
    pub fn save(&mut self, path: impl AsRef<Path>) -> WitnessResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            create_private_dir(parent)?;
        }
        let data = serde_json::to_vec_pretty(self)?;
        atomic_write_private(path, &data)?;
        self.storage_path = Some(path.to_path_buf());
        debug!("chain {} saved to {}", self.document_id, path.display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> WitnessResult<Self> {
        let data = fs::read(path.as_ref())?;
        let mut chain: Chain = serde_json::from_slice(&data)?;
        chain.storage_path = Some(path.as_ref().to_path_buf());
        debug!(
            "chain {} loaded with {} checkpoints",
            chain.document_id,
            chain.checkpoints.len()
        );
        Ok(chain)
    }

    /// Canonical chain file location for a document under a state
    /// directory.
    pub fn chain_path(
        document_path: impl AsRef<Path>,
        state_dir: impl AsRef<Path>,
    ) -> WitnessResult<PathBuf> {
        let abs_path = fs::canonicalize(document_path.as_ref())?;
        let doc_id = document_id(&abs_path.to_string_lossy());
        Ok(state_dir
            .as_ref()
            .join("chains")
            .join(format!("{doc_id}.json")))
    }

    /// Load the existing chain for a document, or create a fresh one.
    pub fn get_or_create(
        document_path: impl AsRef<Path>,
        state_dir: impl AsRef<Path>,
        vdf_params: Parameters,
    ) -> WitnessResult<Self> {
        let path = Self::chain_path(&document_path, &state_dir)?;
        if path.exists() {
            return Self::load(path);
        }
        let mut chain = Self::new(&document_path, vdf_params)?;
        chain.storage_path = Some(path);
        Ok(chain)
    }

    pub fn storage_path(&self) -> Option<&Path> {
        self.storage_path.as_deref()
    }
}

/// Condensed view of a chain's state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSummary {
    pub document_id: String,
    pub document_path: String,
    pub checkpoint_count: usize,
    pub first_commit: Option<DateTime<Utc>>,
    pub last_commit: Option<DateTime<Utc>>,
    pub total_elapsed_time: Duration,
    pub final_content_hash: Option<String>,
    pub chain_valid: bool,
}
