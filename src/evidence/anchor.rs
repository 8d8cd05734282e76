use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::encoding::{b64_hash, b64_vec};
use crate::core::errors::WitnessResult;

/// Proof that an external timestamping capability observed a hash.
///
/// The payload is opaque to the core; only the issuing provider can
/// interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorProof {
    /// Registry name of the issuing provider
    pub provider: String,
    #[serde(with = "b64_hash")]
    pub anchored_hash: [u8; 32],
    pub anchored_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(with = "b64_vec")]
    pub payload: Vec<u8>,
}

/// Provider's judgement on a previously issued anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorVerification {
    pub valid: bool,
    /// Time window the provider attests the hash existed within
    pub not_before: Option<DateTime<Utc>>,
    pub not_after: Option<DateTime<Utc>>,
}

/// External timestamping capability.
///
/// Implementations are opaque to the core; this boundary is not an
/// extension point for behavior beyond the documented contract.
pub trait AnchorProvider: Send + Sync {
    fn name(&self) -> &str;
    fn timestamp(&self, hash: &[u8; 32]) -> WitnessResult<AnchorProof>;
    fn verify(&self, proof: &AnchorProof) -> WitnessResult<AnchorVerification>;
}

/// Named lookup over configured anchor providers.
#[derive(Default)]
pub struct AnchorRegistry {
    providers: HashMap<String, Arc<dyn AnchorProvider>>,
}

impl AnchorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn AnchorProvider>) {
        self.providers
            .insert(provider.name().to_string(), provider);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn AnchorProvider>> {
        self.providers.get(name)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
