use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use log::info;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::core::encoding::{b64_hash, b64_sig};
use crate::core::errors::{WitnessError, WitnessResult};
use crate::core::types::*;
use crate::core::utils::timestamp_ns;
use crate::keys::identity::{derive_master_identity, MasterIdentity};
use crate::keys::puf::PufProvider;

/// Statement, signed by a legacy key, that a PUF-bound identity
/// succeeds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    #[serde(with = "b64_hash")]
    pub legacy_public_key: [u8; 32],
    #[serde(with = "b64_hash")]
    pub new_master_public_key: [u8; 32],
    pub timestamp: DateTime<Utc>,
    #[serde(with = "b64_sig")]
    pub signature: [u8; 64],
}

fn migration_payload(
    legacy_public_key: &[u8; 32],
    new_master_public_key: &[u8; 32],
    timestamp: DateTime<Utc>,
) -> Vec<u8> {
    let mut payload = Vec::with_capacity(KEY_MIGRATION_TAG.len() + 32 + 32 + 8);
    payload.extend_from_slice(KEY_MIGRATION_TAG);
    payload.extend_from_slice(legacy_public_key);
    payload.extend_from_slice(new_master_public_key);
    payload.extend_from_slice(&(timestamp_ns(timestamp) as u64).to_be_bytes());
    payload
}

/// Migrate a legacy Ed25519 key to a PUF-bound master identity.
///
/// Accepts a raw 32-byte seed or a 64-byte private key (seed followed by
/// public key). The legacy secret is wiped before return.
pub fn migrate_from_legacy_key(
    puf: &dyn PufProvider,
    legacy_key: &[u8],
) -> WitnessResult<(MigrationRecord, MasterIdentity)> {
    let seed: Zeroizing<[u8; 32]> = match legacy_key.len() {
        32 => Zeroizing::new(legacy_key.try_into().expect("length checked")),
        64 => {
            let seed: Zeroizing<[u8; 32]> =
                Zeroizing::new(legacy_key[..32].try_into().expect("length checked"));
            let declared_public: [u8; 32] = legacy_key[32..].try_into().expect("length checked");
            let derived = SigningKey::from_bytes(&seed).verifying_key().to_bytes();
            if derived != declared_public {
                return Err(WitnessError::InvalidMigration {
                    reason: "legacy public key does not match its seed".to_string(),
                });
            }
            seed
        }
        other => {
            return Err(WitnessError::InvalidMigration {
                reason: format!("legacy key must be 32 or 64 bytes, got {other}"),
            });
        }
    };

    let legacy_signing = SigningKey::from_bytes(&seed);
    let legacy_public_key = legacy_signing.verifying_key().to_bytes();

    let identity = derive_master_identity(puf)?;
    let timestamp = Utc::now();
    let payload = migration_payload(&legacy_public_key, &identity.public_key, timestamp);
    let signature = legacy_signing.sign(&payload).to_bytes();

    info!(
        "migrated legacy key {} to master identity {}",
        hex::encode(&legacy_public_key[..8]),
        identity.fingerprint
    );

    Ok((
        MigrationRecord {
            legacy_public_key,
            new_master_public_key: identity.public_key,
            timestamp,
            signature,
        },
        identity,
    ))
}

/// Verify a migration record's legacy-key signature.
pub fn verify_migration_record(record: &MigrationRecord) -> WitnessResult<()> {
    let legacy =
        VerifyingKey::from_bytes(&record.legacy_public_key).map_err(|e| {
            WitnessError::InvalidMigration {
                reason: format!("malformed legacy public key: {e}"),
            }
        })?;
    let payload = migration_payload(
        &record.legacy_public_key,
        &record.new_master_public_key,
        record.timestamp,
    );
    let signature = Signature::from_bytes(&record.signature);
    legacy
        .verify_strict(&payload, &signature)
        .map_err(|_| WitnessError::InvalidMigration {
            reason: "legacy signature verification failed".to_string(),
        })
}
