use chrono::{DateTime, SecondsFormat, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use log::{debug, info};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use crate::core::encoding::{b64_hash, b64_sig};
use crate::core::errors::{WitnessError, WitnessResult};
use crate::core::types::*;
use crate::core::utils::timestamp_ns;
use crate::keys::hkdf_derive;
use crate::keys::identity::{derive_master_identity, ephemeral_master_key, MasterIdentity};
use crate::keys::puf::PufProvider;

/// Master-key attestation that a session key speaks for the device
/// identity on one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCertificate {
    #[serde(with = "b64_hash")]
    pub session_id: [u8; 32],
    #[serde(with = "b64_hash")]
    pub session_pubkey: [u8; 32],
    pub created_at: DateTime<Utc>,
    /// Binds the session to the document's content at session start
    #[serde(with = "b64_hash")]
    pub document_hash: [u8; 32],
    #[serde(with = "b64_hash")]
    pub master_pubkey: [u8; 32],
    #[serde(with = "b64_sig")]
    pub signature: [u8; 64],
}

impl SessionCertificate {
    /// Canonical signed payload:
    /// `session_id(32) || session_pubkey(32) || created_at_ns(u64 BE) || document_hash(32)`
    pub fn payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(32 + 32 + 8 + 32);
        payload.extend_from_slice(&self.session_id);
        payload.extend_from_slice(&self.session_pubkey);
        payload.extend_from_slice(&(timestamp_ns(self.created_at) as u64).to_be_bytes());
        payload.extend_from_slice(&self.document_hash);
        payload
    }
}

/// One entry in a session's ordered signature list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointSignature {
    pub ordinal: u64,
    /// The per-checkpoint ratchet public key
    #[serde(with = "b64_hash")]
    pub public_key: [u8; 32],
    #[serde(with = "b64_hash")]
    pub checkpoint_hash: [u8; 32],
    #[serde(with = "b64_sig")]
    pub signature: [u8; 64],
}

/// Forward-secret ratchet state. In-memory only, never serialized.
#[derive(Debug)]
struct RatchetState {
    current: Zeroizing<[u8; 32]>,
    ordinal: u64,
    wiped: bool,
}

/// Serializable key-hierarchy evidence for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvidence {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_identity: Option<MasterIdentity>,
    pub session_certificate: SessionCertificate,
    pub signatures: Vec<CheckpointSignature>,
}

/// Owns a session's certificate, ratchet, and signature list.
///
/// All operations on one manager are serialized by `&mut self`; the
/// forward-secrecy guarantee depends on totally ordered ratchet
/// advances.
#[derive(Debug)]
pub struct SessionManager {
    identity: MasterIdentity,
    certificate: SessionCertificate,
    ratchet: RatchetState,
    signatures: Vec<CheckpointSignature>,
}

impl SessionManager {
    /// Start a session for a document.
    ///
    /// Derives the master key ephemerally, certifies a fresh session
    /// key, and seeds the ratchet. Every intermediate secret is wiped
    /// before return.
    pub fn start(puf: &dyn PufProvider, document_hash: [u8; 32]) -> WitnessResult<Self> {
        let identity = derive_master_identity(puf)?;
        let master_key = ephemeral_master_key(puf)?;

        let mut session_id = [0u8; 32];
        OsRng.fill_bytes(&mut session_id);
        let created_at = Utc::now();

        let master_seed = Zeroizing::new(master_key.to_bytes());
        let mut info = Vec::with_capacity(SESSION_ID_SIZE + 35);
        info.extend_from_slice(&session_id);
        info.extend_from_slice(
            created_at
                .to_rfc3339_opts(SecondsFormat::Nanos, true)
                .as_bytes(),
        );
        let session_seed = hkdf_derive(master_seed.as_ref(), SESSION_SALT, &info)?;
        info.zeroize();

        let session_key = SigningKey::from_bytes(&session_seed);
        let session_pubkey = session_key.verifying_key().to_bytes();

        let mut certificate = SessionCertificate {
            session_id,
            session_pubkey,
            created_at,
            document_hash,
            master_pubkey: identity.public_key,
            signature: [0u8; 64],
        };
        certificate.signature = master_key.sign(&certificate.payload()).to_bytes();

        let ratchet_seed = hkdf_derive(session_seed.as_ref(), RATCHET_INIT_SALT, b"")?;

        info!(
            "session {} started for identity {}",
            hex::encode(&session_id[..8]),
            identity.fingerprint
        );

        Ok(Self {
            identity,
            certificate,
            ratchet: RatchetState {
                current: ratchet_seed,
                ordinal: 0,
                wiped: false,
            },
            signatures: Vec::new(),
        })
    }

    /// Sign a checkpoint hash with the current ratchet key and advance.
    ///
    /// The advance mixes the checkpoint hash into the next secret, tying
    /// the sequence of per-checkpoint public keys to the sequence of
    /// signed hashes. The prior secret and the one-shot signing seed are
    /// wiped before this returns.
    pub fn sign_checkpoint(
        &mut self,
        checkpoint_hash: [u8; 32],
    ) -> WitnessResult<CheckpointSignature> {
        if self.ratchet.wiped {
            return Err(WitnessError::RatchetWiped);
        }

        let signing_seed = hkdf_derive(self.ratchet.current.as_ref(), SIGNING_KEY_SALT, b"")?;
        let signing_key = SigningKey::from_bytes(&signing_seed);
        let public_key = signing_key.verifying_key().to_bytes();
        let signature = signing_key.sign(&checkpoint_hash).to_bytes();

        let next = hkdf_derive(
            self.ratchet.current.as_ref(),
            RATCHET_ADVANCE_SALT,
            &checkpoint_hash,
        )?;
        self.ratchet.current.zeroize();
        self.ratchet.current.copy_from_slice(next.as_ref());

        let record = CheckpointSignature {
            ordinal: self.ratchet.ordinal,
            public_key,
            checkpoint_hash,
            signature,
        };
        self.ratchet.ordinal += 1;
        self.signatures.push(record.clone());

        debug!(
            "signed checkpoint {} under ratchet key {}",
            record.ordinal,
            hex::encode(&public_key[..8])
        );

        Ok(record)
    }

    /// Wipe the ratchet and end the session. Idempotent.
    pub fn end_session(&mut self) {
        if !self.ratchet.wiped {
            self.ratchet.current.zeroize();
            self.ratchet.wiped = true;
            info!(
                "session {} ended after {} signatures",
                hex::encode(&self.certificate.session_id[..8]),
                self.signatures.len()
            );
        }
    }

    pub fn is_ended(&self) -> bool {
        self.ratchet.wiped
    }

    pub fn identity(&self) -> &MasterIdentity {
        &self.identity
    }

    pub fn certificate(&self) -> &SessionCertificate {
        &self.certificate
    }

    pub fn signatures(&self) -> &[CheckpointSignature] {
        &self.signatures
    }

    /// Next ordinal the ratchet will sign.
    pub fn next_ordinal(&self) -> u64 {
        self.ratchet.ordinal
    }

    /// Export the key-hierarchy evidence for this session.
    pub fn key_evidence(&self) -> KeyEvidence {
        KeyEvidence {
            master_identity: Some(self.identity.clone()),
            session_certificate: self.certificate.clone(),
            signatures: self.signatures.clone(),
        }
    }

    pub(crate) fn ratchet_secret(&self) -> &[u8; 32] {
        &self.ratchet.current
    }

    pub(crate) fn from_parts(
        identity: MasterIdentity,
        certificate: SessionCertificate,
        ratchet_secret: Zeroizing<[u8; 32]>,
        next_ordinal: u64,
        signatures: Vec<CheckpointSignature>,
    ) -> Self {
        Self {
            identity,
            certificate,
            ratchet: RatchetState {
                current: ratchet_secret,
                ordinal: next_ordinal,
                wiped: false,
            },
            signatures,
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.end_session();
    }
}

/// Verify a session certificate against its embedded master key.
pub fn verify_session_certificate(certificate: &SessionCertificate) -> WitnessResult<()> {
    let master = VerifyingKey::from_bytes(&certificate.master_pubkey).map_err(|e| {
        WitnessError::InvalidCert {
            reason: format!("malformed master public key: {e}"),
        }
    })?;
    let signature = Signature::from_bytes(&certificate.signature);
    master
        .verify_strict(&certificate.payload(), &signature)
        .map_err(|_| WitnessError::InvalidCert {
            reason: "master signature verification failed".to_string(),
        })
}

/// Verify an ordered signature list: contiguous ordinals from 0 and a
/// valid Ed25519 signature under each declared per-checkpoint key.
pub fn verify_checkpoint_signatures(signatures: &[CheckpointSignature]) -> WitnessResult<()> {
    for (index, record) in signatures.iter().enumerate() {
        if record.ordinal != index as u64 {
            return Err(WitnessError::OrdinalMismatch {
                index,
                expected: index as u64,
                actual: record.ordinal,
            });
        }
        let key = VerifyingKey::from_bytes(&record.public_key)
            .map_err(|_| WitnessError::SignatureFailed { index })?;
        let signature = Signature::from_bytes(&record.signature);
        key.verify_strict(&record.checkpoint_hash, &signature)
            .map_err(|_| WitnessError::SignatureFailed { index })?;
    }
    Ok(())
}

/// Verify complete key-hierarchy evidence: certificate, signature list,
/// and master-key consistency when an identity is present.
pub fn verify_key_hierarchy(evidence: &KeyEvidence) -> WitnessResult<()> {
    verify_session_certificate(&evidence.session_certificate)?;
    verify_checkpoint_signatures(&evidence.signatures)?;
    if let Some(identity) = &evidence.master_identity {
        if identity.public_key != evidence.session_certificate.master_pubkey {
            return Err(WitnessError::InvalidCert {
                reason: "master identity does not match certificate master key".to_string(),
            });
        }
    }
    Ok(())
}
