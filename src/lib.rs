//! Cryptographic evidence of authorship over time.
//!
//! witnessd-core maintains a hash-linked checkpoint chain over a single
//! document, proves a lower bound on the real time elapsed between
//! checkpoints with a verifiable delay function, and signs every
//! checkpoint with a forward-secret ratchet key certified by a
//! device-bound master identity. The three compose into an evidence
//! packet that an independent party can verify offline.

// Core modules
pub mod chain;
pub mod core;
pub mod evidence;
pub mod keys;
pub mod vdf;

// Re-export commonly used types
pub use crate::core::errors::{WitnessError, WitnessResult};
pub use crate::core::logging::{init_logger, LoggerConfig};
pub use chain::checkpoint::{Chain, ChainSummary, Checkpoint};
pub use chain::signer::ChainSigner;
pub use evidence::anchor::{AnchorProof, AnchorProvider, AnchorRegistry, AnchorVerification};
pub use evidence::packet::{EvidencePacket, PacketBuilder};
pub use evidence::verifier::{
    verify_packet, CheckStatus, Finding, VerificationLevel, VerificationReport, VerifyOptions,
};
pub use keys::identity::{derive_master_identity, MasterIdentity};
pub use keys::migration::{migrate_from_legacy_key, verify_migration_record, MigrationRecord};
pub use keys::puf::{PufProvider, SoftwarePuf, StaticPuf};
pub use keys::recovery::{
    continue_session, export_recovery_state, restore_session, SessionRecoveryState,
};
pub use keys::session::{
    verify_checkpoint_signatures, verify_key_hierarchy, verify_session_certificate,
    CheckpointSignature, KeyEvidence, SessionCertificate, SessionManager,
};
pub use vdf::batch::{BatchResult, BatchVerifier};
pub use vdf::hashchain::{
    calibrate, chain_input, compute, compute_iterations, default_parameters, Parameters, VdfProof,
};
pub use vdf::pietrzak::{
    calibrate_squarings_per_second, is_recognized_modulus, PietrzakParams, PietrzakProof,
    PietrzakVdf,
};
pub use vdf::{Proof, Vdf};
