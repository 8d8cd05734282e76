// Protocol Constants
//
// Domain separation tags are part of the wire contract. Any divergence
// breaks interoperability with existing evidence packets.

/// Checkpoint binding hash tag
pub const CHECKPOINT_TAG: &[u8] = b"witnessd-checkpoint-v1";
/// VDF chain-input derivation tag
pub const VDF_CHAIN_INPUT_TAG: &[u8] = b"witnessd-vdf-v1";
/// Master identity HKDF salt
pub const IDENTITY_SALT: &[u8] = b"witnessd-identity-v1";
/// Master identity PUF challenge preimage
pub const IDENTITY_CHALLENGE_TAG: &[u8] = b"witnessd-identity-v1-challenge";
/// Master identity HKDF info
pub const IDENTITY_INFO: &[u8] = b"master-seed";
/// Session seed HKDF salt
pub const SESSION_SALT: &[u8] = b"witnessd-session-v1";
/// Ratchet initialization HKDF salt
pub const RATCHET_INIT_SALT: &[u8] = b"witnessd-ratchet-init-v1";
/// Ratchet advance HKDF salt
pub const RATCHET_ADVANCE_SALT: &[u8] = b"witnessd-ratchet-advance-v1";
/// Per-checkpoint signing key HKDF salt
pub const SIGNING_KEY_SALT: &[u8] = b"witnessd-signing-key-v1";
/// Legacy key migration signing payload tag
pub const KEY_MIGRATION_TAG: &[u8] = b"witnessd-key-migration-v1";
/// Ratchet recovery PUF challenge preimage and HKDF salt
pub const RATCHET_RECOVERY_TAG: &[u8] = b"witnessd-ratchet-recovery-v1";
/// Ratchet recovery HKDF info
pub const RATCHET_RECOVERY_INFO: &[u8] = b"ratchet-recovery-key";
/// Session continuation PUF challenge preimage
pub const RATCHET_CONTINUATION_TAG: &[u8] = b"witnessd-ratchet-continuation-v1";
/// Session continuation HKDF info
pub const RATCHET_CONTINUATION_INFO: &[u8] = b"continuation";
/// Software PUF response derivation tag
pub const SOFTWARE_PUF_TAG: &[u8] = b"witnessd-software-puf-v1";
/// VDF calibration input preimage
pub const CALIBRATION_INPUT_TAG: &[u8] = b"witnessd-calibration-input-v1";

// Field Sizes

/// SHA-256 output size
pub const HASH_SIZE: usize = 32;
/// Ed25519 public key size
pub const PUBLIC_KEY_SIZE: usize = 32;
/// Ed25519 signature size
pub const SIGNATURE_SIZE: usize = 64;
/// Session identifier size
pub const SESSION_ID_SIZE: usize = 32;
/// Fixed wire size of an encoded hash-chain VDF proof
pub const VDF_PROOF_WIRE_SIZE: usize = 80;

// Format Versions

/// Current evidence packet schema version
pub const PACKET_VERSION: u32 = 1;
/// Current master identity record version
pub const MASTER_IDENTITY_VERSION: u32 = 1;

// VDF Calibration Parameters

/// Minimum calibration sampling duration in milliseconds
pub const MIN_CALIBRATION_MS: u64 = 100;
/// `min_iterations` is the calibrated rate divided by this
pub const MIN_ITERATIONS_DIVISOR: u64 = 10;
/// `max_iterations` is the calibrated rate times this window (one hour)
pub const MAX_ITERATIONS_WINDOW_SECS: u64 = 3600;
/// Pietrzak statistical security parameter
pub const PIETRZAK_LAMBDA: u32 = 128;

// Filesystem Modes

/// Mode for state directories (chains, PUF seed)
pub const STATE_DIR_MODE: u32 = 0o700;
/// Mode for state files (chain JSON, PUF seed)
pub const STATE_FILE_MODE: u32 = 0o600;
