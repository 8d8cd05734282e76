use chrono::{DateTime, Utc};
use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::core::encoding::b64_hash;
use crate::core::errors::WitnessResult;
use crate::core::types::*;
use crate::core::utils::{fingerprint_hex, sha256};
use crate::keys::hkdf_derive;
use crate::keys::puf::PufProvider;

/// Device-bound master identity.
///
/// Only public material is ever persisted; the private key is re-derived
/// from the PUF on demand and wiped within the deriving call frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterIdentity {
    #[serde(with = "b64_hash")]
    pub public_key: [u8; 32],
    /// Hex of the first 8 bytes of SHA-256(public_key)
    pub fingerprint: String,
    /// Opaque label supplied by the PUF backend
    pub device_id: String,
    pub created_at: DateTime<Utc>,
    pub version: u32,
}

/// The fixed PUF challenge all identity derivation uses.
pub fn identity_challenge() -> [u8; 32] {
    sha256(IDENTITY_CHALLENGE_TAG)
}

/// Derive the master Ed25519 seed from the device PUF.
///
/// PUF response and seed both live in zeroize-on-drop buffers; neither
/// survives the caller's frame.
fn derive_master_seed(puf: &dyn PufProvider) -> WitnessResult<Zeroizing<[u8; 32]>> {
    let response = Zeroizing::new(puf.get_response(&identity_challenge())?);
    hkdf_derive(response.as_ref(), IDENTITY_SALT, IDENTITY_INFO)
}

/// Derive the public master identity for this device.
pub fn derive_master_identity(puf: &dyn PufProvider) -> WitnessResult<MasterIdentity> {
    let seed = derive_master_seed(puf)?;
    let signing_key = SigningKey::from_bytes(&seed);
    let public_key = signing_key.verifying_key().to_bytes();

    Ok(MasterIdentity {
        public_key,
        fingerprint: fingerprint_hex(&public_key),
        device_id: puf.device_id().to_string(),
        created_at: Utc::now(),
        version: MASTER_IDENTITY_VERSION,
    })
}

/// Re-derive the master signing key for single-frame use.
///
/// The returned key zeroizes itself on drop; callers must not let it
/// escape the frame that requested it.
pub(crate) fn ephemeral_master_key(puf: &dyn PufProvider) -> WitnessResult<SigningKey> {
    let seed = derive_master_seed(puf)?;
    Ok(SigningKey::from_bytes(&seed))
}
