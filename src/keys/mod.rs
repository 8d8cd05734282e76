pub mod identity;
pub mod migration;
pub mod puf;
pub mod recovery;
pub mod session;

pub use identity::*;
pub use migration::*;
pub use puf::*;
pub use recovery::*;
pub use session::*;

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::core::errors::{WitnessError, WitnessResult};

/// HKDF-SHA256 into a fresh zeroize-on-drop 32-byte buffer.
///
/// Every secret derivation in the hierarchy goes through here so the
/// output is always subject to the same wiping discipline as its input.
pub(crate) fn hkdf_derive(
    ikm: &[u8],
    salt: &[u8],
    info: &[u8],
) -> WitnessResult<Zeroizing<[u8; 32]>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = Zeroizing::new([0u8; 32]);
    hk.expand(info, okm.as_mut())
        .map_err(|e| WitnessError::KeyDerivation {
            reason: format!("HKDF expand failed: {e}"),
        })?;
    Ok(okm)
}
