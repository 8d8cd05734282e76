use log::info;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::core::encoding::b64_opt_hash;
use crate::core::errors::{WitnessError, WitnessResult};
use crate::core::types::*;
use crate::core::utils::sha256;
use crate::keys::hkdf_derive;
use crate::keys::identity::derive_master_identity;
use crate::keys::puf::PufProvider;
use crate::keys::session::{
    verify_session_certificate, CheckpointSignature, SessionCertificate, SessionManager,
};

/// Exportable session state whose ratchet secret is sealed to this
/// device's PUF.
///
/// The seal is a one-time pad under a PUF-derived key, so the state is
/// useless off-device. Restoring resumes signing exactly where the
/// session left off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecoveryState {
    pub certificate: SessionCertificate,
    pub signatures: Vec<CheckpointSignature>,
    /// Absent when the session ended without exporting its ratchet;
    /// only continuation is possible then
    #[serde(default, with = "b64_opt_hash", skip_serializing_if = "Option::is_none")]
    pub sealed_ratchet: Option<[u8; 32]>,
    /// Next ordinal the restored ratchet will sign
    pub next_ordinal: u64,
}

fn recovery_key(puf: &dyn PufProvider) -> WitnessResult<Zeroizing<[u8; 32]>> {
    let challenge = sha256(RATCHET_RECOVERY_TAG);
    let response = Zeroizing::new(puf.get_response(&challenge)?);
    hkdf_derive(
        response.as_ref(),
        RATCHET_RECOVERY_TAG,
        RATCHET_RECOVERY_INFO,
    )
}

/// Seal the live ratchet of a session for later same-device restore.
pub fn export_recovery_state(
    puf: &dyn PufProvider,
    manager: &SessionManager,
) -> WitnessResult<SessionRecoveryState> {
    if manager.is_ended() {
        return Err(WitnessError::RatchetWiped);
    }

    let key = recovery_key(puf)?;
    let secret = manager.ratchet_secret();
    let mut sealed = [0u8; 32];
    for i in 0..32 {
        sealed[i] = secret[i] ^ key[i];
    }

    Ok(SessionRecoveryState {
        certificate: manager.certificate().clone(),
        signatures: manager.signatures().to_vec(),
        sealed_ratchet: Some(sealed),
        next_ordinal: manager.next_ordinal(),
    })
}

/// Restore a sealed session on the device that exported it.
pub fn restore_session(
    puf: &dyn PufProvider,
    state: &SessionRecoveryState,
) -> WitnessResult<SessionManager> {
    let sealed = state.sealed_ratchet.ok_or(WitnessError::NoRecoveryData)?;
    verify_session_certificate(&state.certificate)?;

    let identity = derive_master_identity(puf)?;
    if identity.public_key != state.certificate.master_pubkey {
        return Err(WitnessError::SessionRecoveryFailed {
            reason: "recovery state was sealed by a different device identity".to_string(),
        });
    }
    if state.next_ordinal != state.signatures.len() as u64 {
        return Err(WitnessError::SessionRecoveryFailed {
            reason: format!(
                "ordinal {} inconsistent with {} recorded signatures",
                state.next_ordinal,
                state.signatures.len()
            ),
        });
    }

    let key = recovery_key(puf)?;
    let mut secret = Zeroizing::new([0u8; 32]);
    for i in 0..32 {
        secret[i] = sealed[i] ^ key[i];
    }

    info!(
        "restored session {} at ordinal {}",
        hex::encode(&state.certificate.session_id[..8]),
        state.next_ordinal
    );

    Ok(SessionManager::from_parts(
        identity,
        state.certificate.clone(),
        secret,
        state.next_ordinal,
        state.signatures.clone(),
    ))
}

/// Continue a session without sealed state.
///
/// Builds a fresh PUF-bound ratchet over the last checkpoint hash and
/// resumes at `last_ordinal + 1`. The ability to sign at any earlier
/// ordinal is gone for good; that is the forward-secrecy contract, not a
/// limitation of this path.
pub fn continue_session(
    puf: &dyn PufProvider,
    certificate: SessionCertificate,
    signatures: Vec<CheckpointSignature>,
    last_checkpoint_hash: [u8; 32],
    last_ordinal: u64,
) -> WitnessResult<SessionManager> {
    verify_session_certificate(&certificate)?;

    let identity = derive_master_identity(puf)?;
    if identity.public_key != certificate.master_pubkey {
        return Err(WitnessError::SessionRecoveryFailed {
            reason: "certificate belongs to a different device identity".to_string(),
        });
    }

    let challenge = sha256(RATCHET_CONTINUATION_TAG);
    let response = Zeroizing::new(puf.get_response(&challenge)?);
    let mut ikm = Zeroizing::new(Vec::with_capacity(32 + 32 + SESSION_ID_SIZE));
    ikm.extend_from_slice(response.as_ref());
    ikm.extend_from_slice(&last_checkpoint_hash);
    ikm.extend_from_slice(&certificate.session_id);
    let secret = hkdf_derive(&ikm, RATCHET_INIT_SALT, RATCHET_CONTINUATION_INFO)?;

    info!(
        "continuing session {} at ordinal {}",
        hex::encode(&certificate.session_id[..8]),
        last_ordinal + 1
    );

    Ok(SessionManager::from_parts(
        identity,
        certificate,
        secret,
        last_ordinal + 1,
        signatures,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::utils::sha256;
    use crate::keys::puf::StaticPuf;
    use crate::keys::session::verify_checkpoint_signatures;

    fn test_puf() -> StaticPuf {
        StaticPuf::new([21u8; 32], "recovery-device")
    }

    #[test]
    fn test_export_restore_roundtrip() {
        let puf = test_puf();
        let mut manager = SessionManager::start(&puf, sha256(b"doc")).expect("start");
        let before = manager.sign_checkpoint(sha256(b"cp0")).expect("sign");

        let state = export_recovery_state(&puf, &manager).expect("export");
        manager.end_session();

        let mut restored = restore_session(&puf, &state).expect("restore");
        assert_eq!(restored.next_ordinal(), 1);

        // The restored ratchet continues the same key schedule the
        // original would have produced.
        let after = restored.sign_checkpoint(sha256(b"cp1")).expect("sign");
        assert_eq!(after.ordinal, 1);
        assert_ne!(after.public_key, before.public_key);
        verify_checkpoint_signatures(restored.signatures()).expect("signatures");
    }

    #[test]
    fn test_restore_requires_same_device() {
        let puf = test_puf();
        let manager = SessionManager::start(&puf, sha256(b"doc")).expect("start");
        let state = export_recovery_state(&puf, &manager).expect("export");

        let other = StaticPuf::new([99u8; 32], "other-device");
        let err = restore_session(&other, &state).unwrap_err();
        assert!(matches!(err, WitnessError::SessionRecoveryFailed { .. }));
    }

    #[test]
    fn test_export_after_end_fails() {
        let puf = test_puf();
        let mut manager = SessionManager::start(&puf, sha256(b"doc")).expect("start");
        manager.end_session();
        let err = export_recovery_state(&puf, &manager).unwrap_err();
        assert!(matches!(err, WitnessError::RatchetWiped));
    }

    #[test]
    fn test_restore_rejects_inconsistent_ordinal() {
        let puf = test_puf();
        let mut manager = SessionManager::start(&puf, sha256(b"doc")).expect("start");
        manager.sign_checkpoint(sha256(b"cp0")).expect("sign");
        let mut state = export_recovery_state(&puf, &manager).expect("export");
        state.next_ordinal = 7;
        let err = restore_session(&puf, &state).unwrap_err();
        assert!(matches!(err, WitnessError::SessionRecoveryFailed { .. }));
    }

    #[test]
    fn test_continuation_resumes_past_last_ordinal() {
        let puf = test_puf();
        let mut manager = SessionManager::start(&puf, sha256(b"doc")).expect("start");
        let last = manager.sign_checkpoint(sha256(b"cp0")).expect("sign");
        let certificate = manager.certificate().clone();
        let signatures = manager.signatures().to_vec();
        manager.end_session();

        let mut continued = continue_session(
            &puf,
            certificate,
            signatures,
            last.checkpoint_hash,
            last.ordinal,
        )
        .expect("continue");
        assert_eq!(continued.next_ordinal(), 1);

        let next = continued.sign_checkpoint(sha256(b"cp1")).expect("sign");
        assert_eq!(next.ordinal, 1);
        assert_ne!(next.public_key, last.public_key);
    }

    #[test]
    fn test_continuation_requires_same_device() {
        let puf = test_puf();
        let mut manager = SessionManager::start(&puf, sha256(b"doc")).expect("start");
        let last = manager.sign_checkpoint(sha256(b"cp0")).expect("sign");
        let certificate = manager.certificate().clone();

        let other = StaticPuf::new([3u8; 32], "other");
        let err = continue_session(&other, certificate, Vec::new(), last.checkpoint_hash, 0)
            .unwrap_err();
        assert!(matches!(err, WitnessError::SessionRecoveryFailed { .. }));
    }

    #[test]
    fn test_restore_without_sealed_state_is_no_recovery_data() {
        let puf = test_puf();
        let mut manager = SessionManager::start(&puf, sha256(b"doc")).expect("start");
        manager.sign_checkpoint(sha256(b"cp0")).expect("sign");
        let mut state = export_recovery_state(&puf, &manager).expect("export");
        state.sealed_ratchet = None;

        let err = restore_session(&puf, &state).unwrap_err();
        assert!(matches!(err, WitnessError::NoRecoveryData));
    }

    #[test]
    fn test_recovery_state_serde_roundtrip() {
        let puf = test_puf();
        let mut manager = SessionManager::start(&puf, sha256(b"doc")).expect("start");
        manager.sign_checkpoint(sha256(b"cp0")).expect("sign");
        let state = export_recovery_state(&puf, &manager).expect("export");

        let json = serde_json::to_string(&state).expect("encode");
        let back: SessionRecoveryState = serde_json::from_str(&json).expect("decode");
        assert_eq!(back, state);
    }
}
