use log::debug;
use std::path::Path;
use std::time::Duration;

use crate::chain::checkpoint::{Chain, Checkpoint};
use crate::core::errors::WitnessResult;
use crate::keys::puf::PufProvider;
use crate::keys::session::SessionManager;
use crate::vdf::hashchain::Parameters;

/// Pairs one chain with one session so every commit is signed by the
/// session's current ratchet key.
///
/// Strict composition: the signer owns both halves and there are no
/// back-references. The ratchet's lifetime is bounded by this pairing.
pub struct ChainSigner {
    chain: Chain,
    session: SessionManager,
}

impl ChainSigner {
    pub fn new(chain: Chain, session: SessionManager) -> Self {
        Self { chain, session }
    }

    /// Start a session against a document and open (or create) its
    /// chain under the state directory.
    ///
    /// The session certificate binds to the document's content at
    /// session start via the chain's latest content hash, or the zero
    /// hash for a brand-new document.
    pub fn open(
        puf: &dyn PufProvider,
        document_path: impl AsRef<Path>,
        state_dir: impl AsRef<Path>,
        vdf_params: Parameters,
    ) -> WitnessResult<Self> {
        let chain = Chain::get_or_create(document_path, state_dir, vdf_params)?;
        let document_hash = chain
            .latest()
            .map(|cp| cp.content_hash)
            .unwrap_or([0u8; 32]);
        let session = SessionManager::start(puf, document_hash)?;
        Ok(Self { chain, session })
    }

    /// Commit and sign in one step.
    ///
    /// The binding hash is fixed first, then signed; the signature is
    /// stored on the checkpoint and recorded in the session's ordered
    /// signature list.
    pub fn commit_signed(&mut self, message: Option<String>) -> WitnessResult<Checkpoint> {
        let checkpoint = self.chain.commit(message)?;
        self.attach_signature(checkpoint)
    }

    /// Commit and sign with an explicit VDF target duration.
    pub fn commit_signed_with_vdf_duration(
        &mut self,
        message: Option<String>,
        vdf_duration: Duration,
    ) -> WitnessResult<Checkpoint> {
        let checkpoint = self.chain.commit_with_vdf_duration(message, vdf_duration)?;
        self.attach_signature(checkpoint)
    }

    fn attach_signature(&mut self, checkpoint: Checkpoint) -> WitnessResult<Checkpoint> {
        let record = self.session.sign_checkpoint(checkpoint.hash)?;
        let stored = self
            .chain
            .checkpoints
            .last_mut()
            .expect("checkpoint just appended");
        stored.signature = Some(record.signature);

        debug!(
            "checkpoint {} signed at session ordinal {}",
            checkpoint.ordinal, record.ordinal
        );

        Ok(stored.clone())
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// End the session and return both halves for packet assembly.
    pub fn finish(mut self) -> (Chain, SessionManager) {
        self.session.end_session();
        (self.chain, self.session)
    }
}
