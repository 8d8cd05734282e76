use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::chain::checkpoint::Chain;
use crate::chain::signer::ChainSigner;
use crate::core::errors::{WitnessError, WitnessResult};
use crate::core::types::PACKET_VERSION;
use crate::evidence::anchor::AnchorProof;
use crate::keys::session::KeyEvidence;

/// The export envelope: everything an independent party needs to verify
/// authorship evidence for one document.
///
/// All key-hierarchy material lives in its nested canonical place; no
/// fields are duplicated at the top level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidencePacket {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub chain: Chain,
    pub key_evidence: KeyEvidence,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anchors: Vec<AnchorProof>,
}

impl EvidencePacket {
    /// Sum of the VDF-attested lower bounds across the chain.
    pub fn total_attested_time(&self) -> Duration {
        self.chain.total_elapsed_time()
    }

    /// Fingerprint of the exporting identity, when present.
    pub fn identity_fingerprint(&self) -> Option<&str> {
        self.key_evidence
            .master_identity
            .as_ref()
            .map(|identity| identity.fingerprint.as_str())
    }

    pub fn to_json(&self) -> WitnessResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(data: &str) -> WitnessResult<Self> {
        Ok(serde_json::from_str(data)?)
    }
}

/// Assembles an evidence packet from its parts.
pub struct PacketBuilder {
    chain: Chain,
    key_evidence: KeyEvidence,
    anchors: Vec<AnchorProof>,
}

impl PacketBuilder {
    pub fn new(chain: Chain, key_evidence: KeyEvidence) -> Self {
        Self {
            chain,
            key_evidence,
            anchors: Vec::new(),
        }
    }

    /// Capture the chain and key evidence from a live signer without
    /// ending its session.
    pub fn from_signer(signer: &ChainSigner) -> Self {
        Self::new(signer.chain().clone(), signer.session().key_evidence())
    }

    pub fn with_anchor(mut self, anchor: AnchorProof) -> Self {
        self.anchors.push(anchor);
        self
    }

    pub fn build(self) -> WitnessResult<EvidencePacket> {
        if self.key_evidence.signatures.len() > self.chain.checkpoints.len() {
            return Err(WitnessError::params(format!(
                "{} signatures exceed {} checkpoints",
                self.key_evidence.signatures.len(),
                self.chain.checkpoints.len()
            )));
        }

        let packet = EvidencePacket {
            version: PACKET_VERSION,
            exported_at: Utc::now(),
            chain: self.chain,
            key_evidence: self.key_evidence,
            anchors: self.anchors,
        };

        info!(
            "evidence packet built: {} checkpoints, {} signatures, {} anchors",
            packet.chain.checkpoints.len(),
            packet.key_evidence.signatures.len(),
            packet.anchors.len()
        );

        Ok(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::signer::ChainSigner;
    use crate::keys::puf::StaticPuf;
    use crate::vdf::hashchain::Parameters;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn test_params() -> Parameters {
        Parameters {
            iterations_per_second: 1000,
            min_iterations: 10,
            max_iterations: 100_000,
        }
    }

    pub(crate) fn build_test_packet() -> (TempDir, EvidencePacket) {
        let dir = TempDir::new().expect("tempdir");
        let doc = dir.path().join("doc.txt");
        fs::write(&doc, b"v1").expect("write");

        let puf = StaticPuf::new([17u8; 32], "packet-device");
        let mut signer =
            ChainSigner::open(&puf, &doc, dir.path().join(".witnessd"), test_params())
                .expect("open");
        signer
            .commit_signed_with_vdf_duration(Some("first".into()), Duration::from_millis(10))
            .expect("commit 0");
        fs::write(&doc, b"v2").expect("update");
        signer
            .commit_signed_with_vdf_duration(None, Duration::from_millis(10))
            .expect("commit 1");

        let packet = PacketBuilder::from_signer(&signer).build().expect("build");
        (dir, packet)
    }

    #[test]
    fn test_packet_contents() {
        let (_dir, packet) = build_test_packet();
        assert_eq!(packet.version, PACKET_VERSION);
        assert_eq!(packet.chain.checkpoints.len(), 2);
        assert_eq!(packet.key_evidence.signatures.len(), 2);
        assert!(packet.identity_fingerprint().is_some());
        assert!(packet.total_attested_time() > Duration::ZERO);
    }

    #[test]
    fn test_packet_json_roundtrip() {
        let (_dir, packet) = build_test_packet();
        let json = packet.to_json().expect("encode");
        let back = EvidencePacket::from_json(&json).expect("decode");

        assert_eq!(back.version, packet.version);
        assert_eq!(back.chain.checkpoints.len(), packet.chain.checkpoints.len());
        assert_eq!(
            back.chain.checkpoints[1].hash,
            packet.chain.checkpoints[1].hash
        );
        assert_eq!(back.key_evidence, packet.key_evidence);
        back.chain.verify().expect("decoded chain verifies");
    }

    #[test]
    fn test_builder_rejects_excess_signatures() {
        let (_dir, packet) = build_test_packet();
        let mut evidence = packet.key_evidence.clone();
        evidence.signatures.extend(evidence.signatures.clone());

        let mut chain = packet.chain.clone();
        chain.checkpoints.truncate(1);
        let err = PacketBuilder::new(chain, evidence).build().unwrap_err();
        assert!(matches!(err, WitnessError::Params { .. }));
    }
}
