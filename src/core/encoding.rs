//! Serde helpers for byte fields in JSON documents.
//!
//! Raw byte fields are standard base64 strings on the wire; identifiers
//! (`document_id`, fingerprints) are hex and handled as plain strings.
//! Decoders validate lengths so malformed packets fail at parse time.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serializer};

fn decode_fixed<'de, D: Deserializer<'de>, const N: usize>(
    deserializer: D,
    what: &'static str,
) -> Result<[u8; N], D::Error> {
    let s = String::deserialize(deserializer)?;
    let bytes = BASE64.decode(&s).map_err(serde::de::Error::custom)?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        serde::de::Error::custom(format!("{what} must be {N} bytes, got {}", b.len()))
    })
}

/// 32-byte field (hashes, public keys, session ids) as base64
pub mod b64_hash {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        decode_fixed::<D, 32>(deserializer, "hash")
    }
}

/// 64-byte Ed25519 signature as base64
pub mod b64_sig {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8; 64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 64], D::Error> {
        decode_fixed::<D, 64>(deserializer, "signature")
    }
}

/// Optional 32-byte field as base64
pub mod b64_opt_hash {
    use super::*;

    pub fn serialize<S: Serializer>(
        bytes: &Option<[u8; 32]>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => serializer.serialize_some(&BASE64.encode(b)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<[u8; 32]>, D::Error> {
        let opt = Option::<String>::deserialize(deserializer)?;
        match opt {
            None => Ok(None),
            Some(s) => {
                let bytes = BASE64.decode(&s).map_err(serde::de::Error::custom)?;
                let arr: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
                    serde::de::Error::custom(format!("hash must be 32 bytes, got {}", b.len()))
                })?;
                Ok(Some(arr))
            }
        }
    }
}

/// Optional 64-byte signature as base64
pub mod b64_opt_sig {
    use super::*;

    pub fn serialize<S: Serializer>(
        bytes: &Option<[u8; 64]>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => serializer.serialize_some(&BASE64.encode(b)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<[u8; 64]>, D::Error> {
        let opt = Option::<String>::deserialize(deserializer)?;
        match opt {
            None => Ok(None),
            Some(s) => {
                let bytes = BASE64.decode(&s).map_err(serde::de::Error::custom)?;
                let arr: [u8; 64] = bytes.try_into().map_err(|b: Vec<u8>| {
                    serde::de::Error::custom(format!("signature must be 64 bytes, got {}", b.len()))
                })?;
                Ok(Some(arr))
            }
        }
    }
}

/// Variable-length byte field as base64
pub mod b64_vec {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        BASE64.decode(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Sample {
        #[serde(with = "b64_hash")]
        hash: [u8; 32],
        #[serde(with = "b64_opt_sig")]
        signature: Option<[u8; 64]>,
        #[serde(with = "b64_vec")]
        payload: Vec<u8>,
    }

    #[test]
    fn test_roundtrip() {
        let sample = Sample {
            hash: [7u8; 32],
            signature: Some([9u8; 64]),
            payload: vec![1, 2, 3],
        };
        let json = serde_json::to_string(&sample).expect("encode");
        let back: Sample = serde_json::from_str(&json).expect("decode");
        assert_eq!(back.hash, sample.hash);
        assert_eq!(back.signature, sample.signature);
        assert_eq!(back.payload, sample.payload);
    }

    #[test]
    fn test_rejects_wrong_length() {
        // 16 bytes of base64 where 32 are required
        let json = format!(
            r#"{{"hash":"{}","signature":null,"payload":""}}"#,
            BASE64.encode([0u8; 16])
        );
        assert!(serde_json::from_str::<Sample>(&json).is_err());
    }

    #[test]
    fn test_none_signature_roundtrip() {
        let sample = Sample {
            hash: [0u8; 32],
            signature: None,
            payload: Vec::new(),
        };
        let json = serde_json::to_string(&sample).expect("encode");
        let back: Sample = serde_json::from_str(&json).expect("decode");
        assert!(back.signature.is_none());
    }
}
