use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::feature::FeatureId;

/// Pod annotation holding the digest of a feature's custom configuration.
pub fn annotation_key(feature: FeatureId) -> String {
    format!("checksum/{}-custom-config", feature.as_str())
}

/// Hex SHA-256 of the JSON form of `value`.
pub fn digest<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let bytes = serde_json::to_vec(value)?;
    Ok(digest_bytes(&bytes))
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
