//! Logical-id derivation for construct paths

use md5::{Digest, Md5};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::SynthError;

static CONSTRUCT_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_{}\-.]+$").expect("valid regex"));

/// Validate a stack-relative construct id component.
///
/// Path-parameter components such as `{taskId}` are allowed; the braces
/// are stripped when the id is folded into a logical id.
pub fn validate_id(id: &str) -> Result<(), SynthError> {
    if id.is_empty() || !CONSTRUCT_ID.is_match(id) {
        return Err(SynthError::InvalidConstructId(id.to_string()));
    }
    Ok(())
}

/// Derive the CloudFormation logical id for a construct path.
///
/// The id is the concatenation of the alphanumeric characters of every
/// path component, suffixed with the first eight uppercase hex chars of
/// the MD5 of the `/`-joined path. The suffix keeps ids unique when
/// distinct paths collapse to the same readable prefix.
pub fn logical_id(path: &[&str]) -> String {
    let readable: String = path
        .iter()
        .flat_map(|c| c.chars())
        .filter(char::is_ascii_alphanumeric)
        .collect();

    let mut hasher = Md5::new();
    hasher.update(path.join("/").as_bytes());
    let digest = hasher.finalize();
    let suffix = hex::encode(&digest[..4]).to_uppercase();

    format!("{readable}{suffix}")
}
