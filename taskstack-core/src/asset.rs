//! Code asset staging
//!
//! Local code directories are referenced from the template as objects in
//! a deployment bucket supplied at deploy time through the
//! `AssetsBucket` parameter. Synthesis never reads the asset contents;
//! the fingerprint is derived from the normalized source path so the
//! pass stays pure and deterministic.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::expr::Expr;

/// Template parameter naming the bucket assets are uploaded to
pub const ASSETS_BUCKET_PARAM: &str = "AssetsBucket";

/// A local code directory staged into the template
#[derive(Debug, Clone, Serialize)]
pub struct Asset {
    /// Source path, as declared
    pub path: PathBuf,
    /// First 32 hex chars of SHA-256 over the normalized path
    pub fingerprint: String,
    /// Object key the uploader must publish the zipped asset under
    pub key: String,
}

impl Asset {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let normalized = path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        let digest = hasher.finalize();
        let fingerprint = hex::encode(&digest[..16]);
        let key = format!("assets/{fingerprint}.zip");

        Self {
            path,
            fingerprint,
            key,
        }
    }
}

/// Where a staged asset lives from the template's point of view
#[derive(Debug, Clone)]
pub struct AssetLocation {
    pub bucket: Expr,
    pub key: String,
}

impl AssetLocation {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            bucket: Expr::Ref(ASSETS_BUCKET_PARAM.to_string()),
            key: key.into(),
        }
    }
}
