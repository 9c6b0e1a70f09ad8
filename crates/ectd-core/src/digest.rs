//! # Checksum Engine
//!
//! Content digests for document bytes. The index manifest and the checksum
//! manifest both carry MD5 in lowercase hex; the gateway compares these
//! strings verbatim, so the rendering is fixed at 32 lowercase hex
//! characters with no algorithm prefix.
//!
//! MD5 is used for wire compatibility, not integrity against an adversary.

use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::error::EctdError;

/// Value of the `checksumType` attribute on every index leaf.
pub const CHECKSUM_TYPE: &str = "md5";

/// A 16-byte MD5 content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentDigest([u8; 16]);

impl ContentDigest {
    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Parse a 32-character hex string. Upper-case input is accepted and
    /// normalized; the rendered form is always lowercase.
    pub fn from_hex(s: &str) -> Result<Self, EctdError> {
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| EctdError::Validation(format!("invalid md5 digest {s:?}: {e}")))?;
        Ok(Self(bytes))
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ContentDigest {
    type Err = EctdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = EctdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<ContentDigest> for String {
    fn from(d: ContentDigest) -> Self {
        d.to_hex()
    }
}

/// Digest an in-memory byte slice.
pub fn digest(bytes: &[u8]) -> ContentDigest {
    let hash = Md5::digest(bytes);
    let mut out = [0u8; 16];
    out.copy_from_slice(&hash);
    ContentDigest(out)
}

/// Digest everything readable from `reader`.
pub fn digest_reader<R: Read>(mut reader: R) -> std::io::Result<ContentDigest> {
    let mut hasher = Md5::new();
    std::io::copy(&mut reader, &mut hasher)?;
    let mut out = [0u8; 16];
    out.copy_from_slice(&hasher.finalize());
    Ok(ContentDigest(out))
}

/// Digest a file without loading it into memory.
pub fn digest_file(path: &Path) -> std::io::Result<ContentDigest> {
    let file = std::fs::File::open(path)?;
    digest_reader(std::io::BufReader::new(file))
}
