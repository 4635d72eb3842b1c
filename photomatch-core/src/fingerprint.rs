//! Fixed-width binary fingerprints and Hamming distance.
//!
//! Fingerprints are perceptual hashes computed upstream. This module treats
//! them as opaque N-bit values (N >= 64) and only answers one question: how
//! many bits differ between two of them.
//!
//! # Usage
//!
//! ```
//! use photomatch_core::fingerprint::{hamming_distance, DistanceThreshold, Fingerprint};
//!
//! let a = Fingerprint::from_u64(0xDEAD_BEEF_CAFE_BABE);
//! let b = Fingerprint::from_u64(0xDEAD_BEEF_CAFE_BABF);
//! assert_eq!(hamming_distance(Some(&a), Some(&b)), Some(1));
//! assert!(DistanceThreshold::default().admits(Some(&a), Some(&b)));
//!
//! // A missing fingerprint can never be compared
//! assert_eq!(hamming_distance(Some(&a), None), None);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MatchError, Result};

/// Minimum fingerprint width in bytes (64 bits).
pub const MIN_FINGERPRINT_BYTES: usize = 8;

/// Default maximum Hamming distance considered a candidate match.
pub const DEFAULT_DISTANCE_THRESHOLD: u32 = 10;

/// An opaque fixed-width perceptual hash, stored big-endian.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Fingerprint {
    bytes: Vec<u8>,
}

impl Fingerprint {
    /// Build a 64-bit fingerprint.
    pub fn from_u64(value: u64) -> Self {
        Self {
            bytes: value.to_be_bytes().to_vec(),
        }
    }

    /// Build a 64-bit fingerprint from its signed storage form (PostgreSQL `BIGINT`).
    pub fn from_i64(value: i64) -> Self {
        Self::from_u64(value as u64)
    }

    /// Build a fingerprint of arbitrary width (at least 64 bits).
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < MIN_FINGERPRINT_BYTES {
            return Err(MatchError::InvalidFingerprint(format!(
                "fingerprint must be at least {} bits, got {}",
                MIN_FINGERPRINT_BYTES * 8,
                bytes.len() * 8
            )));
        }
        Ok(Self { bytes })
    }

    /// Parse a hexadecimal fingerprint.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| MatchError::InvalidFingerprint(format!("Invalid hex string: {}", e)))?;
        Self::from_bytes(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bit_width(&self) -> u32 {
        (self.bytes.len() * 8) as u32
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// The signed 64-bit storage form, if this is a 64-bit fingerprint.
    pub fn as_i64(&self) -> Option<i64> {
        let raw: [u8; 8] = self.bytes.as_slice().try_into().ok()?;
        Some(u64::from_be_bytes(raw) as i64)
    }

    /// Hamming distance to another fingerprint of the same width.
    pub fn distance(&self, other: &Self) -> Result<u32> {
        if self.bytes.len() != other.bytes.len() {
            return Err(MatchError::UndefinedDistance(format!(
                "width mismatch: {} vs {} bits",
                self.bit_width(),
                other.bit_width()
            )));
        }

        Ok(self
            .bytes
            .iter()
            .zip(other.bytes.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.to_hex()
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = MatchError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_hex(&value)
    }
}

/// Count differing bits between two optional fingerprints.
///
/// Returns `None` ("undefined") when either side is absent or the widths
/// differ. Callers must treat `None` as "cannot compare", never as a match.
pub fn hamming_distance(a: Option<&Fingerprint>, b: Option<&Fingerprint>) -> Option<u32> {
    a?.distance(b?).ok()
}

/// Free-function form of [`DistanceThreshold::admits`].
pub fn within_threshold(
    a: Option<&Fingerprint>,
    b: Option<&Fingerprint>,
    threshold: DistanceThreshold,
) -> bool {
    threshold.admits(a, b)
}

/// Maximum Hamming distance admitted as a candidate match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistanceThreshold(pub u32);

impl DistanceThreshold {
    pub fn new(max_distance: u32) -> Self {
        Self(max_distance)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// True iff the distance is defined and within the threshold.
    pub fn admits(self, a: Option<&Fingerprint>, b: Option<&Fingerprint>) -> bool {
        hamming_distance(a, b).is_some_and(|d| d <= self.0)
    }
}

impl Default for DistanceThreshold {
    fn default() -> Self {
        Self(DEFAULT_DISTANCE_THRESHOLD)
    }
}
