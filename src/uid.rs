//! Deterministic short identifiers derived from timestamp-bearing names
//!
//! Experiment folders are named with an embedded timestamp
//! (e.g. `2024-03-15_run-14-30`). The UID combines a truncated 64-bit hash of
//! the full name with the extracted timestamp, giving uploaded files a prefix
//! that is unique per experiment, sortable, and reproducible.

use blake2::digest::consts::U8;
use blake2::{Blake2b, Digest};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::UID_SHORT_LEN;
use crate::error::{Result, SubmitError};

/// Crockford base-32 alphabet: no I, L, O or U, so codes stay unambiguous
/// when read back from a bucket listing.
const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

type Blake2b64 = Blake2b<U8>;

/// Year, month, day separated by `-`, `_` or `/`; any non-digit run; then
/// hour, minute and optional second separated by `-`, `_` or `:`.
static TIMESTAMP_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4})[-_/](\d{2})[-_/](\d{2})\D+(\d{2})[-_:](\d{2})(?:[-_:](\d{2}))?")
        .expect("timestamp pattern is valid")
});

/// Extract the timestamp embedded in `name` as `YYYYMMDDTHHMMSS`.
/// Missing seconds default to `00`.
pub fn extract_timestamp(name: &str) -> Option<String> {
    let caps = TIMESTAMP_RX.captures(name)?;
    let second = caps.get(6).map_or("00", |m| m.as_str());
    Some(format!(
        "{}{}{}T{}{}{}",
        &caps[1], &caps[2], &caps[3], &caps[4], &caps[5], second
    ))
}

/// Encode an integer in base 32, most significant digit first.
/// Leading zero digits are dropped, matching big-integer encoding.
fn to_base32(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(ALPHABET[(n & 31) as usize]);
        n >>= 5;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

/// Hash the full name down to a short base-32 code.
fn short_hash(name: &str, length: usize) -> String {
    let mut hasher = Blake2b64::new();
    hasher.update(name.as_bytes());
    let digest: [u8; 8] = hasher.finalize().into();
    let mut code = to_base32(u64::from_be_bytes(digest));
    code.truncate(length);
    code
}

/// Derive the compact UID `"{short_code}-{YYYYMMDDTHHMMSS}"` for a name.
pub fn derive_uid(name: &str) -> Result<String> {
    derive_uid_with_len(name, UID_SHORT_LEN)
}

/// Same as [`derive_uid`] with an explicit short-code length.
pub fn derive_uid_with_len(name: &str, length: usize) -> Result<String> {
    let ts = extract_timestamp(name)
        .ok_or_else(|| SubmitError::MalformedTimestamp(name.to_string()))?;
    Ok(format!("{}-{}", short_hash(name, length), ts))
}

/// Check that `uid` is the UID derived from `name`. Any parse failure yields
/// `false`, never an error.
pub fn verify(name: &str, uid: &str) -> bool {
    match derive_uid(name) {
        Ok(expected) => expected == uid,
        Err(_) => false,
    }
}
