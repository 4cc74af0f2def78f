//! Bundled word lists.

use once_cell::sync::Lazy;

/// The legacy 1626-word list used by the native mnemonic format and the
/// Monero-style triplet format.
static LEGACY: Lazy<Vec<&'static str>> =
    Lazy::new(|| include_str!("legacy.txt").split_whitespace().collect());

/// Stored self-check value of the legacy list: 8 hex digits of SHA-256
/// over the space-joined words.
pub const LEGACY_WL_CHKSUM: &str = "5ca31424";

pub fn legacy_words() -> &'static [&'static str] {
    &LEGACY
}
