//! Checksummed base-N conversion framework.
//!
//! Byte strings are treated as big-endian integers and converted to and
//! from an alphabet of digits or words. Padding is either a literal
//! target length or `Pad::Seed`, which maps a seed's byte length to its
//! canonical presentation width (presentation length is not a clean
//! function of byte count, so the mapping is tabulated per format).

use num_bigint::BigUint;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::errors::{WalletError, WalletResult};
use crate::wordlist;

const B58_DIGITS: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
// RFC 4648 alphabet
const B32_DIGITS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";
const B16_DIGITS: &str = "0123456789abcdef";
const B10_DIGITS: &str = "0123456789";
const B8_DIGITS: &str = "01234567";
const B6D_DIGITS: &str = "123456";

/// Padding mode for a base conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pad {
    /// Minimum-length output (never empty).
    None,
    /// Pad (or require) this presentation length.
    Literal(usize),
    /// Canonical presentation width for the seed byte length.
    Seed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseId {
    B58,
    B32,
    B16,
    B10,
    B8,
    B6d,
    /// The bundled 1626-word legacy mnemonic list.
    LegacyMn,
}

impl BaseId {
    pub fn desc(&self) -> &'static str {
        match self {
            BaseId::B58 => "base58",
            BaseId::B32 => "base32",
            BaseId::B16 => "hexadecimal string",
            BaseId::B10 => "base10 string",
            BaseId::B8 => "base8 string",
            BaseId::B6d => "base6d (die roll)",
            BaseId::LegacyMn => "native mnemonic",
        }
    }
}

enum Alphabet {
    Chars(&'static str),
    Words(&'static [&'static str]),
}

impl Alphabet {
    fn len(&self) -> usize {
        match self {
            Alphabet::Chars(s) => s.len(),
            Alphabet::Words(w) => w.len(),
        }
    }

    fn index_of(&self, token: &str) -> Option<usize> {
        match self {
            Alphabet::Chars(s) => {
                let c = token.chars().next()?;
                if token.chars().count() != 1 {
                    return None;
                }
                s.find(c)
            }
            Alphabet::Words(w) => w.iter().position(|&x| x == token),
        }
    }

    fn token_at(&self, idx: usize) -> &'static str {
        match self {
            Alphabet::Chars(s) => &s[idx..idx + 1],
            Alphabet::Words(w) => w[idx],
        }
    }
}

/// One base-N codec instance.
#[derive(Debug, Clone, Copy)]
pub struct BaseConv {
    id: BaseId,
}

impl BaseConv {
    pub fn new(id: BaseId) -> Self {
        BaseConv { id }
    }

    pub fn id(&self) -> BaseId {
        self.id
    }

    fn alphabet(&self) -> Alphabet {
        match self.id {
            BaseId::B58 => Alphabet::Chars(B58_DIGITS),
            BaseId::B32 => Alphabet::Chars(B32_DIGITS),
            BaseId::B16 => Alphabet::Chars(B16_DIGITS),
            BaseId::B10 => Alphabet::Chars(B10_DIGITS),
            BaseId::B8 => Alphabet::Chars(B8_DIGITS),
            BaseId::B6d => Alphabet::Chars(B6D_DIGITS),
            BaseId::LegacyMn => Alphabet::Words(wordlist::legacy_words()),
        }
    }

    /// byte length -> canonical presentation width
    fn seedlen_map(&self) -> Option<&'static [(usize, usize)]> {
        match self.id {
            BaseId::B58 => Some(&[(16, 22), (24, 33), (32, 44)]),
            BaseId::B6d => Some(&[(16, 50), (24, 75), (32, 100)]),
            BaseId::LegacyMn => Some(&[(16, 12), (24, 18), (32, 24)]),
            _ => None,
        }
    }

    fn seed_pad_for_bytes(&self, byte_len: usize) -> WalletResult<usize> {
        let map = self.seedlen_map().ok_or_else(|| {
            WalletError::Pad(format!(
                "seed padding not supported for {}",
                self.id.desc()
            ))
        })?;
        map.iter()
            .find(|(b, _)| *b == byte_len)
            .map(|(_, w)| *w)
            .ok_or_else(|| {
                WalletError::SeedLength(format!(
                    "{byte_len}: invalid byte length for seed data in seed-padded conversion"
                ))
            })
    }

    fn seed_bytes_for_width(&self, width: usize) -> WalletResult<usize> {
        let map = self.seedlen_map().ok_or_else(|| {
            WalletError::Pad(format!(
                "seed padding not supported for {}",
                self.id.desc()
            ))
        })?;
        map.iter()
            .find(|(_, w)| *w == width)
            .map(|(b, _)| *b)
            .ok_or_else(|| {
                WalletError::BaseConversion(format!(
                    "{width}: invalid length for seed-padded {} data",
                    self.id.desc()
                ))
            })
    }

    /// Convert bytes to a token sequence.
    pub fn from_bytes(&self, bytes: &[u8], pad: Pad) -> WalletResult<Vec<&'static str>> {
        if bytes.is_empty() {
            return Err(WalletError::BaseConversion(
                "empty data not allowed in base conversion".to_string(),
            ));
        }
        let pad_val = match pad {
            Pad::None => 1,
            Pad::Literal(n) => n.max(1),
            Pad::Seed => self.seed_pad_for_bytes(bytes.len())?,
        };

        let wl = self.alphabet();
        let base = BigUint::from(wl.len());
        let mut num = BigUint::from_bytes_be(bytes);
        let zero = BigUint::from(0u32);

        let mut idxs: Vec<usize> = Vec::new();
        while num > zero {
            let rem = (&num % &base).to_u32_digits();
            idxs.push(rem.first().copied().unwrap_or(0) as usize);
            num = &num / &base;
        }
        while idxs.len() < pad_val {
            idxs.push(0);
        }
        idxs.reverse();
        Ok(idxs.into_iter().map(|i| wl.token_at(i)).collect())
    }

    /// Convert bytes to presentation text: words are space-joined,
    /// digit alphabets concatenate.
    pub fn from_bytes_to_string(&self, bytes: &[u8], pad: Pad) -> WalletResult<String> {
        let tokens = self.from_bytes(bytes, pad)?;
        let sep = match self.id {
            BaseId::LegacyMn => " ",
            _ => "",
        };
        Ok(tokens.join(sep))
    }

    /// Convert a token sequence back to bytes.
    pub fn to_bytes(&self, tokens: &[&str], pad: Pad) -> WalletResult<Zeroizing<Vec<u8>>> {
        if tokens.is_empty() {
            return Err(WalletError::BaseConversion(format!(
                "empty {} data",
                self.id.desc()
            )));
        }
        let pad_val = match pad {
            Pad::None => 1,
            Pad::Literal(n) => n.max(1),
            Pad::Seed => self.seed_bytes_for_width(tokens.len())?,
        };

        let wl = self.alphabet();
        let base = BigUint::from(wl.len());
        let mut num = BigUint::from(0u32);
        for (n, token) in tokens.iter().enumerate() {
            let idx = wl.index_of(token).ok_or_else(|| {
                WalletError::BaseConversion(format!(
                    "token #{} ({token:?}) not in {} format",
                    n + 1,
                    self.id.desc()
                ))
            })?;
            num = num * &base + BigUint::from(idx);
        }

        let min_bytes = num.to_bytes_be();
        let min_len = if num == BigUint::from(0u32) {
            1
        } else {
            min_bytes.len()
        };
        let out_len = pad_val.max(min_len);
        let mut out = Zeroizing::new(vec![0u8; out_len]);
        out[out_len - min_bytes.len()..].copy_from_slice(&min_bytes);
        Ok(out)
    }

    /// Convert a presentation string back to bytes.
    pub fn to_bytes_from_string(&self, s: &str, pad: Pad) -> WalletResult<Zeroizing<Vec<u8>>> {
        let tokens: Vec<String> = match self.id {
            BaseId::LegacyMn => s.split_whitespace().map(str::to_string).collect(),
            _ => s
                .chars()
                .filter(|c| !c.is_whitespace())
                .map(String::from)
                .collect(),
        };
        let refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
        self.to_bytes(&refs, pad)
    }

    /// True when every token of `s` belongs to this alphabet.
    pub fn is_valid_str(&self, s: &str) -> bool {
        let wl = self.alphabet();
        match self.id {
            BaseId::LegacyMn => s.split_whitespace().all(|w| wl.index_of(w).is_some()),
            _ => s
                .chars()
                .filter(|c| !c.is_whitespace())
                .all(|c| wl.index_of(&c.to_string()).is_some()),
        }
    }

    /// Self-check value over the alphabet's own content.
    pub fn wordlist_chksum(&self) -> String {
        let joined = match self.alphabet() {
            Alphabet::Chars(s) => s
                .chars()
                .map(String::from)
                .collect::<Vec<_>>()
                .join(" "),
            Alphabet::Words(w) => w.join(" "),
        };
        let digest = Sha256::digest(joined.as_bytes());
        hex::encode(&digest[..4])
    }

    /// Verify the bundled word list against its stored checksum.
    pub fn check_wordlist(&self) -> WalletResult<()> {
        if self.id != BaseId::LegacyMn {
            return Ok(());
        }
        let computed = self.wordlist_chksum();
        if computed != wordlist::LEGACY_WL_CHKSUM {
            return Err(WalletError::Checksum {
                field: "word list".to_string(),
                computed,
                expected: wordlist::LEGACY_WL_CHKSUM.to_string(),
            });
        }
        Ok(())
    }
}
