//! Concrete mnemonic formats: thin bindings of a word list, a checksum
//! rule and a set of valid seed lengths.

use bip39::{Language, Mnemonic};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::baseconv::{BaseConv, BaseId, Pad};
use crate::errors::{WalletError, WalletResult};
use crate::wordlist;

/// Stored self-check value of the BIP39 English list.
pub const BIP39_WL_CHKSUM: &str = "f18b9a84";

/// Word-prefix length feeding the Monero-style rolling checksum.
const TRIPLET_PREFIX_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MnemonicFormat {
    /// Native 1626-word format; no embedded checksum.
    Legacy,
    /// BIP39: 11-bit word groups with truncated-hash checksum bits.
    Bip39,
    /// Monero-style: 4-byte groups as word triplets plus a checksum word,
    /// 256-bit seeds only.
    Monero,
}

impl MnemonicFormat {
    pub fn valid_bit_lens(&self) -> &'static [u32] {
        match self {
            MnemonicFormat::Legacy | MnemonicFormat::Bip39 => &[128, 192, 256],
            MnemonicFormat::Monero => &[256],
        }
    }

    pub fn has_chksum(&self) -> bool {
        !matches!(self, MnemonicFormat::Legacy)
    }

    /// Phrase length (including any checksum word) for a seed bit length.
    pub fn word_count_for(&self, bit_len: u32) -> WalletResult<usize> {
        if !self.valid_bit_lens().contains(&bit_len) {
            return Err(WalletError::SeedLength(format!(
                "{bit_len}: invalid seed bit length for {self:?} mnemonic"
            )));
        }
        Ok(match self {
            MnemonicFormat::Legacy | MnemonicFormat::Bip39 => (bit_len as usize / 32) * 3,
            MnemonicFormat::Monero => 25,
        })
    }

    pub fn bit_len_for_word_count(&self, nwords: usize) -> WalletResult<u32> {
        self.valid_bit_lens()
            .iter()
            .copied()
            .find(|&bits| self.word_count_for(bits).ok() == Some(nwords))
            .ok_or_else(|| {
                WalletError::Mnemonic(format!(
                    "{nwords}: invalid word count for {self:?} mnemonic"
                ))
            })
    }

    pub fn wordlist_chksum(&self) -> String {
        let joined = match self {
            MnemonicFormat::Bip39 => Language::English.words_by_prefix("").join(" "),
            _ => wordlist::legacy_words().join(" "),
        };
        let digest = Sha256::digest(joined.as_bytes());
        hex::encode(&digest[..4])
    }

    /// Verify the word list against its stored self-check value.
    pub fn check_wordlist(&self) -> WalletResult<()> {
        let expected = match self {
            MnemonicFormat::Bip39 => BIP39_WL_CHKSUM,
            _ => wordlist::LEGACY_WL_CHKSUM,
        };
        let computed = self.wordlist_chksum();
        if computed != expected {
            return Err(WalletError::Checksum {
                field: "word list".to_string(),
                computed,
                expected: expected.to_string(),
            });
        }
        Ok(())
    }

    pub fn encode(&self, seed_bytes: &[u8]) -> WalletResult<String> {
        let bit_len = seed_bytes.len() as u32 * 8;
        if !self.valid_bit_lens().contains(&bit_len) {
            return Err(WalletError::SeedLength(format!(
                "{}: invalid seed byte length for {self:?} mnemonic",
                seed_bytes.len()
            )));
        }
        match self {
            MnemonicFormat::Legacy => legacy_encode(seed_bytes),
            MnemonicFormat::Bip39 => bip39_encode(seed_bytes),
            MnemonicFormat::Monero => Ok(triplet_encode(seed_bytes)),
        }
    }

    pub fn decode(&self, phrase: &str) -> WalletResult<Zeroizing<Vec<u8>>> {
        match self {
            MnemonicFormat::Legacy => legacy_decode(phrase),
            MnemonicFormat::Bip39 => bip39_decode(phrase),
            MnemonicFormat::Monero => triplet_decode(phrase),
        }
    }
}

fn legacy_encode(seed_bytes: &[u8]) -> WalletResult<String> {
    let bc = BaseConv::new(BaseId::LegacyMn);
    let phrase = bc.from_bytes_to_string(seed_bytes, Pad::Seed)?;

    // freshly generated mnemonic must round-trip; anything else is a
    // broken codec
    let rev = bc.to_bytes_from_string(&phrase, Pad::Seed)?;
    assert!(
        rev.as_slice() == seed_bytes,
        "FATAL: seed recomputed from mnemonic does not match original seed"
    );
    Ok(phrase)
}

fn legacy_decode(phrase: &str) -> WalletResult<Zeroizing<Vec<u8>>> {
    let fmt = MnemonicFormat::Legacy;
    let words: Vec<&str> = phrase.split_whitespace().collect();
    let bit_len = fmt.bit_len_for_word_count(words.len()).map_err(|_| {
        WalletError::Mnemonic(format!(
            "invalid mnemonic ({} words); valid numbers of words: 12, 18, 24",
            words.len()
        ))
    })?;

    let wl = wordlist::legacy_words();
    for (n, w) in words.iter().enumerate() {
        if !wl.contains(w) {
            return Err(WalletError::Mnemonic(format!(
                "word #{} is not in the native word list",
                n + 1
            )));
        }
    }

    let bc = BaseConv::new(BaseId::LegacyMn);
    let seed = bc.to_bytes(&words, Pad::Seed)?;
    if seed.len() as u32 * 8 != bit_len {
        return Err(WalletError::Mnemonic(
            "invalid mnemonic (produces too large a number)".to_string(),
        ));
    }

    // internal consistency: decoded seed must re-encode to the same phrase
    let rev = bc.from_bytes_to_string(&seed, Pad::Seed)?;
    assert!(
        rev == words.join(" "),
        "FATAL: mnemonic recomputed from seed does not match original"
    );
    Ok(seed)
}

fn bip39_encode(seed_bytes: &[u8]) -> WalletResult<String> {
    let mnemonic = Mnemonic::from_entropy(seed_bytes)
        .map_err(|e| WalletError::Mnemonic(format!("BIP39 encoding failed: {e}")))?;
    Ok(mnemonic.to_string())
}

fn bip39_decode(phrase: &str) -> WalletResult<Zeroizing<Vec<u8>>> {
    let fmt = MnemonicFormat::Bip39;
    let words: Vec<&str> = phrase.split_whitespace().collect();
    let bit_len = fmt.bit_len_for_word_count(words.len())? as usize;
    let chk_len = bit_len / 32;

    let wl = Language::English.words_by_prefix("");
    let mut bits: Vec<bool> = Vec::with_capacity(words.len() * 11);
    for (n, w) in words.iter().enumerate() {
        let idx = wl.iter().position(|&x| x == *w).ok_or_else(|| {
            WalletError::Mnemonic(format!("word #{} is not in the BIP39 word list", n + 1))
        })? as u16;
        for bit in (0..11).rev() {
            bits.push(idx >> bit & 1 == 1);
        }
    }

    let mut seed = Zeroizing::new(vec![0u8; bit_len / 8]);
    for (i, chunk) in bits[..bit_len].chunks(8).enumerate() {
        let mut byte = 0u8;
        for &b in chunk {
            byte = byte << 1 | b as u8;
        }
        seed[i] = byte;
    }

    let digest = Sha256::digest(seed.as_slice());
    let expected: String = bits[bit_len..]
        .iter()
        .map(|&b| if b { '1' } else { '0' })
        .collect();
    let computed: String = (0..chk_len)
        .map(|i| {
            if digest[i / 8] >> (7 - i % 8) & 1 == 1 {
                '1'
            } else {
                '0'
            }
        })
        .collect();
    if computed != expected {
        return Err(WalletError::Checksum {
            field: "BIP39 seed phrase".to_string(),
            computed,
            expected,
        });
    }
    Ok(seed)
}

fn triplet_prefix(word: &str) -> &str {
    match word.char_indices().nth(TRIPLET_PREFIX_LEN) {
        Some((pos, _)) => &word[..pos],
        None => word,
    }
}

fn triplet_chksum_word<'a>(phrase_words: &[&'a str]) -> &'a str {
    let prefixes: String = phrase_words.iter().map(|w| triplet_prefix(w)).collect();
    phrase_words[crc32fast::hash(prefixes.as_bytes()) as usize % phrase_words.len()]
}

fn triplet_encode(seed_bytes: &[u8]) -> String {
    let wl = wordlist::legacy_words();
    let base = wl.len() as u64;

    let mut words: Vec<&str> = Vec::with_capacity(25);
    for group in seed_bytes.chunks(4) {
        let n = u32::from_le_bytes(group.try_into().expect("4-byte group")) as u64;
        let w1 = n % base;
        let w2 = (n / base + w1) % base;
        let w3 = (n / base / base + w2) % base;
        words.push(wl[w1 as usize]);
        words.push(wl[w2 as usize]);
        words.push(wl[w3 as usize]);
    }
    let chk = triplet_chksum_word(&words);
    words.push(chk);
    words.join(" ")
}

fn triplet_decode(phrase: &str) -> WalletResult<Zeroizing<Vec<u8>>> {
    let wl = wordlist::legacy_words();
    let base = wl.len() as u64;
    let words: Vec<&str> = phrase.split_whitespace().collect();

    if words.len() != 25 {
        return Err(WalletError::Mnemonic(format!(
            "{}: invalid seed phrase length for Monero-style mnemonic (must be 25 words)",
            words.len()
        )));
    }
    for (n, w) in words.iter().enumerate() {
        if !wl.contains(w) {
            return Err(WalletError::Mnemonic(format!(
                "word #{} is not in the Monero-style word list",
                n + 1
            )));
        }
    }

    let body = &words[..24];
    let expected = words[24];
    let computed = triplet_chksum_word(body);
    if computed != expected {
        return Err(WalletError::Checksum {
            field: "Monero-style seed phrase".to_string(),
            computed: computed.to_string(),
            expected: expected.to_string(),
        });
    }

    let idx = |w: &str| wl.iter().position(|&x| x == w).expect("membership checked") as u64;
    let mut seed = Zeroizing::new(Vec::with_capacity(32));
    for triple in body.chunks(3) {
        let (w1, w2, w3) = (idx(triple[0]), idx(triple[1]), idx(triple[2]));
        let x = w1
            + base * ((w2 + base - w1) % base)
            + base * base * ((w3 + base - w2) % base);
        let n = u32::try_from(x).map_err(|_| {
            WalletError::Mnemonic("invalid word triplet (value out of range)".to_string())
        })?;
        seed.extend_from_slice(&n.to_le_bytes());
    }
    Ok(seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bip39_reference_vectors() {
        let zeros = [0u8; 16];
        let phrase = MnemonicFormat::Bip39.encode(&zeros).unwrap();
        assert_eq!(
            phrase,
            format!("{} about", "abandon ".repeat(11).trim_end())
        );
        assert_eq!(
            MnemonicFormat::Bip39.decode(&phrase).unwrap().as_slice(),
            &zeros
        );

        let ones = [0xFFu8; 16];
        let phrase = MnemonicFormat::Bip39.encode(&ones).unwrap();
        assert_eq!(phrase, format!("{} wrong", "zoo ".repeat(11).trim_end()));
        assert_eq!(
            MnemonicFormat::Bip39.decode(&phrase).unwrap().as_slice(),
            &ones
        );
    }

    #[test]
    fn bip39_detects_bad_checksum_with_both_values() {
        // swapping the final word of the all-zero phrase breaks the checksum
        let phrase = format!("{} zoo", "abandon ".repeat(11).trim_end());
        match MnemonicFormat::Bip39.decode(&phrase).unwrap_err() {
            WalletError::Checksum {
                computed, expected, ..
            } => {
                assert_eq!(computed.len(), 4);
                assert_eq!(expected.len(), 4);
                assert_ne!(computed, expected);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn bip39_rejects_unknown_words_and_bad_lengths() {
        let err = MnemonicFormat::Bip39
            .decode(&format!("{} zzzz", "abandon ".repeat(11).trim_end()))
            .unwrap_err();
        assert!(matches!(err, WalletError::Mnemonic(msg) if msg.contains("#12")));

        // 160-bit phrases exist in the wild but this system restricts
        // seeds to 128/192/256 bits
        let err = MnemonicFormat::Bip39
            .decode(&"abandon ".repeat(15).trim_end().to_string())
            .unwrap_err();
        assert!(matches!(err, WalletError::Mnemonic(_)));
    }

    #[test]
    fn bip39_round_trips_all_valid_lengths() {
        for len in [16usize, 24, 32] {
            let bytes: Vec<u8> = (0..len).map(|i| (i * 13 + 1) as u8).collect();
            let phrase = MnemonicFormat::Bip39.encode(&bytes).unwrap();
            assert_eq!(
                phrase.split_whitespace().count(),
                MnemonicFormat::Bip39.word_count_for(len as u32 * 8).unwrap()
            );
            let back = MnemonicFormat::Bip39.decode(&phrase).unwrap();
            assert_eq!(back.as_slice(), bytes.as_slice());
        }
    }

    #[test]
    fn legacy_round_trips_and_rejects_unknown_words() {
        let seed = hex::decode("deadbeef".repeat(4)).unwrap();
        let phrase = MnemonicFormat::Legacy.encode(&seed).unwrap();
        assert_eq!(
            phrase,
            "table cast forgive master funny gaze sadness ripple million paint moral match"
        );
        assert_eq!(
            MnemonicFormat::Legacy.decode(&phrase).unwrap().as_slice(),
            seed.as_slice()
        );

        let err = MnemonicFormat::Legacy
            .decode("table cast forgive master funny gaze sadness ripple million paint moral zzzz")
            .unwrap_err();
        assert!(matches!(err, WalletError::Mnemonic(msg) if msg.contains("#12")));
    }

    #[test]
    fn monero_style_reference_vector() {
        let seed: Vec<u8> = (0u8..32).collect();
        let phrase = MnemonicFormat::Monero.encode(&seed).unwrap();
        assert_eq!(
            phrase,
            "art candle certainly down stock sunlight joke marry naked regret decide either \
             torture truth yesterday busy people rough floor feast heavy mostly alive chain art"
        );
        assert_eq!(
            MnemonicFormat::Monero.decode(&phrase).unwrap().as_slice(),
            seed.as_slice()
        );
    }

    #[test]
    fn monero_style_rejects_bad_checksum_and_lengths() {
        let seed: Vec<u8> = (0u8..32).collect();
        let phrase = MnemonicFormat::Monero.encode(&seed).unwrap();

        // replace the checksum word with a different list word
        let mut words: Vec<&str> = phrase.split_whitespace().collect();
        words[24] = "youth";
        let err = MnemonicFormat::Monero.decode(&words.join(" ")).unwrap_err();
        assert!(matches!(err, WalletError::Checksum { .. }));

        assert!(MnemonicFormat::Monero
            .decode(&words[..22].join(" "))
            .is_err());
        assert!(MnemonicFormat::Monero.encode(&[0u8; 16]).is_err());
    }

    #[test]
    fn single_word_swap_is_detected() {
        let seed: Vec<u8> = (50u8..82).collect();
        let phrase = MnemonicFormat::Monero.encode(&seed).unwrap();
        let mut words: Vec<&str> = phrase.split_whitespace().collect();
        let replacement = if words[3] == "able" { "about" } else { "able" };
        words[3] = replacement;
        assert!(MnemonicFormat::Monero.decode(&words.join(" ")).is_err());
    }

    #[test]
    fn word_count_tables() {
        assert_eq!(MnemonicFormat::Legacy.word_count_for(128).unwrap(), 12);
        assert_eq!(MnemonicFormat::Bip39.word_count_for(256).unwrap(), 24);
        assert_eq!(MnemonicFormat::Monero.word_count_for(256).unwrap(), 25);
        assert!(MnemonicFormat::Monero.word_count_for(128).is_err());
        assert_eq!(MnemonicFormat::Bip39.bit_len_for_word_count(18).unwrap(), 192);
        assert!(MnemonicFormat::Bip39.bit_len_for_word_count(15).is_err());
    }

    #[test]
    fn wordlist_self_checks_pass() {
        MnemonicFormat::Legacy.check_wordlist().unwrap();
        MnemonicFormat::Bip39.check_wordlist().unwrap();
        MnemonicFormat::Monero.check_wordlist().unwrap();
    }
}
