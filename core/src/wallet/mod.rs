//! Wallet container formats.
//!
//! Every format is a tagged variant behind one capability interface:
//! `deformat` (parse + self-validate), `decrypt`, `encrypt`, `format`
//! (serialize) and `filename`. Reading runs deformat → decrypt → seed;
//! writing runs encrypt → format. Formats are looked up through a static
//! registry by file extension or format code.

pub mod brain;
pub mod dieroll;
pub mod hidden;
pub mod incog;
pub mod mnemonic;
pub mod native;
pub mod seedfile;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::crypto::{HashPreset, KdfPolicy};
use crate::entropy::RandomSource;
use crate::errors::{WalletError, WalletResult};
use crate::seed::Seed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletKind {
    Native,
    Words,
    Bip39,
    SeedFile,
    HexSeed,
    PlainHex,
    Dieroll,
    Brain,
    Incog,
    IncogHex,
    IncogHidden,
}

/// Static description of one wallet format.
pub struct FormatInfo {
    pub kind: WalletKind,
    pub name: &'static str,
    pub ext: Option<&'static str>,
    pub encrypted: bool,
    pub binary: bool,
    pub fmt_codes: &'static [&'static str],
}

pub const FORMATS: [FormatInfo; 11] = [
    FormatInfo {
        kind: WalletKind::Native,
        name: "native wallet",
        ext: Some("qwal"),
        encrypted: true,
        binary: false,
        fmt_codes: &["wallet", "w"],
    },
    FormatInfo {
        kind: WalletKind::Words,
        name: "native mnemonic data",
        ext: Some("qwords"),
        encrypted: false,
        binary: false,
        fmt_codes: &["words", "mnemonic", "mn", "m"],
    },
    FormatInfo {
        kind: WalletKind::Bip39,
        name: "BIP39 mnemonic data",
        ext: Some("bip39"),
        encrypted: false,
        binary: false,
        fmt_codes: &["bip39"],
    },
    FormatInfo {
        kind: WalletKind::SeedFile,
        name: "seed data",
        ext: Some("qseed"),
        encrypted: false,
        binary: false,
        fmt_codes: &["seed", "s"],
    },
    FormatInfo {
        kind: WalletKind::HexSeed,
        name: "hexadecimal seed data",
        ext: Some("qhex"),
        encrypted: false,
        binary: false,
        fmt_codes: &["seedhex", "hexseed"],
    },
    FormatInfo {
        kind: WalletKind::PlainHex,
        name: "plain hexadecimal seed data",
        ext: Some("hex"),
        encrypted: false,
        binary: false,
        fmt_codes: &["hex", "rawhex", "plainhex"],
    },
    FormatInfo {
        kind: WalletKind::Dieroll,
        name: "base6d die roll seed data",
        ext: Some("b6d"),
        encrypted: false,
        binary: false,
        fmt_codes: &["b6d", "die", "dieroll"],
    },
    FormatInfo {
        kind: WalletKind::Brain,
        name: "brainwallet",
        ext: Some("qbrain"),
        encrypted: true,
        binary: false,
        fmt_codes: &["brainwallet", "brain", "bw"],
    },
    FormatInfo {
        kind: WalletKind::Incog,
        name: "incognito data",
        ext: Some("qincog"),
        encrypted: true,
        binary: true,
        fmt_codes: &["incog", "icg", "i"],
    },
    FormatInfo {
        kind: WalletKind::IncogHex,
        name: "hex incognito data",
        ext: Some("qincox"),
        encrypted: true,
        binary: false,
        fmt_codes: &["incox", "incog_hex", "ix", "xi"],
    },
    FormatInfo {
        kind: WalletKind::IncogHidden,
        name: "hidden incognito data",
        ext: None,
        encrypted: true,
        binary: true,
        fmt_codes: &["incog_hidden", "hincog", "ih", "hi"],
    },
];

pub fn format_info(kind: WalletKind) -> &'static FormatInfo {
    FORMATS
        .iter()
        .find(|f| f.kind == kind)
        .expect("every kind is registered")
}

pub fn format_by_ext(ext: &str) -> Option<&'static FormatInfo> {
    FORMATS.iter().find(|f| f.ext == Some(ext))
}

pub fn format_by_code(code: &str) -> Option<&'static FormatInfo> {
    FORMATS.iter().find(|f| f.fmt_codes.contains(&code))
}

/// Where a passphrase comes from. File-sourced passphrases cannot be
/// corrected interactively, so failures with them are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassphraseSource {
    Interactive,
    File,
}

/// Parameters for encrypting a seed into a container.
pub struct EncryptParams {
    pub passphrase: SecretString,
    pub hash_preset: HashPreset,
    pub label: Option<String>,
    pub kdf_policy: KdfPolicy,
    pub random: RandomSource,
}

impl EncryptParams {
    pub fn new(passphrase: SecretString, hash_preset: HashPreset) -> Self {
        EncryptParams {
            passphrase,
            hash_preset,
            label: None,
            kdf_policy: KdfPolicy::default(),
            random: RandomSource::new(),
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }
}

/// Parameters for decrypting a container.
///
/// `hash_preset` is required by formats that do not record it (incognito,
/// brainwallet); the native wallet reads its own. `seed_bit_len` is
/// required by the brainwallet, whose output length is not recoverable
/// from the format itself.
pub struct UnlockParams {
    pub passphrase: SecretString,
    pub hash_preset: Option<HashPreset>,
    pub seed_bit_len: Option<u32>,
    pub kdf_policy: KdfPolicy,
}

impl UnlockParams {
    pub fn new(passphrase: SecretString) -> Self {
        UnlockParams {
            passphrase,
            hash_preset: None,
            seed_bit_len: None,
            kdf_policy: KdfPolicy::default(),
        }
    }

    pub fn with_hash_preset(mut self, preset: HashPreset) -> Self {
        self.hash_preset = Some(preset);
        self
    }

    pub fn with_seed_bit_len(mut self, bits: u32) -> Self {
        self.seed_bit_len = Some(bits);
        self
    }
}

/// The capability interface every container format implements.
pub trait WalletContainer {
    fn kind(&self) -> WalletKind;

    fn info(&self) -> &'static FormatInfo {
        format_info(self.kind())
    }

    /// Parse raw formatted data, validating structure and checksums.
    fn deformat(&mut self, raw: &[u8]) -> WalletResult<()>;

    /// Recover the seed. A no-op for unencrypted formats, which decode
    /// during `deformat`.
    fn decrypt(&mut self, _params: &UnlockParams) -> WalletResult<()> {
        Ok(())
    }

    /// Install a seed and derive the format's encrypted payload.
    fn encrypt(&mut self, seed: &Seed, params: &EncryptParams) -> WalletResult<()>;

    /// Serialize to the on-disk representation.
    fn format(&self) -> WalletResult<Vec<u8>>;

    /// Canonical filename for the loaded/encrypted wallet.
    fn filename(&self) -> WalletResult<String>;

    fn seed(&self) -> WalletResult<&Seed>;
}

/// The closed set of container formats.
pub enum Wallet {
    Native(native::NativeWallet),
    Words(mnemonic::MnemonicWallet),
    Bip39(mnemonic::MnemonicWallet),
    SeedFile(seedfile::SeedFileWallet),
    HexSeed(seedfile::HexSeedWallet),
    PlainHex(seedfile::PlainHexWallet),
    Dieroll(dieroll::DierollWallet),
    Brain(brain::BrainWallet),
    Incog(incog::IncogWallet),
    IncogHex(incog::IncogWallet),
    IncogHidden(hidden::HiddenIncogWallet),
}

impl Wallet {
    pub fn new(kind: WalletKind) -> Self {
        match kind {
            WalletKind::Native => Wallet::Native(native::NativeWallet::default()),
            WalletKind::Words => {
                Wallet::Words(mnemonic::MnemonicWallet::new(WalletKind::Words))
            }
            WalletKind::Bip39 => {
                Wallet::Bip39(mnemonic::MnemonicWallet::new(WalletKind::Bip39))
            }
            WalletKind::SeedFile => Wallet::SeedFile(seedfile::SeedFileWallet::default()),
            WalletKind::HexSeed => Wallet::HexSeed(seedfile::HexSeedWallet::default()),
            WalletKind::PlainHex => Wallet::PlainHex(seedfile::PlainHexWallet::default()),
            WalletKind::Dieroll => Wallet::Dieroll(dieroll::DierollWallet::default()),
            WalletKind::Brain => Wallet::Brain(brain::BrainWallet::default()),
            WalletKind::Incog => Wallet::Incog(incog::IncogWallet::new(WalletKind::Incog)),
            WalletKind::IncogHex => {
                Wallet::IncogHex(incog::IncogWallet::new(WalletKind::IncogHex))
            }
            WalletKind::IncogHidden => {
                Wallet::IncogHidden(hidden::HiddenIncogWallet::default())
            }
        }
    }

    fn inner(&self) -> &dyn WalletContainer {
        match self {
            Wallet::Native(w) => w,
            Wallet::Words(w) | Wallet::Bip39(w) => w,
            Wallet::SeedFile(w) => w,
            Wallet::HexSeed(w) => w,
            Wallet::PlainHex(w) => w,
            Wallet::Dieroll(w) => w,
            Wallet::Brain(w) => w,
            Wallet::Incog(w) | Wallet::IncogHex(w) => w,
            Wallet::IncogHidden(w) => w,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn WalletContainer {
        match self {
            Wallet::Native(w) => w,
            Wallet::Words(w) | Wallet::Bip39(w) => w,
            Wallet::SeedFile(w) => w,
            Wallet::HexSeed(w) => w,
            Wallet::PlainHex(w) => w,
            Wallet::Dieroll(w) => w,
            Wallet::Brain(w) => w,
            Wallet::Incog(w) | Wallet::IncogHex(w) => w,
            Wallet::IncogHidden(w) => w,
        }
    }
}

impl WalletContainer for Wallet {
    fn kind(&self) -> WalletKind {
        self.inner().kind()
    }

    fn deformat(&mut self, raw: &[u8]) -> WalletResult<()> {
        self.inner_mut().deformat(raw)
    }

    fn decrypt(&mut self, params: &UnlockParams) -> WalletResult<()> {
        self.inner_mut().decrypt(params)
    }

    fn encrypt(&mut self, seed: &Seed, params: &EncryptParams) -> WalletResult<()> {
        self.inner_mut().encrypt(seed, params)
    }

    fn format(&self) -> WalletResult<Vec<u8>> {
        self.inner().format()
    }

    fn filename(&self) -> WalletResult<String> {
        self.inner().filename()
    }

    fn seed(&self) -> WalletResult<&Seed> {
        self.inner().seed()
    }
}

/// Read pipeline: deformat → decrypt → seed.
pub fn read_wallet(kind: WalletKind, raw: &[u8], params: &UnlockParams) -> WalletResult<Seed> {
    let mut wallet = Wallet::new(kind);
    wallet.deformat(raw)?;
    wallet.decrypt(params)?;
    Ok(wallet.seed()?.clone())
}

/// Write pipeline: encrypt → format. Returns the serialized wallet and
/// its canonical filename.
pub fn write_wallet(
    kind: WalletKind,
    seed: &Seed,
    params: &EncryptParams,
) -> WalletResult<(Vec<u8>, String)> {
    let mut wallet = Wallet::new(kind);
    wallet.encrypt(seed, params)?;
    Ok((wallet.format()?, wallet.filename()?))
}

/// Decrypt with the retry policy the passphrase source allows: retryable
/// failures loop while `next_params` keeps supplying attempts, but a
/// file-sourced passphrase fails on the first mistake (there is no way to
/// "retry" fixed file contents).
pub fn unlock_with_retry(
    wallet: &mut Wallet,
    source: PassphraseSource,
    mut next_params: impl FnMut(u32) -> Option<UnlockParams>,
) -> WalletResult<()> {
    let mut attempt = 0u32;
    loop {
        let params = next_params(attempt).ok_or(WalletError::WrongPassphrase)?;
        match wallet.decrypt(&params) {
            Ok(()) => return Ok(()),
            Err(e) if e.is_retryable() && source == PassphraseSource::Interactive => {
                log::warn!("{e}; trying again");
                attempt += 1;
            }
            Err(e) => {
                if source == PassphraseSource::File && e.is_retryable() {
                    log::error!("passphrase supplied from file, not retrying");
                }
                return Err(e);
            }
        }
    }
}

/// Group a string into space-separated columns of `gw` characters.
pub(crate) fn split_into_cols(gw: usize, s: &str) -> String {
    s.as_bytes()
        .chunks(gw)
        .map(|c| std::str::from_utf8(c).expect("ascii input"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Block-format a digit string: groups of `gw`, `cols` groups per line.
pub(crate) fn block_format(s: &str, gw: usize, cols: usize) -> String {
    let groups: Vec<&str> = s
        .as_bytes()
        .chunks(gw)
        .map(|c| std::str::from_utf8(c).expect("ascii input"))
        .collect();
    groups
        .chunks(cols)
        .map(|line| line.join(" "))
        .collect::<Vec<_>>()
        .join("\n")
        + "\n"
}

/// Render binary data as a whitespace-grouped hex dump.
pub(crate) fn pretty_hexdump(data: &[u8], gw: usize, cols: usize) -> String {
    block_format(&hex::encode(data), gw * 2, cols)
}

/// Strip whitespace from a hex dump and decode it.
pub(crate) fn decode_pretty_hexdump(s: &str) -> WalletResult<Vec<u8>> {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&compact).map_err(|_| {
        WalletError::Format("data is not in hexadecimal format".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lookup_by_ext_and_code() {
        assert_eq!(format_by_ext("qwal").unwrap().kind, WalletKind::Native);
        assert_eq!(format_by_ext("b6d").unwrap().kind, WalletKind::Dieroll);
        assert!(format_by_ext("exe").is_none());

        assert_eq!(format_by_code("mn").unwrap().kind, WalletKind::Words);
        assert_eq!(format_by_code("hincog").unwrap().kind, WalletKind::IncogHidden);
        assert!(format_by_code("nope").is_none());
    }

    #[test]
    fn hidden_format_has_no_extension() {
        assert!(format_info(WalletKind::IncogHidden).ext.is_none());
        let with_ext = FORMATS.iter().filter(|f| f.ext.is_some()).count();
        assert_eq!(with_ext, 10);
    }

    #[test]
    fn text_grouping_helpers() {
        assert_eq!(split_into_cols(4, "abcdefghij"), "abcd efgh ij");
        assert_eq!(block_format("123456789012", 4, 2), "1234 5678\n9012\n");
        assert_eq!(pretty_hexdump(&[0xAB, 0xCD, 0xEF, 0x01], 2, 8), "abcd ef01\n");
        assert_eq!(
            decode_pretty_hexdump("abcd ef01\n").unwrap(),
            vec![0xAB, 0xCD, 0xEF, 0x01]
        );
        assert!(decode_pretty_hexdump("zz").is_err());
    }
}
