//! Mnemonic wallet files: whitespace-separated words from the chosen
//! word list. One container serves both the native and the BIP39 word
//! lists; validity is established by the codec (word membership, length,
//! checksum where the format has one).

use zeroize::Zeroizing;

use crate::errors::{WalletError, WalletResult};
use crate::mnemonic::MnemonicFormat;
use crate::seed::Seed;
use crate::wallet::{EncryptParams, WalletContainer, WalletKind};

pub struct MnemonicWallet {
    kind: WalletKind,
    format: MnemonicFormat,
    phrase: Option<Zeroizing<String>>,
    seed: Option<Seed>,
}

impl MnemonicWallet {
    pub fn new(kind: WalletKind) -> Self {
        let format = match kind {
            WalletKind::Words => MnemonicFormat::Legacy,
            WalletKind::Bip39 => MnemonicFormat::Bip39,
            other => panic!("{other:?} is not a mnemonic wallet kind"),
        };
        MnemonicWallet {
            kind,
            format,
            phrase: None,
            seed: None,
        }
    }

    pub fn mnemonic_format(&self) -> MnemonicFormat {
        self.format
    }
}

impl WalletContainer for MnemonicWallet {
    fn kind(&self) -> WalletKind {
        self.kind
    }

    fn encrypt(&mut self, seed: &Seed, _params: &EncryptParams) -> WalletResult<()> {
        let phrase = self.format.encode(seed.data())?;
        self.phrase = Some(Zeroizing::new(phrase));
        self.seed = Some(seed.clone());
        Ok(())
    }

    fn format(&self) -> WalletResult<Vec<u8>> {
        let phrase = self
            .phrase
            .as_ref()
            .ok_or_else(|| WalletError::Validation("no mnemonic available".to_string()))?;
        Ok(format!("{}\n", phrase.as_str()).into_bytes())
    }

    fn deformat(&mut self, raw: &[u8]) -> WalletResult<()> {
        let text = std::str::from_utf8(raw)
            .map_err(|_| WalletError::Format("mnemonic data is not valid UTF-8".to_string()))?;
        let seed_bytes = self.format.decode(text)?;
        let seed = Seed::new(&seed_bytes)?;
        log::info!(
            "valid {} for Seed ID {}{}",
            self.info().name,
            seed.id(),
            if self.format.has_chksum() {
                ""
            } else {
                " [mnemonic format has no checksum]"
            }
        );
        self.phrase = Some(Zeroizing::new(
            text.split_whitespace().collect::<Vec<_>>().join(" "),
        ));
        self.seed = Some(seed);
        Ok(())
    }

    fn filename(&self) -> WalletResult<String> {
        Ok(format!(
            "{}.{}",
            self.seed()?.id(),
            self.info().ext.expect("mnemonic wallet has an extension")
        ))
    }

    fn seed(&self) -> WalletResult<&Seed> {
        self.seed
            .as_ref()
            .ok_or_else(|| WalletError::Validation("no seed available".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::HashPreset;
    use crate::wallet::{read_wallet, write_wallet, UnlockParams};
    use secrecy::SecretString;

    fn params() -> EncryptParams {
        EncryptParams::new(SecretString::from(String::new()), HashPreset::default())
    }

    fn unlock() -> UnlockParams {
        UnlockParams::new(SecretString::from(String::new()))
    }

    #[test]
    fn native_mnemonic_file_round_trip() {
        let seed = Seed::new(&hex::decode("deadbeef".repeat(4)).unwrap()).unwrap();
        let (raw, name) = write_wallet(WalletKind::Words, &seed, &params()).unwrap();
        assert_eq!(
            String::from_utf8(raw.clone()).unwrap(),
            "table cast forgive master funny gaze sadness ripple million paint moral match\n"
        );
        assert_eq!(name, "43670520.qwords");
        assert_eq!(read_wallet(WalletKind::Words, &raw, &unlock()).unwrap(), seed);
    }

    #[test]
    fn bip39_file_round_trip_and_checksum() {
        let seed = Seed::new(&[0u8; 16]).unwrap();
        let (raw, name) = write_wallet(WalletKind::Bip39, &seed, &params()).unwrap();
        let text = String::from_utf8(raw.clone()).unwrap();
        assert!(text.starts_with("abandon"));
        assert!(text.trim_end().ends_with("about"));
        assert!(name.ends_with(".bip39"));
        assert_eq!(read_wallet(WalletKind::Bip39, &raw, &unlock()).unwrap(), seed);

        let bad = text.replace("about", "zoo");
        assert!(matches!(
            read_wallet(WalletKind::Bip39, bad.as_bytes(), &unlock()),
            Err(WalletError::Checksum { .. })
        ));
    }

    #[test]
    fn messy_whitespace_is_tolerated() {
        let seed = Seed::new(&hex::decode("deadbeef".repeat(4)).unwrap()).unwrap();
        let (raw, _) = write_wallet(WalletKind::Words, &seed, &params()).unwrap();
        let messy = String::from_utf8(raw)
            .unwrap()
            .replace(' ', "\n  ");
        assert_eq!(
            read_wallet(WalletKind::Words, messy.as_bytes(), &unlock()).unwrap(),
            seed
        );
    }

    #[test]
    fn wrong_word_counts_are_rejected() {
        let err = read_wallet(WalletKind::Words, b"table cast forgive", &unlock()).unwrap_err();
        assert!(matches!(err, WalletError::Mnemonic(msg) if msg.contains("12, 18, 24")));
    }
}
