//! Unencrypted seed file formats: checksummed base58, checksummed hex,
//! and bare hex. Validity is purely checksum- and structure-based;
//! `decrypt` is a no-op.

use crate::baseconv::{BaseConv, BaseId, Pad};
use crate::crypto::{chksum6, is_chksum6};
use crate::errors::{WalletError, WalletResult};
use crate::seed::Seed;
use crate::wallet::{split_into_cols, EncryptParams, WalletContainer, WalletKind};

#[derive(Default)]
pub struct SeedFileWallet {
    seed: Option<Seed>,
}

impl WalletContainer for SeedFileWallet {
    fn kind(&self) -> WalletKind {
        WalletKind::SeedFile
    }

    fn encrypt(&mut self, seed: &Seed, _params: &EncryptParams) -> WalletResult<()> {
        self.seed = Some(seed.clone());
        Ok(())
    }

    fn format(&self) -> WalletResult<Vec<u8>> {
        let seed = self.seed()?;
        let b58 = BaseConv::new(BaseId::B58).from_bytes_to_string(seed.data(), Pad::Seed)?;
        Ok(format!("{} {}\n", chksum6(b58.as_bytes()), split_into_cols(4, &b58)).into_bytes())
    }

    fn deformat(&mut self, raw: &[u8]) -> WalletResult<()> {
        let text = std::str::from_utf8(raw)
            .map_err(|_| WalletError::Format("seed data is not valid UTF-8".to_string()))?;
        let tokens: Vec<&str> = text.split_whitespace().collect();

        // checksum token plus 6..11 base58 columns
        if !(7..=12).contains(&tokens.len()) {
            return Err(WalletError::Format(format!(
                "invalid data length ({}) in seed data",
                tokens.len()
            )));
        }

        let chk = tokens[0];
        let b58_val = tokens[1..].join("");

        if !is_chksum6(chk) {
            return Err(WalletError::Format(format!(
                "{chk:?}: invalid checksum format in seed data"
            )));
        }
        let bc = BaseConv::new(BaseId::B58);
        if !bc.is_valid_str(&b58_val) {
            return Err(WalletError::Format(format!(
                "{b58_val:?}: not a base58 string"
            )));
        }

        log::debug!("validating seed data checksum");
        let computed = chksum6(b58_val.as_bytes());
        if computed != chk {
            return Err(WalletError::Checksum {
                field: "seed data".to_string(),
                computed,
                expected: chk.to_string(),
            });
        }

        let bytes = bc.to_bytes_from_string(&b58_val, Pad::Seed)?;
        let seed = Seed::new(&bytes)?;
        log::info!("valid seed data for Seed ID {}", seed.id());
        self.seed = Some(seed);
        Ok(())
    }

    fn filename(&self) -> WalletResult<String> {
        Ok(format!(
            "{}.{}",
            self.seed()?.id(),
            self.info().ext.expect("seed file has an extension")
        ))
    }

    fn seed(&self) -> WalletResult<&Seed> {
        self.seed
            .as_ref()
            .ok_or_else(|| WalletError::Validation("no seed available".to_string()))
    }
}

#[derive(Default)]
pub struct HexSeedWallet {
    seed: Option<Seed>,
}

impl WalletContainer for HexSeedWallet {
    fn kind(&self) -> WalletKind {
        WalletKind::HexSeed
    }

    fn encrypt(&mut self, seed: &Seed, _params: &EncryptParams) -> WalletResult<()> {
        self.seed = Some(seed.clone());
        Ok(())
    }

    fn format(&self) -> WalletResult<Vec<u8>> {
        let seed = self.seed()?;
        let hexstr = hex::encode(seed.data());
        Ok(format!(
            "{} {}\n",
            chksum6(hexstr.as_bytes()),
            split_into_cols(4, &hexstr)
        )
        .into_bytes())
    }

    fn deformat(&mut self, raw: &[u8]) -> WalletResult<()> {
        let text = std::str::from_utf8(raw)
            .map_err(|_| WalletError::Format("seed data is not valid UTF-8".to_string()))?;
        let mut tokens = text.split_whitespace();
        let chk = tokens.next().unwrap_or_default();
        let hexstr: String = tokens.collect();

        if !is_chksum6(chk) {
            return Err(WalletError::Format(format!(
                "{chk:?}: invalid checksum format in seed data"
            )));
        }
        if ![32, 48, 64].contains(&hexstr.len())
            || !hexstr.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(WalletError::Format(format!(
                "{}: invalid hexadecimal seed data length",
                hexstr.len()
            )));
        }

        let computed = chksum6(hexstr.as_bytes());
        if computed != chk {
            return Err(WalletError::Checksum {
                field: "hexadecimal seed data".to_string(),
                computed,
                expected: chk.to_string(),
            });
        }

        let bytes =
            hex::decode(&hexstr).map_err(|e| WalletError::Format(format!("bad hex data: {e}")))?;
        let seed = Seed::new(&bytes)?;
        log::info!("valid seed data for Seed ID {}", seed.id());
        self.seed = Some(seed);
        Ok(())
    }

    fn filename(&self) -> WalletResult<String> {
        let seed = self.seed()?;
        Ok(format!(
            "{}[{}].{}",
            seed.id(),
            seed.bit_len(),
            self.info().ext.expect("hex seed file has an extension")
        ))
    }

    fn seed(&self) -> WalletResult<&Seed> {
        self.seed
            .as_ref()
            .ok_or_else(|| WalletError::Validation("no seed available".to_string()))
    }
}

#[derive(Default)]
pub struct PlainHexWallet {
    seed: Option<Seed>,
}

impl WalletContainer for PlainHexWallet {
    fn kind(&self) -> WalletKind {
        WalletKind::PlainHex
    }

    fn encrypt(&mut self, seed: &Seed, _params: &EncryptParams) -> WalletResult<()> {
        self.seed = Some(seed.clone());
        Ok(())
    }

    fn format(&self) -> WalletResult<Vec<u8>> {
        Ok(format!("{}\n", hex::encode(self.seed()?.data())).into_bytes())
    }

    fn deformat(&mut self, raw: &[u8]) -> WalletResult<()> {
        let text = std::str::from_utf8(raw)
            .map_err(|_| WalletError::Format("seed data is not valid UTF-8".to_string()))?;
        let hexstr: String = text.chars().filter(|c| !c.is_whitespace()).collect();

        if ![32, 48, 64].contains(&hexstr.len()) {
            return Err(WalletError::SeedLength(format!(
                "{} hex digits (valid lengths: 32, 48, 64)",
                hexstr.len()
            )));
        }
        let bytes =
            hex::decode(&hexstr).map_err(|_| {
                WalletError::Format("seed data is not a hexadecimal string".to_string())
            })?;
        self.seed = Some(Seed::new(&bytes)?);
        Ok(())
    }

    fn filename(&self) -> WalletResult<String> {
        let seed = self.seed()?;
        Ok(format!(
            "{}[{}].{}",
            seed.id(),
            seed.bit_len(),
            self.info().ext.expect("plain hex file has an extension")
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

    fn test_seed() -> Seed {
        Seed::new(&hex::decode("deadbeef".repeat(4)).unwrap()).unwrap()
    }

    fn params() -> EncryptParams {
        EncryptParams::new(
            SecretString::from(String::new()),
            HashPreset::default(),
        )
    }

    fn unlock() -> UnlockParams {
        UnlockParams::new(SecretString::from(String::new()))
    }

    #[test]
    fn seed_file_reference_format() {
        let (raw, name) = write_wallet(WalletKind::SeedFile, &test_seed(), &params()).unwrap();
        assert_eq!(
            String::from_utf8(raw.clone()).unwrap(),
            "9fd2b2 UVqy 3AHy cmb5 tjs4 Y5kB wt\n"
        );
        assert_eq!(name, "43670520.qseed");
        let seed = read_wallet(WalletKind::SeedFile, &raw, &unlock()).unwrap();
        assert_eq!(seed, test_seed());
    }

    #[test]
    fn seed_file_detects_any_flipped_character() {
        let (raw, _) = write_wallet(WalletKind::SeedFile, &test_seed(), &params()).unwrap();
        let text = String::from_utf8(raw).unwrap();
        // flip one data character ('U' -> 'V')
        let bad = text.replacen('U', "V", 1);
        assert!(matches!(
            read_wallet(WalletKind::SeedFile, bad.as_bytes(), &unlock()),
            Err(WalletError::Checksum { .. })
        ));
    }

    #[test]
    fn hex_seed_round_trip_all_lengths() {
        for len in [16usize, 24, 32] {
            let seed = Seed::new(&vec![0x3Cu8; len]).unwrap();
            let (raw, name) = write_wallet(WalletKind::HexSeed, &seed, &params()).unwrap();
            assert!(name.contains(&format!("[{}]", len * 8)));
            let back = read_wallet(WalletKind::HexSeed, &raw, &unlock()).unwrap();
            assert_eq!(back, seed);
        }
    }

    #[test]
    fn hex_seed_rejects_corruption() {
        let seed = test_seed();
        let (raw, _) = write_wallet(WalletKind::HexSeed, &seed, &params()).unwrap();
        let text = String::from_utf8(raw).unwrap();
        let bad = text.replacen("dead", "beef", 1);
        assert!(matches!(
            read_wallet(WalletKind::HexSeed, bad.as_bytes(), &unlock()),
            Err(WalletError::Checksum { .. })
        ));
    }

    #[test]
    fn plain_hex_round_trip_and_length_check() {
        let seed = test_seed();
        let (raw, _) = write_wallet(WalletKind::PlainHex, &seed, &params()).unwrap();
        assert_eq!(
            String::from_utf8(raw.clone()).unwrap().trim_end(),
            "deadbeef".repeat(4)
        );
        assert_eq!(
            read_wallet(WalletKind::PlainHex, &raw, &unlock()).unwrap(),
            seed
        );

        assert!(matches!(
            read_wallet(WalletKind::PlainHex, b"deadbeef", &unlock()),
            Err(WalletError::SeedLength(_))
        ));
        assert!(read_wallet(WalletKind::PlainHex, b"zz".repeat(16).as_slice(), &unlock()).is_err());
    }
}
