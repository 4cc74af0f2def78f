//! Die-roll seed file: base6 digits `1`..`6`, one per roll, presented in
//! 5-character groups, five groups per line.

use crate::baseconv::{BaseConv, BaseId, Pad};
use crate::errors::{WalletError, WalletResult};
use crate::seed::Seed;
use crate::wallet::{block_format, EncryptParams, WalletContainer, WalletKind};

#[derive(Default)]
pub struct DierollWallet {
    seed: Option<Seed>,
}

impl WalletContainer for DierollWallet {
    fn kind(&self) -> WalletKind {
        WalletKind::Dieroll
    }

    fn encrypt(&mut self, seed: &Seed, _params: &EncryptParams) -> WalletResult<()> {
        self.seed = Some(seed.clone());
        Ok(())
    }

    fn format(&self) -> WalletResult<Vec<u8>> {
        let seed = self.seed()?;
        let digits = BaseConv::new(BaseId::B6d).from_bytes_to_string(seed.data(), Pad::Seed)?;
        Ok(block_format(&digits, 5, 5).into_bytes())
    }

    fn deformat(&mut self, raw: &[u8]) -> WalletResult<()> {
        let text = std::str::from_utf8(raw)
            .map_err(|_| WalletError::Format("die roll data is not valid UTF-8".to_string()))?;
        let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();

        let byte_len = match digits.len() {
            50 => 16usize,
            75 => 24,
            100 => 32,
            n => {
                return Err(WalletError::SeedLength(format!(
                    "{n}: invalid length for die roll data (must be one of 50, 75, 100)"
                )))
            }
        };

        let bc = BaseConv::new(BaseId::B6d);
        let bytes = bc.to_bytes_from_string(&digits, Pad::Seed)?;
        // the die rolls may encode a number slightly wider than the seed:
        // discard the high bits
        let start = bytes.len() - byte_len;
        let seed = Seed::new(&bytes[start..])?;
        log::info!("valid die roll data for Seed ID {}", seed.id());
        self.seed = Some(seed);
        Ok(())
    }

    fn filename(&self) -> WalletResult<String> {
        let seed = self.seed()?;
        Ok(format!(
            "{}[{}].{}",
            seed.id(),
            seed.bit_len(),
            self.info().ext.expect("die roll file has an extension")
        ))
    }

    fn seed(&self) -> WalletResult<&Seed> {
        self.seed
            .as_ref()
            .ok_or_else(|| WalletError::Validation("no seed available".to_string()))
    }
}
