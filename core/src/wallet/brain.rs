//! Brainwallet: the passphrase *is* the wallet. There is no stored
//! ciphertext; `decrypt` re-derives the seed directly from the
//! passphrase via the KDF at a caller-supplied output length, since that
//! length is not recoverable from the format itself.

use secrecy::{ExposeSecret, SecretString};

use crate::crypto::hash_passphrase;
use crate::errors::{WalletError, WalletResult};
use crate::seed::{is_valid_seed_bit_len, Seed};
use crate::wallet::{EncryptParams, UnlockParams, WalletContainer, WalletKind};

#[derive(Default)]
pub struct BrainWallet {
    brain_passphrase: Option<SecretString>,
    seed: Option<Seed>,
}

impl WalletContainer for BrainWallet {
    fn kind(&self) -> WalletKind {
        WalletKind::Brain
    }

    fn deformat(&mut self, raw: &[u8]) -> WalletResult<()> {
        let text = std::str::from_utf8(raw).map_err(|_| {
            WalletError::Format("brainwallet data is not valid UTF-8".to_string())
        })?;
        // normalize interior whitespace; the passphrase is all there is
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.is_empty() {
            return Err(WalletError::Format("empty brainwallet data".to_string()));
        }
        self.brain_passphrase = Some(SecretString::from(normalized));
        Ok(())
    }

    fn decrypt(&mut self, params: &UnlockParams) -> WalletResult<()> {
        let bp = self.brain_passphrase.as_ref().ok_or_else(|| {
            WalletError::Validation("brainwallet not deformatted".to_string())
        })?;
        let preset = params.hash_preset.ok_or_else(|| {
            WalletError::Validation(
                "brainwallet requires an explicit hash preset".to_string(),
            )
        })?;
        let bits = params.seed_bit_len.ok_or_else(|| {
            WalletError::Validation(
                "brainwallet requires an explicit seed length".to_string(),
            )
        })?;
        if !is_valid_seed_bit_len(bits) {
            return Err(WalletError::SeedLength(format!("{bits} bits")));
        }

        log::debug!("hashing brainwallet data");
        let seed_bytes = hash_passphrase(
            bp.expose_secret().as_bytes(),
            b"",
            &preset,
            bits as usize / 8,
            &params.kdf_policy,
        )?;
        let seed = Seed::new(&seed_bytes)?;
        log::info!("brainwallet seed has Seed ID {}", seed.id());
        self.seed = Some(seed);
        Ok(())
    }

    fn encrypt(&mut self, _seed: &Seed, _params: &EncryptParams) -> WalletResult<()> {
        Err(WalletError::Validation(
            "a brainwallet cannot be written; the passphrase itself is the wallet".to_string(),
        ))
    }

    fn format(&self) -> WalletResult<Vec<u8>> {
        Err(WalletError::Validation(
            "a brainwallet cannot be written; the passphrase itself is the wallet".to_string(),
        ))
    }

    fn filename(&self) -> WalletResult<String> {
        Err(WalletError::Validation(
            "a brainwallet has no file representation".to_string(),
        ))
    }

    fn seed(&self) -> WalletResult<&Seed> {
        self.seed
            .as_ref()
            .ok_or_else(|| WalletError::Validation("no seed available".to_string()))
    }
}
