//! Incognito wallet: a fixed-size, headerless blob under two layers of
//! AES-CTR.
//!
//! Payload layout: IV(16) ‖ AES-CTR(salt(16) ‖ AES-CTR(chk(8) ‖ seed)).
//! The inner layer is keyed from (passphrase, salt); the outer "wrapper"
//! layer is keyed from (passphrase, IV), and the IV also initializes the
//! wrapper's counter. Nothing in the blob identifies it as a wallet: the
//! only public handle is the Incognito Wallet ID, a checksum of the IV
//! kept as a lookup aid in the owner's records.

use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::crypto::{
    chksum8, decrypt_data, encrypt_data, encrypt_seed, iv_chksum, make_key, HashPreset,
    AESCTR_IV_LEN, DFL_IV, INCOG_CHK_LEN, KEY_LEN, SALT_LEN,
};
use crate::errors::{WalletError, WalletResult};
use crate::seed::{Seed, SEED_BIT_LENS};
use crate::wallet::{
    decode_pretty_hexdump, pretty_hexdump, EncryptParams, UnlockParams, WalletContainer,
    WalletKind,
};

/// Total incognito payload size for a seed bit length: 56, 64 or 72
/// bytes.
pub fn incog_data_len(seed_bit_len: u32) -> usize {
    AESCTR_IV_LEN + SALT_LEN + INCOG_CHK_LEN + seed_bit_len as usize / 8
}

pub struct IncogWallet {
    kind: WalletKind,
    seed: Option<Seed>,
    iv: Option<Vec<u8>>,
    incog_id: Option<String>,
    key_id: Option<String>,
    salt: Option<Vec<u8>>,
    enc_seed: Option<Vec<u8>>,
    wrapper_key: Option<Zeroizing<[u8; KEY_LEN]>>,
    enc_incog_data: Option<Vec<u8>>,
    hash_preset: Option<HashPreset>,
}

impl IncogWallet {
    pub fn new(kind: WalletKind) -> Self {
        assert!(
            matches!(kind, WalletKind::Incog | WalletKind::IncogHex),
            "{kind:?} is not an incognito wallet kind"
        );
        IncogWallet {
            kind,
            seed: None,
            iv: None,
            incog_id: None,
            key_id: None,
            salt: None,
            enc_seed: None,
            wrapper_key: None,
            enc_incog_data: None,
            hash_preset: None,
        }
    }

    /// The public Incognito Wallet ID, available after encrypt or
    /// deformat.
    pub fn incog_id(&self) -> Option<&str> {
        self.incog_id.as_deref()
    }

    fn iv_as_counter(iv: &[u8]) -> [u8; AESCTR_IV_LEN] {
        let mut counter = [0u8; AESCTR_IV_LEN];
        counter.copy_from_slice(iv);
        counter
    }

    fn binary_payload(&self) -> WalletResult<Vec<u8>> {
        let not_encrypted = || WalletError::Validation("wallet not encrypted".to_string());
        let iv = self.iv.as_ref().ok_or_else(not_encrypted)?;
        let wrapper_key = self.wrapper_key.as_ref().ok_or_else(not_encrypted)?;
        let salt = self.salt.as_ref().ok_or_else(not_encrypted)?;
        let enc_seed = self.enc_seed.as_ref().ok_or_else(not_encrypted)?;

        let mut inner = Vec::with_capacity(salt.len() + enc_seed.len());
        inner.extend_from_slice(salt);
        inner.extend_from_slice(enc_seed);

        // the IV both salts the wrapper key and initializes its counter
        let mut out = iv.clone();
        out.extend_from_slice(&encrypt_data(
            &inner,
            wrapper_key,
            &Self::iv_as_counter(iv),
            true,
        ));
        Ok(out)
    }
}

impl WalletContainer for IncogWallet {
    fn kind(&self) -> WalletKind {
        self.kind
    }

    fn encrypt(&mut self, seed: &Seed, params: &EncryptParams) -> WalletResult<()> {
        let preset = params.hash_preset;
        let passwd = params.passphrase.expose_secret().as_bytes();

        let iv = params.random.get_random(AESCTR_IV_LEN).to_vec();
        let incog_id = iv_chksum(&iv);
        log::info!("New Incog Wallet ID: {incog_id} (record this value)");

        let salt = params.random.get_random(SALT_LEN).to_vec();
        let seed_key = make_key(passwd, &salt, &preset, &params.kdf_policy)?;

        let chk = &Sha256::digest(seed.data())[..INCOG_CHK_LEN];
        let mut plain = Zeroizing::new(Vec::with_capacity(INCOG_CHK_LEN + seed.byte_len()));
        plain.extend_from_slice(chk);
        plain.extend_from_slice(seed.data());
        self.enc_seed = Some(encrypt_seed(&plain, &seed_key));

        let wrapper_key = make_key(passwd, &iv, &preset, &params.kdf_policy)?;
        self.key_id = Some(chksum8(wrapper_key.as_slice()));
        log::debug!("Key ID: {}", self.key_id.as_deref().unwrap_or_default());

        self.wrapper_key = Some(wrapper_key);
        self.salt = Some(salt);
        self.iv = Some(iv);
        self.incog_id = Some(incog_id);
        self.hash_preset = Some(preset);
        self.seed = Some(seed.clone());
        Ok(())
    }

    fn format(&self) -> WalletResult<Vec<u8>> {
        let payload = self.binary_payload()?;
        Ok(match self.kind {
            WalletKind::IncogHex => pretty_hexdump(&payload, 2, 8).into_bytes(),
            _ => payload,
        })
    }

    fn deformat(&mut self, raw: &[u8]) -> WalletResult<()> {
        let data = match self.kind {
            WalletKind::IncogHex => decode_pretty_hexdump(
                std::str::from_utf8(raw).map_err(|_| {
                    WalletError::Format("hex incognito data is not valid UTF-8".to_string())
                })?,
            )?,
            _ => raw.to_vec(),
        };

        let valid_lens: Vec<usize> = SEED_BIT_LENS.iter().map(|&b| incog_data_len(b)).collect();
        if !valid_lens.contains(&data.len()) {
            return Err(WalletError::Format(format!(
                "invalid incognito data size ({} bytes); valid sizes (in bytes): {}",
                data.len(),
                valid_lens
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" ")
            )));
        }

        let iv = data[..AESCTR_IV_LEN].to_vec();
        let incog_id = iv_chksum(&iv);
        log::info!("Incog Wallet ID: {incog_id} (check this value against your records)");
        self.enc_incog_data = Some(data[AESCTR_IV_LEN..].to_vec());
        self.iv = Some(iv);
        self.incog_id = Some(incog_id);
        Ok(())
    }

    fn decrypt(&mut self, params: &UnlockParams) -> WalletResult<()> {
        let iv = self
            .iv
            .as_ref()
            .ok_or_else(|| WalletError::Validation("wallet not deformatted".to_string()))?;
        let enc_incog = self
            .enc_incog_data
            .as_ref()
            .ok_or_else(|| WalletError::Validation("wallet not deformatted".to_string()))?;
        let preset = params.hash_preset.ok_or_else(|| {
            WalletError::Validation(
                "incognito wallet requires an explicit hash preset".to_string(),
            )
        })?;
        let passwd = params.passphrase.expose_secret().as_bytes();

        let wrapper_key = make_key(passwd, iv, &preset, &params.kdf_policy)?;
        let inner = decrypt_data(enc_incog, &wrapper_key, &Self::iv_as_counter(iv));

        let salt = &inner[..SALT_LEN];
        let enc_seed = &inner[SALT_LEN..];
        let seed_key = make_key(passwd, salt, &preset, &params.kdf_policy)?;
        log::debug!("Key ID: {}", chksum8(seed_key.as_slice()));

        let dec = decrypt_data(enc_seed, &seed_key, &DFL_IV);
        let (chk, seed_bytes) = dec.split_at(INCOG_CHK_LEN);
        if &Sha256::digest(seed_bytes)[..INCOG_CHK_LEN] != chk {
            return Err(WalletError::WrongPassphrase);
        }
        log::info!("passphrase and hash preset are correct");

        let seed = Seed::new(seed_bytes)?;
        log::info!("Seed ID: {}", seed.id());
        self.key_id = Some(chksum8(wrapper_key.as_slice()));
        self.hash_preset = Some(preset);
        self.seed = Some(seed);
        Ok(())
    }

    fn filename(&self) -> WalletResult<String> {
        let seed = self.seed()?;
        let preset = self
            .hash_preset
            .ok_or_else(|| WalletError::Validation("wallet not encrypted".to_string()))?;
        Ok(format!(
            "{}-{}-{}[{},{}].{}",
            seed.id(),
            self.key_id.as_deref().unwrap_or_default(),
            self.incog_id.as_deref().unwrap_or_default(),
            seed.bit_len(),
            preset.name,
            self.info().ext.expect("incognito wallet has an extension")
        ))
    }

    fn seed(&self) -> WalletResult<&Seed> {
        self.seed
            .as_ref()
            .ok_or_else(|| WalletError::Validation("no seed available".to_string()))
    }
}
