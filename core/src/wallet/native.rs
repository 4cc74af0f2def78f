//! The native encrypted wallet: a six-line text record in which every
//! component carries its own checksum and a master checksum covers the
//! whole.
//!
//! Line layout:
//! ```text
//! <master chksum6>
//! <label>
//! <seed-id> <key-id> <bit-length> <pw-status> <timestamp>
//! <hash-preset>: <N> <r> <p>
//! <chksum6> <base58(salt), 4-char columns>
//! <chksum6> <base58(encrypted seed), 4-char columns>
//! ```

use chrono::Utc;
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};

use crate::baseconv::{BaseConv, BaseId, Pad};
use crate::crypto::{
    chksum6, chksum8, decrypt_seed, encrypt_seed, is_chksum6, make_key, HashPreset, SALT_LEN,
};
use crate::errors::{WalletError, WalletResult};
use crate::seed::{is_valid_seed_bit_len, Seed};
use crate::wallet::{split_into_cols, EncryptParams, UnlockParams, WalletContainer, WalletKind};

pub const DFL_LABEL: &str = "No Label";

#[derive(Default)]
pub struct NativeWallet {
    seed: Option<Seed>,
    label: Option<String>,
    hash_preset: Option<HashPreset>,
    salt: Option<Vec<u8>>,
    enc_seed: Option<Vec<u8>>,
    key_id: Option<String>,
    pw_status: Option<String>,
    timestamp: Option<String>,
    // header fields kept from deformat for decrypt-time verification
    header_seed_id: Option<String>,
    header_bit_len: Option<u32>,
}

impl NativeWallet {
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn hash_preset(&self) -> Option<&HashPreset> {
        self.hash_preset.as_ref()
    }

    pub fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    fn b58_field(&self, which: &str) -> WalletResult<(&str, String)> {
        let (bytes, chk_src) = match which {
            "salt" => (self.salt.as_ref(), "salt"),
            _ => (self.enc_seed.as_ref(), "encrypted seed"),
        };
        let bytes = bytes.ok_or_else(|| {
            WalletError::Validation(format!("wallet {chk_src} not initialized"))
        })?;
        let fmt = BaseConv::new(BaseId::B58).from_bytes_to_string(bytes, Pad::Seed)?;
        Ok((chk_src, fmt))
    }
}

impl WalletContainer for NativeWallet {
    fn kind(&self) -> WalletKind {
        WalletKind::Native
    }

    fn encrypt(&mut self, seed: &Seed, params: &EncryptParams) -> WalletResult<()> {
        let preset = params.hash_preset;

        // wide entropy pull hashed down to the salt width
        let pool = params.random.get_random(128);
        let salt = Sha256::digest(pool.as_slice())[..SALT_LEN].to_vec();

        let key = make_key(
            params.passphrase.expose_secret().as_bytes(),
            &salt,
            &preset,
            &params.kdf_policy,
        )?;
        self.key_id = Some(chksum8(key.as_slice()));
        self.enc_seed = Some(encrypt_seed(seed.data(), &key));
        self.salt = Some(salt);

        self.pw_status = Some(
            if params.passphrase.expose_secret().is_empty() {
                "E"
            } else {
                "NE"
            }
            .to_string(),
        );
        self.timestamp = Some(Utc::now().format("%Y%m%d_%H%M%S").to_string());
        self.label = Some(
            params
                .label
                .clone()
                .unwrap_or_else(|| DFL_LABEL.to_string()),
        );
        self.hash_preset = Some(preset);
        self.seed = Some(seed.clone());
        Ok(())
    }

    fn format(&self) -> WalletResult<Vec<u8>> {
        let seed = self.seed()?;
        let preset = self
            .hash_preset
            .ok_or_else(|| WalletError::Validation("wallet not encrypted".to_string()))?;
        let (n, r, p) = preset.params();

        let (_, salt_fmt) = self.b58_field("salt")?;
        let (_, es_fmt) = self.b58_field("enc_seed")?;

        let lines = [
            self.label.clone().unwrap_or_else(|| DFL_LABEL.to_string()),
            format!(
                "{} {} {} {} {}",
                seed.id().as_str().to_lowercase(),
                self.key_id.as_deref().unwrap_or_default().to_lowercase(),
                seed.bit_len(),
                self.pw_status.as_deref().unwrap_or("NE"),
                self.timestamp.as_deref().unwrap_or_default(),
            ),
            format!("{}: {} {} {}", preset.name, n, r, p),
            format!("{} {}", chksum6(salt_fmt.as_bytes()), split_into_cols(4, &salt_fmt)),
            format!("{} {}", chksum6(es_fmt.as_bytes()), split_into_cols(4, &es_fmt)),
        ];
        let master = chksum6(lines.join(" ").as_bytes());

        let mut out = master;
        for line in &lines {
            out.push('\n');
            out.push_str(line);
        }
        out.push('\n');
        Ok(out.into_bytes())
    }

    fn deformat(&mut self, raw: &[u8]) -> WalletResult<()> {
        let text = std::str::from_utf8(raw)
            .map_err(|_| WalletError::Format("wallet data is not valid UTF-8".to_string()))?;
        let lines: Vec<&str> = text.trim_end().split('\n').collect();

        if lines.len() != 6 {
            return Err(WalletError::Format(format!(
                "invalid number of lines ({}) in wallet data",
                lines.len()
            )));
        }
        if !is_chksum6(lines[0]) {
            return Err(WalletError::Format(format!(
                "incorrect master checksum ({}) in wallet data",
                lines[0]
            )));
        }
        let computed = chksum6(lines[1..].join(" ").as_bytes());
        if computed != lines[0] {
            return Err(WalletError::Checksum {
                field: "wallet master checksum".to_string(),
                computed,
                expected: lines[0].to_string(),
            });
        }

        self.label = Some(lines[1].to_string());

        let meta: Vec<&str> = lines[2].split_whitespace().collect();
        if meta.len() != 5 {
            return Err(WalletError::Format(
                "invalid wallet metadata line".to_string(),
            ));
        }
        self.header_seed_id = Some(meta[0].to_uppercase());
        self.key_id = Some(meta[1].to_uppercase());
        let bit_len: u32 = meta[2]
            .parse()
            .map_err(|_| WalletError::Format(format!("{}: bad seed length field", meta[2])))?;
        if !is_valid_seed_bit_len(bit_len) {
            return Err(WalletError::SeedLength(format!("{bit_len} bits")));
        }
        self.header_bit_len = Some(bit_len);
        self.pw_status = Some(meta[3].to_string());
        self.timestamp = Some(meta[4].to_string());

        let hp: Vec<&str> = lines[3].split_whitespace().collect();
        if hp.len() != 4 || !hp[0].ends_with(':') {
            return Err(WalletError::Format(
                "invalid hash preset line".to_string(),
            ));
        }
        let preset = HashPreset::from_name(&hp[0][..hp[0].len() - 1])?;
        let params: Vec<u32> = hp[1..]
            .iter()
            .map(|s| s.parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|_| WalletError::Format("bad hash preset parameters".to_string()))?;
        let (n, r, p) = preset.params();
        if params != [n as u32, r, p] {
            return Err(WalletError::Format(format!(
                "hash parameters {params:?} don't match hash preset '{}'",
                preset.name
            )));
        }
        self.hash_preset = Some(preset);

        for (line, field) in [(lines[4], "salt"), (lines[5], "encrypted seed")] {
            let mut tokens = line.split_whitespace();
            let chk = tokens.next().unwrap_or_default();
            let b58_val: String = tokens.collect();
            if b58_val.len() < 22 || b58_val.len() > 44 {
                return Err(WalletError::Format(format!(
                    "invalid format for {field} in wallet data"
                )));
            }
            let computed = chksum6(b58_val.as_bytes());
            if computed != chk {
                return Err(WalletError::Checksum {
                    field: format!("wallet {field}"),
                    computed,
                    expected: chk.to_string(),
                });
            }
            let val = BaseConv::new(BaseId::B58).to_bytes_from_string(&b58_val, Pad::Seed)?;
            match field {
                "salt" => self.salt = Some(val.to_vec()),
                _ => self.enc_seed = Some(val.to_vec()),
            }
        }

        if self.salt.as_ref().map(Vec::len) != Some(SALT_LEN) {
            return Err(WalletError::Format("bad salt length".to_string()));
        }
        if self.enc_seed.as_ref().map(Vec::len) != Some(bit_len as usize / 8) {
            return Err(WalletError::Format(
                "encrypted seed length does not match header".to_string(),
            ));
        }
        Ok(())
    }

    fn decrypt(&mut self, params: &UnlockParams) -> WalletResult<()> {
        let salt = self
            .salt
            .as_ref()
            .ok_or_else(|| WalletError::Validation("wallet not deformatted".to_string()))?;
        let enc_seed = self.enc_seed.as_ref().expect("deformat sets enc_seed");
        let preset = self.hash_preset.expect("deformat sets hash preset");

        let key = make_key(
            params.passphrase.expose_secret().as_bytes(),
            salt,
            &preset,
            &params.kdf_policy,
        )?;
        let dec = decrypt_seed(
            enc_seed,
            &key,
            self.header_seed_id.as_deref(),
            self.key_id.as_deref(),
        )?;
        let seed = Seed::new(&dec)?;
        if let Some(bits) = self.header_bit_len {
            assert!(seed.bit_len() == bits, "decrypted seed length mismatch");
        }
        log::info!("valid native wallet for Seed ID {}", seed.id());
        self.seed = Some(seed);
        Ok(())
    }

    fn filename(&self) -> WalletResult<String> {
        let seed = self.seed()?;
        let preset = self
            .hash_preset
            .ok_or_else(|| WalletError::Validation("wallet not encrypted".to_string()))?;
        Ok(format!(
            "{}-{}[{},{}].{}",
            seed.id(),
            self.key_id.as_deref().unwrap_or_default(),
            seed.bit_len(),
            preset.name,
            self.info().ext.expect("native wallet has an extension")
        ))
    }

    fn seed(&self) -> WalletResult<&Seed> {
        self.seed
            .as_ref()
            .ok_or_else(|| WalletError::Validation("no seed available".to_string()))
    }
}

/// Re-encrypt an existing wallet record under a new passphrase (and
/// optionally a new hash preset/label) without altering the seed.
pub fn change_passphrase(
    raw: &[u8],
    old: &UnlockParams,
    new: &EncryptParams,
) -> WalletResult<(Vec<u8>, String)> {
    let mut wallet = NativeWallet::default();
    wallet.deformat(raw)?;
    wallet.decrypt(old)?;
    let seed = wallet.seed()?.clone();
    let old_label = wallet.label().map(str::to_string);

    let mut fresh = NativeWallet::default();
    fresh.encrypt(&seed, new)?;
    if new.label.is_none() {
        fresh.label = old_label;
    }
    Ok((fresh.format()?, fresh.filename()?))
}
