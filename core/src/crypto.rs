//! Passphrase key derivation and the symmetric cipher used by every
//! wallet container, plus the checksum primitives that identify seeds,
//! keys and record fields.

use aes::cipher::{KeyIvInit, StreamCipher};
use aes::Aes256;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::errors::{WalletError, WalletResult};

type Aes256Ctr = ctr::Ctr128BE<Aes256>;
type HmacSha256 = Hmac<Sha256>;

pub const SALT_LEN: usize = 16;
pub const AESCTR_IV_LEN: usize = 16;
pub const INCOG_CHK_LEN: usize = 8;
pub const SEAL_SALT_LEN: usize = 32;
pub const SEAL_NONCE_LEN: usize = 32;
pub const KEY_LEN: usize = 32;

const SCRAMBLE_HASH_ROUNDS: usize = 10;

/// Largest scrypt cost exponent the portable backend accepts. Restricted
/// scrypt implementations cannot go above N = 2^14 at r = 8.
pub const PORTABLE_SCRYPT_MAX_EXP: u8 = 14;

/// Default AES-CTR initial counter block: the value 1, big-endian.
pub const DFL_IV: [u8; AESCTR_IV_LEN] = {
    let mut iv = [0u8; AESCTR_IV_LEN];
    iv[AESCTR_IV_LEN - 1] = 1;
    iv
};

/// A named scrypt cost preset. `log_n` is the cost exponent (N = 2^log_n).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashPreset {
    pub name: &'static str,
    pub log_n: u8,
    pub r: u32,
    pub p: u32,
}

pub const HASH_PRESETS: [HashPreset; 7] = [
    HashPreset { name: "1", log_n: 12, r: 8, p: 1 },
    HashPreset { name: "2", log_n: 13, r: 8, p: 4 },
    HashPreset { name: "3", log_n: 14, r: 8, p: 8 },
    HashPreset { name: "4", log_n: 15, r: 8, p: 12 },
    HashPreset { name: "5", log_n: 16, r: 8, p: 16 },
    HashPreset { name: "6", log_n: 17, r: 8, p: 20 },
    HashPreset { name: "7", log_n: 18, r: 8, p: 24 },
];

impl HashPreset {
    pub fn from_name(name: &str) -> WalletResult<Self> {
        HASH_PRESETS
            .iter()
            .find(|p| p.name == name)
            .copied()
            .ok_or_else(|| {
                WalletError::Validation(format!(
                    "{name:?}: invalid hash preset (valid presets: 1..7)"
                ))
            })
    }

    pub fn params(&self) -> (u8, u32, u32) {
        (self.log_n, self.r, self.p)
    }
}

impl Default for HashPreset {
    fn default() -> Self {
        // Preset '3' is the default cost everywhere a preset is optional.
        HASH_PRESETS[2]
    }
}

impl std::fmt::Display for HashPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

impl std::str::FromStr for HashPreset {
    type Err = WalletError;

    fn from_str(s: &str) -> WalletResult<Self> {
        Self::from_name(s)
    }
}

/// Which scrypt implementation path a passphrase hash runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfBackend {
    /// Capped at `PORTABLE_SCRYPT_MAX_EXP`.
    Portable,
    /// Full scrypt, any supported exponent.
    Unrestricted,
}

/// Caller policy for KDF backend selection.
#[derive(Debug, Clone, Copy, Default)]
pub struct KdfPolicy {
    /// Route every hash through the unrestricted backend even when the
    /// preset would fit the portable one.
    pub force_unrestricted: bool,
}

impl KdfPolicy {
    pub fn backend_for(&self, preset: &HashPreset) -> KdfBackend {
        if self.force_unrestricted || preset.log_n > PORTABLE_SCRYPT_MAX_EXP {
            KdfBackend::Unrestricted
        } else {
            KdfBackend::Portable
        }
    }
}

fn scrypt_run(
    passwd: &[u8],
    salt: &[u8],
    preset: &HashPreset,
    buflen: usize,
) -> WalletResult<Zeroizing<Vec<u8>>> {
    let params = scrypt::Params::new(preset.log_n, preset.r, preset.p, buflen)
        .map_err(|e| WalletError::Crypto(format!("Invalid scrypt params: {e}")))?;
    let mut out = Zeroizing::new(vec![0u8; buflen]);
    scrypt::scrypt(passwd, salt, &params, &mut out)
        .map_err(|e| WalletError::Crypto(format!("KDF failed: {e}")))?;
    Ok(out)
}

/// Hash a passphrase with scrypt under a named cost preset.
///
/// `buflen` is normally `KEY_LEN`; brainwallets use it to derive the seed
/// directly at the seed's byte length.
pub fn hash_passphrase(
    passwd: &[u8],
    salt: &[u8],
    preset: &HashPreset,
    buflen: usize,
    policy: &KdfPolicy,
) -> WalletResult<Zeroizing<Vec<u8>>> {
    match policy.backend_for(preset) {
        KdfBackend::Portable => {
            if preset.log_n > PORTABLE_SCRYPT_MAX_EXP {
                return Err(WalletError::Crypto(format!(
                    "hash preset {} requires the unrestricted scrypt backend",
                    preset.name
                )));
            }
            scrypt_run(passwd, salt, preset, buflen)
        }
        KdfBackend::Unrestricted => scrypt_run(passwd, salt, preset, buflen),
    }
}

/// Derive a 32-byte AES key from a passphrase.
pub fn make_key(
    passwd: &[u8],
    salt: &[u8],
    preset: &HashPreset,
    policy: &KdfPolicy,
) -> WalletResult<Zeroizing<[u8; KEY_LEN]>> {
    let hashed = hash_passphrase(passwd, salt, preset, KEY_LEN, policy)?;
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    key.copy_from_slice(&hashed);
    Ok(key)
}

fn ctr_xor(key: &[u8; KEY_LEN], iv: &[u8; AESCTR_IV_LEN], data: &mut [u8]) {
    let mut cipher = Aes256Ctr::new(key.into(), iv.into());
    cipher.apply_keystream(data);
}

/// Encrypt with AES-256 in counter mode.
///
/// Seed lengths are not multiples of the AES block size, so CTR is the
/// only mode the containers can use. When `verify` is set (the default
/// everywhere but the bulk filler path), the output is immediately
/// decrypted and compared against the input; a mismatch means the cipher
/// primitive itself is broken and the process must not continue.
pub fn encrypt_data(
    data: &[u8],
    key: &[u8; KEY_LEN],
    iv: &[u8; AESCTR_IV_LEN],
    verify: bool,
) -> Vec<u8> {
    let mut enc = data.to_vec();
    ctr_xor(key, iv, &mut enc);

    if verify {
        let mut dec = Zeroizing::new(enc.clone());
        ctr_xor(key, iv, &mut dec);
        assert!(
            dec.as_slice() == data,
            "FATAL: cipher self-test failed: decrypted data does not match original"
        );
    }

    enc
}

/// Decrypt AES-256-CTR data.
pub fn decrypt_data(
    enc_data: &[u8],
    key: &[u8; KEY_LEN],
    iv: &[u8; AESCTR_IV_LEN],
) -> Zeroizing<Vec<u8>> {
    let mut dec = Zeroizing::new(enc_data.to_vec());
    ctr_xor(key, iv, &mut dec);
    dec
}

/// Encrypt a seed under the default counter value.
pub fn encrypt_seed(seed: &[u8], key: &[u8; KEY_LEN]) -> Vec<u8> {
    encrypt_data(seed, key, &DFL_IV, true)
}

/// Decrypt a seed, verifying the key and seed checksums when the caller
/// has them from a wallet header.
///
/// Both failure modes collapse into `WrongPassphrase`: the caller must not
/// learn whether the key or the preset was wrong.
pub fn decrypt_seed(
    enc_seed: &[u8],
    key: &[u8; KEY_LEN],
    seed_id: Option<&str>,
    key_id: Option<&str>,
) -> WalletResult<Zeroizing<Vec<u8>>> {
    log::debug!("checking key");
    if let Some(kid) = key_id {
        if chksum8(key.as_slice()) != kid {
            return Err(WalletError::WrongPassphrase);
        }
    }

    let dec_seed = decrypt_data(enc_seed, key, &DFL_IV);

    if let Some(sid) = seed_id {
        if chksum8(&dec_seed) != sid {
            return Err(WalletError::WrongPassphrase);
        }
        log::debug!("passphrase is OK");
    }

    Ok(dec_seed)
}

/// Scramble seed bytes with a derivation key: HMAC-SHA256 keyed by the
/// seed itself, then a fixed chain of SHA-256 rounds.
pub fn scramble_seed(seed: &[u8], scramble_key: &[u8]) -> Zeroizing<[u8; 32]> {
    let mut mac = HmacSha256::new_from_slice(seed)
        .expect("HMAC accepts keys of any length");
    mac.update(scramble_key);
    let mut buf = Zeroizing::new([0u8; 32]);
    buf.copy_from_slice(&mac.finalize().into_bytes());

    for _ in 0..SCRAMBLE_HASH_ROUNDS {
        let digest = Sha256::digest(buf.as_slice());
        buf.copy_from_slice(&digest);
    }
    buf
}

/// Seal arbitrary bytes into the generic encrypted file container:
/// salt(32) ‖ IV(16) ‖ AES-CTR(sha256(nonce‖data) ‖ nonce(32) ‖ data).
///
/// `random` supplies the salt, IV and nonce so the caller's entropy
/// source (including user-entropy whitening) is honored.
pub fn seal_bytes(
    data: &[u8],
    passphrase: &SecretString,
    preset: &HashPreset,
    policy: &KdfPolicy,
    mut random: impl FnMut(usize) -> Zeroizing<Vec<u8>>,
) -> WalletResult<Vec<u8>> {
    let salt = random(SEAL_SALT_LEN);
    let iv = random(AESCTR_IV_LEN);
    let nonce = random(SEAL_NONCE_LEN);
    assert!(
        salt.len() == SEAL_SALT_LEN && iv.len() == AESCTR_IV_LEN && nonce.len() == SEAL_NONCE_LEN,
        "entropy source returned wrong length"
    );

    log::debug!("sealing {} bytes with hash preset '{}'", data.len(), preset);
    let key = make_key(passphrase.expose_secret().as_bytes(), &salt, preset, policy)?;

    let mut payload = Zeroizing::new(Vec::with_capacity(32 + SEAL_NONCE_LEN + data.len()));
    let mut hasher = Sha256::new();
    hasher.update(&nonce);
    hasher.update(data);
    payload.extend_from_slice(&hasher.finalize());
    payload.extend_from_slice(&nonce);
    payload.extend_from_slice(data);

    let mut iv_arr = [0u8; AESCTR_IV_LEN];
    iv_arr.copy_from_slice(&iv);
    let enc = encrypt_data(&payload, &key, &iv_arr, true);

    let mut out = Vec::with_capacity(SEAL_SALT_LEN + AESCTR_IV_LEN + enc.len());
    out.extend_from_slice(&salt);
    out.extend_from_slice(&iv);
    out.extend_from_slice(&enc);
    Ok(out)
}

/// Open a container produced by `seal_bytes`.
pub fn unseal_bytes(
    data: &[u8],
    passphrase: &SecretString,
    preset: &HashPreset,
    policy: &KdfPolicy,
) -> WalletResult<Zeroizing<Vec<u8>>> {
    let min_len = SEAL_SALT_LEN + AESCTR_IV_LEN + 32 + SEAL_NONCE_LEN;
    if data.len() < min_len {
        return Err(WalletError::Format(format!(
            "{}: encrypted container too short (minimum {} bytes)",
            data.len(),
            min_len
        )));
    }

    let salt = &data[..SEAL_SALT_LEN];
    let mut iv = [0u8; AESCTR_IV_LEN];
    iv.copy_from_slice(&data[SEAL_SALT_LEN..SEAL_SALT_LEN + AESCTR_IV_LEN]);
    let enc = &data[SEAL_SALT_LEN + AESCTR_IV_LEN..];

    let key = make_key(passphrase.expose_secret().as_bytes(), salt, preset, policy)?;
    let dec = decrypt_data(enc, &key, &iv);

    let (stored_hash, rest) = dec.split_at(32);
    let mut hasher = Sha256::new();
    hasher.update(rest);
    if hasher.finalize().as_slice() != stored_hash {
        return Err(WalletError::WrongPassphrase);
    }

    Ok(Zeroizing::new(rest[SEAL_NONCE_LEN..].to_vec()))
}

/// 8-digit upper-case hex checksum: double SHA-256, truncated. Identifies
/// seeds and keys without revealing them.
pub fn chksum8(data: &[u8]) -> String {
    let once = Sha256::digest(data);
    let twice = Sha256::digest(once);
    hex::encode(&twice[..4]).to_uppercase()
}

/// 6-digit lower-case hex checksum over record fields.
pub fn chksum6(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    hex::encode(&digest[..3])
}

/// The public Incognito Wallet ID: single SHA-256 of the IV, truncated.
pub fn iv_chksum(iv: &[u8]) -> String {
    let digest = Sha256::digest(iv);
    hex::encode(&digest[..4]).to_uppercase()
}

pub fn is_chksum6(s: &str) -> bool {
    s.len() == 6 && s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}

pub fn is_chksum8(s: &str) -> bool {
    s.len() == 8 && s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase())
}
