//! Hidden incognito wallet: the incognito payload written at an
//! arbitrary byte offset inside an unrelated host file or raw device.
//!
//! All I/O is exact and positioned. The host is never appended to or
//! truncated, and both read and write verify that the host is large
//! enough for the payload *before* touching a single byte.

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::crypto::{iv_chksum, AESCTR_IV_LEN};
use crate::errors::{WalletError, WalletResult};
use crate::seed::{Seed, DFL_SEED_BIT_LEN};
use crate::wallet::incog::{incog_data_len, IncogWallet};
use crate::wallet::{EncryptParams, UnlockParams, WalletContainer, WalletKind};

/// Block size for host file scans; cancellation is honored at this
/// granularity.
pub const SCAN_BLOCK_LEN: usize = 1 << 20;

/// A `path,offset` pair locating hidden data inside a host file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiddenLocation {
    pub path: PathBuf,
    pub offset: u64,
}

impl HiddenLocation {
    pub fn new(path: impl AsRef<Path>, offset: u64) -> Self {
        HiddenLocation {
            path: path.as_ref().to_path_buf(),
            offset,
        }
    }
}

impl std::str::FromStr for HiddenLocation {
    type Err = WalletError;

    // commas are allowed in the filename, so split at the last one
    fn from_str(s: &str) -> WalletResult<Self> {
        let (path, offset) = s.rsplit_once(',').ok_or_else(|| {
            WalletError::Validation(format!(
                "{s:?}: invalid hidden wallet location (expected \"filename,offset\")"
            ))
        })?;
        let offset: u64 = offset.parse().map_err(|_| {
            WalletError::Validation(format!("{offset:?}: invalid offset"))
        })?;
        if path.is_empty() {
            return Err(WalletError::Validation(
                "empty filename in hidden wallet location".to_string(),
            ));
        }
        Ok(HiddenLocation::new(path, offset))
    }
}

fn check_valid_offset(loc: &HiddenLocation, data_len: usize, action: &str) -> WalletResult<u64> {
    let size = std::fs::metadata(&loc.path)?.len();
    if size < loc.offset + data_len as u64 {
        return Err(WalletError::Validation(format!(
            "file {:?} has length {}, too short to {} {} bytes of data at offset {}",
            loc.path, size, action, data_len, loc.offset
        )));
    }
    Ok(size)
}

/// Read `data_len` bytes at the location's offset. Fails before opening
/// the file if the host is too small.
pub fn read_hidden(loc: &HiddenLocation, data_len: usize) -> WalletResult<Vec<u8>> {
    check_valid_offset(loc, data_len, "read")?;

    let mut file = OpenOptions::new().read(true).open(&loc.path)?;
    file.seek(SeekFrom::Start(loc.offset))?;
    let mut buf = vec![0u8; data_len];
    file.read_exact(&mut buf)?;
    log::info!(
        "data read from file {:?} at offset {}",
        loc.path,
        loc.offset
    );
    Ok(buf)
}

/// Write a payload at the location's offset with exact positioned I/O.
/// The host file is opened read-write, never created, appended to or
/// truncated, and the bounds check runs before any byte is written.
pub fn write_hidden(loc: &HiddenLocation, payload: &[u8]) -> WalletResult<()> {
    check_valid_offset(loc, payload.len(), "write")?;

    let mut file = OpenOptions::new().read(true).write(true).open(&loc.path)?;
    file.seek(SeekFrom::Start(loc.offset))?;
    file.write_all(payload)?;
    file.flush()?;
    log::info!(
        "data written to file {:?} at offset {}",
        loc.path,
        loc.offset
    );
    Ok(())
}

/// Outcome of a host file scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Offset whose 16 leading bytes checksum to the target Incog ID.
    Found(u64),
    NotFound,
    Canceled,
}

/// Search a host file for hidden incognito data matching a known
/// Incognito Wallet ID.
///
/// Every byte offset is tested. The scan mutates nothing, reports
/// progress after each block, and stops at the next block boundary once
/// `cancel` is set.
pub fn scan_for_incog_id(
    path: &Path,
    incog_id: &str,
    cancel: &AtomicBool,
    mut progress: impl FnMut(u64, u64),
) -> WalletResult<ScanOutcome> {
    let size = std::fs::metadata(path)?.len();
    let mut file = OpenOptions::new().read(true).open(path)?;

    let mut carry: Vec<u8> = Vec::new();
    let mut block = vec![0u8; SCAN_BLOCK_LEN];
    let mut base: u64 = 0;

    loop {
        if cancel.load(Ordering::Relaxed) {
            log::info!("scan canceled at offset {base}");
            return Ok(ScanOutcome::Canceled);
        }

        let nread = file.read(&mut block)?;
        if nread == 0 {
            progress(size, size);
            return Ok(ScanOutcome::NotFound);
        }

        let mut window = carry.clone();
        window.extend_from_slice(&block[..nread]);
        let carry_len = carry.len() as u64;

        if window.len() >= AESCTR_IV_LEN {
            for i in 0..=window.len() - AESCTR_IV_LEN {
                if iv_chksum(&window[i..i + AESCTR_IV_LEN]) == incog_id {
                    let offset = base - carry_len + i as u64;
                    log::info!("Incog ID {incog_id} found at offset {offset}");
                    return Ok(ScanOutcome::Found(offset));
                }
            }
        }

        base += nread as u64;
        progress(base.min(size), size);

        let keep = window.len().min(AESCTR_IV_LEN - 1);
        carry = window[window.len() - keep..].to_vec();
    }
}

/// Incognito wallet bound to a hidden location.
#[derive(Default)]
pub struct HiddenIncogWallet {
    inner: Option<IncogWallet>,
    location: Option<HiddenLocation>,
}

impl HiddenIncogWallet {
    pub fn with_location(loc: HiddenLocation) -> Self {
        HiddenIncogWallet {
            inner: None,
            location: Some(loc),
        }
    }

    pub fn location(&self) -> Option<&HiddenLocation> {
        self.location.as_ref()
    }

    pub fn incog_id(&self) -> Option<&str> {
        self.inner.as_ref().and_then(|w| w.incog_id())
    }

    fn inner_mut(&mut self) -> &mut IncogWallet {
        self.inner
            .get_or_insert_with(|| IncogWallet::new(WalletKind::Incog))
    }
}

impl WalletContainer for HiddenIncogWallet {
    fn kind(&self) -> WalletKind {
        WalletKind::IncogHidden
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
        let inner = self
            .inner
            .as_ref()
            .ok_or_else(|| WalletError::Validation("wallet not encrypted".to_string()))?;
        let payload = inner.format()?;
        let seed = inner.seed()?;
        let target = incog_data_len(seed.bit_len());
        assert!(
            payload.len() == target,
            "formatted hidden incognito data has wrong length"
        );
        Ok(payload)
    }

    fn filename(&self) -> WalletResult<String> {
        Err(WalletError::Validation(
            "hidden incognito data lives inside a host file and has no filename of its own"
                .to_string(),
        ))
    }

    fn seed(&self) -> WalletResult<&Seed> {
        self.inner
            .as_ref()
            .ok_or_else(|| WalletError::Validation("no seed available".to_string()))?
            .seed()
    }
}

/// Read pipeline for a hidden wallet: bounds-check, positioned read,
/// deformat, decrypt.
pub fn read_hidden_wallet(
    loc: &HiddenLocation,
    params: &UnlockParams,
) -> WalletResult<Seed> {
    let bits = params.seed_bit_len.unwrap_or(DFL_SEED_BIT_LEN);
    let raw = read_hidden(loc, incog_data_len(bits))?;

    let mut wallet = HiddenIncogWallet::with_location(loc.clone());
    wallet.deformat(&raw)?;
    wallet.decrypt(params)?;
    Ok(wallet.seed()?.clone())
}

/// Write pipeline for a hidden wallet: encrypt, format, bounds-check,
/// positioned write. Returns the Incognito Wallet ID.
pub fn write_hidden_wallet(
    loc: &HiddenLocation,
    seed: &Seed,
    params: &EncryptParams,
) -> WalletResult<String> {
    let mut wallet = HiddenIncogWallet::with_location(loc.clone());
    wallet.encrypt(seed, params)?;
    let payload = wallet.format()?;
    write_hidden(loc, &payload)?;
    Ok(wallet
        .incog_id()
        .expect("encrypt sets the incog ID")
        .to_string())
}
