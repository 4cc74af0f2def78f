//! Entropy acquisition: OS randomness, optional whitening with
//! user-supplied keystroke data, and the bulk filler writer used to
//! create host files for hidden wallets.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::{encrypt_data, KEY_LEN};
use crate::errors::WalletResult;

type HmacSha256 = Hmac<Sha256>;

/// Bytes of OS entropy hashed down when creating a new seed.
pub const SEED_ENTROPY_POOL_LEN: usize = 1033;

const FILLER_CHUNK_LEN: usize = 1 << 20;

/// A 32-byte digest of user keystroke content and timing, used to whiten
/// OS entropy. The raw keystrokes are hashed immediately and never stored.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct UserEntropy([u8; 32]);

impl UserEntropy {
    pub fn from_keystrokes(chars: &str, intervals: &[Duration]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(chars.as_bytes());
        for iv in intervals {
            hasher.update(iv.as_nanos().to_be_bytes());
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        UserEntropy(out)
    }
}

impl std::fmt::Debug for UserEntropy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("UserEntropy").field(&"<redacted>").finish()
    }
}

/// Source of randomness for seed creation and container salts/IVs.
///
/// With user entropy installed, every output is the XOR of OS entropy
/// with an HMAC-SHA256 keystream keyed by the user-entropy digest, so the
/// result is never weaker than the OS entropy alone.
#[derive(Debug, Default, Clone)]
pub struct RandomSource {
    user: Option<UserEntropy>,
}

impl RandomSource {
    pub fn new() -> Self {
        Self { user: None }
    }

    pub fn with_user_entropy(user: UserEntropy) -> Self {
        Self { user: Some(user) }
    }

    pub fn has_user_entropy(&self) -> bool {
        self.user.is_some()
    }

    /// Raw OS entropy, unwhitened.
    pub fn os_random(len: usize) -> Zeroizing<Vec<u8>> {
        let mut buf = Zeroizing::new(vec![0u8; len]);
        OsRng.fill_bytes(&mut buf);
        buf
    }

    /// OS entropy, whitened with user entropy when available.
    pub fn get_random(&self, len: usize) -> Zeroizing<Vec<u8>> {
        let mut buf = Self::os_random(len);
        if let Some(user) = &self.user {
            log::debug!("whitening {len} bytes of OS entropy with user entropy");
            whiten(&mut buf, &user.0);
        }
        buf
    }

    /// Entropy pool for a new seed: a wide pull of random data hashed
    /// down to 32 bytes, to be truncated to the seed's byte length.
    pub fn seed_material(&self) -> Zeroizing<[u8; 32]> {
        let pool = self.get_random(SEED_ENTROPY_POOL_LEN);
        let mut out = Zeroizing::new([0u8; 32]);
        out.copy_from_slice(&Sha256::digest(pool.as_slice()));
        out
    }
}

fn whiten(buf: &mut [u8], user_key: &[u8; 32]) {
    for (block_idx, chunk) in buf.chunks_mut(32).enumerate() {
        let mut mac = HmacSha256::new_from_slice(user_key)
            .expect("HMAC accepts keys of any length");
        mac.update(&(block_idx as u64).to_be_bytes());
        let keystream = mac.finalize().into_bytes();
        for (b, k) in chunk.iter_mut().zip(keystream.iter()) {
            *b ^= k;
        }
    }
}

/// Write `nbytes` of cryptographically random filler to a new file at
/// `path`, fanning AES-CTR keystream generation out over `threads`
/// workers. Output is byte-identical to the single-threaded result.
pub fn write_random_bytes(path: &Path, nbytes: u64, threads: usize) -> WalletResult<()> {
    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&RandomSource::os_random(KEY_LEN));
    let ret = write_keystream_file(path, nbytes, threads, &key);
    key.zeroize();
    ret
}

fn keystream_chunk(key: &[u8; KEY_LEN], chunk_idx: u64, len: usize) -> Vec<u8> {
    // chunk length is a multiple of the AES block size, so each chunk
    // starts on a clean counter boundary
    let counter = 1u128 + chunk_idx as u128 * (FILLER_CHUNK_LEN as u128 / 16);
    let zeros = vec![0u8; len];
    encrypt_data(&zeros, key, &counter.to_be_bytes(), false)
}

fn write_keystream_file(
    path: &Path,
    nbytes: u64,
    threads: usize,
    key: &[u8; KEY_LEN],
) -> WalletResult<()> {
    let mut out = File::create(path)?;
    if nbytes == 0 {
        return Ok(());
    }

    let nchunks = nbytes.div_ceil(FILLER_CHUNK_LEN as u64);
    let threads = threads.clamp(1, 8).min(nchunks as usize);

    let next = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::sync_channel::<(u64, Vec<u8>)>(threads * 2);

    std::thread::scope(|scope| -> WalletResult<()> {
        for _ in 0..threads {
            let next = Arc::clone(&next);
            let tx = tx.clone();
            scope.spawn(move || {
                loop {
                    let idx = next.fetch_add(1, Ordering::SeqCst) as u64;
                    if idx >= nchunks {
                        break;
                    }
                    let len = if idx == nchunks - 1 {
                        (nbytes - idx * FILLER_CHUNK_LEN as u64) as usize
                    } else {
                        FILLER_CHUNK_LEN
                    };
                    if tx.send((idx, keystream_chunk(key, idx, len))).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        // chunks may arrive out of order; buffer until the next expected
        // index shows up so file position always matches logical position
        let mut pending: BTreeMap<u64, Vec<u8>> = BTreeMap::new();
        let mut want: u64 = 0;
        for (idx, chunk) in rx {
            pending.insert(idx, chunk);
            while let Some(chunk) = pending.remove(&want) {
                out.write_all(&chunk)?;
                want += 1;
            }
        }
        assert!(
            want == nchunks && pending.is_empty(),
            "filler writer lost chunks"
        );
        Ok(())
    })?;

    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn os_random_produces_distinct_output() {
        let a = RandomSource::os_random(32);
        let b = RandomSource::os_random(32);
        assert_eq!(a.len(), 32);
        assert_ne!(a.as_slice(), b.as_slice());
    }

    #[test]
    fn whitened_output_has_requested_length() {
        let user = UserEntropy::from_keystrokes(
            "wxyz1234",
            &[Duration::from_millis(120), Duration::from_millis(80)],
        );
        let source = RandomSource::with_user_entropy(user);
        for len in [1usize, 31, 32, 33, 100] {
            assert_eq!(source.get_random(len).len(), len);
        }
    }

    #[test]
    fn user_entropy_digest_is_deterministic() {
        let ivs = [Duration::from_millis(10), Duration::from_millis(20)];
        let a = UserEntropy::from_keystrokes("abc", &ivs);
        let b = UserEntropy::from_keystrokes("abc", &ivs);
        let c = UserEntropy::from_keystrokes("abd", &ivs);
        assert_eq!(a.0, b.0);
        assert_ne!(a.0, c.0);
    }

    #[test]
    fn seed_material_is_32_bytes() {
        assert_eq!(RandomSource::new().seed_material().len(), 32);
    }

    #[test]
    fn filler_writer_preserves_count_and_order() {
        let dir = TempDir::new().unwrap();
        let key = [0x5Au8; KEY_LEN];

        // odd size spanning several chunks, not block aligned
        let nbytes = 2 * FILLER_CHUNK_LEN as u64 + 12_345;

        let single = dir.path().join("single.bin");
        let pooled = dir.path().join("pooled.bin");
        write_keystream_file(&single, nbytes, 1, &key).unwrap();
        write_keystream_file(&pooled, nbytes, 4, &key).unwrap();

        let a = std::fs::read(&single).unwrap();
        let b = std::fs::read(&pooled).unwrap();
        assert_eq!(a.len() as u64, nbytes);
        assert_eq!(a, b);
    }

    #[test]
    fn filler_writer_handles_empty_and_tiny_files() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty.bin");
        write_random_bytes(&empty, 0, 4).unwrap();
        assert_eq!(std::fs::metadata(&empty).unwrap().len(), 0);

        let tiny = dir.path().join("tiny.bin");
        write_random_bytes(&tiny, 7, 4).unwrap();
        assert_eq!(std::fs::metadata(&tiny).unwrap().len(), 7);
    }
}
