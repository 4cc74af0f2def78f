//! End-to-end flows across the whole storage engine: seed creation,
//! container conversions, splitting, and hidden-wallet round trips
//! through real files.

use anyhow::Result;
use secrecy::SecretString;
use tempfile::TempDir;

use quartz_wallet_core::{
    entropy::write_random_bytes,
    join_shares, read_hidden_wallet, read_wallet, split_seed, unlock_with_retry,
    wallet::WalletContainer,
    write_hidden_wallet, write_wallet, EncryptParams, HashPreset, HiddenLocation,
    PassphraseSource, RandomSource, Seed, SplitSpec, UnlockParams, Wallet, WalletError,
    WalletKind,
};

fn secret(s: &str) -> SecretString {
    SecretString::from(s.to_string())
}

fn enc_params(pw: &str) -> EncryptParams {
    EncryptParams::new(secret(pw), HashPreset::from_name("1").unwrap())
}

fn unlock_params(pw: &str) -> UnlockParams {
    UnlockParams::new(secret(pw)).with_hash_preset(HashPreset::from_name("1").unwrap())
}

#[test]
fn new_seed_through_every_unencrypted_format() -> Result<()> {
    let seed = Seed::generate(256, &RandomSource::new())?;
    let sid = seed.id().clone();

    for kind in [
        WalletKind::Words,
        WalletKind::Bip39,
        WalletKind::SeedFile,
        WalletKind::HexSeed,
        WalletKind::PlainHex,
        WalletKind::Dieroll,
    ] {
        let (raw, filename) = write_wallet(kind, &seed, &enc_params(""))?;
        assert!(
            filename.starts_with(sid.as_str()),
            "{kind:?}: filename {filename} should start with the Seed ID"
        );
        let back = read_wallet(kind, &raw, &unlock_params(""))?;
        assert_eq!(back.id(), &sid, "{kind:?}: Seed ID changed in round trip");
        assert_eq!(back, seed, "{kind:?}: seed bytes changed in round trip");
    }
    Ok(())
}

#[test]
fn native_wallet_file_lifecycle() -> Result<()> {
    let dir = TempDir::new()?;
    let seed = Seed::generate(192, &RandomSource::new())?;

    let params = enc_params("a strong passphrase").with_label("Integration");
    let (raw, filename) = write_wallet(WalletKind::Native, &seed, &params)?;
    let path = dir.path().join(&filename);
    std::fs::write(&path, &raw)?;

    let loaded = std::fs::read(&path)?;
    let back = read_wallet(WalletKind::Native, &loaded, &unlock_params("a strong passphrase"))?;
    assert_eq!(back, seed);

    assert_eq!(
        read_wallet(WalletKind::Native, &loaded, &unlock_params("wrong")).unwrap_err(),
        WalletError::WrongPassphrase
    );
    Ok(())
}

#[test]
fn wallet_conversion_preserves_identity() -> Result<()> {
    // native wallet -> seed -> incognito -> seed -> mnemonic
    let seed = Seed::generate(128, &RandomSource::new())?;

    let (native_raw, _) = write_wallet(WalletKind::Native, &seed, &enc_params("pw one"))?;
    let from_native = read_wallet(WalletKind::Native, &native_raw, &unlock_params("pw one"))?;

    let (incog_raw, _) = write_wallet(WalletKind::Incog, &from_native, &enc_params("pw two"))?;
    let from_incog = read_wallet(WalletKind::Incog, &incog_raw, &unlock_params("pw two"))?;

    let (mn_raw, _) = write_wallet(WalletKind::Words, &from_incog, &enc_params(""))?;
    let final_seed = read_wallet(WalletKind::Words, &mn_raw, &unlock_params(""))?;

    assert_eq!(final_seed, seed);
    Ok(())
}

#[test]
fn split_shares_survive_container_round_trips() -> Result<()> {
    let seed = Seed::generate(256, &RandomSource::new())?;
    let spec = SplitSpec::new(Some("offsite"), 3, None)?;
    let list = split_seed(&seed, &spec)?;

    // persist each share as a checksummed seed file, read back, join
    let mut recovered = Vec::new();
    for share in list.shares() {
        let (raw, _) = write_wallet(WalletKind::SeedFile, share.seed(), &enc_params(""))?;
        recovered.push(read_wallet(WalletKind::SeedFile, &raw, &unlock_params(""))?);
    }
    recovered.reverse();
    assert_eq!(join_shares(&recovered)?, seed);
    Ok(())
}

#[test]
fn hidden_wallet_full_flow() -> Result<()> {
    let dir = TempDir::new()?;
    let host = dir.path().join("vacation.jpg");
    write_random_bytes(&host, 50_000, 4)?;

    let seed = Seed::generate(256, &RandomSource::new())?;
    let loc = HiddenLocation::new(&host, 31_337);

    let incog_id = write_hidden_wallet(&loc, &seed, &enc_params("hidden pw"))?;
    assert_eq!(incog_id.len(), 8);

    let back = read_hidden_wallet(
        &loc,
        &unlock_params("hidden pw").with_seed_bit_len(256),
    )?;
    assert_eq!(back, seed);

    // reading from the wrong offset yields garbage, reported ambiguously
    let wrong = HiddenLocation::new(&host, 10);
    let err = read_hidden_wallet(&wrong, &unlock_params("hidden pw").with_seed_bit_len(256))
        .unwrap_err();
    assert_eq!(err, WalletError::WrongPassphrase);
    Ok(())
}

#[test]
fn interactive_retry_recovers_but_file_source_is_fatal() -> Result<()> {
    let seed = Seed::generate(128, &RandomSource::new())?;
    let (raw, _) = write_wallet(WalletKind::Native, &seed, &enc_params("sesame"))?;

    let mut wallet = Wallet::new(WalletKind::Native);
    wallet.deformat(&raw)?;
    let attempts = ["wrong one", "wrong two", "sesame"];
    unlock_with_retry(&mut wallet, PassphraseSource::Interactive, |n| {
        attempts.get(n as usize).map(|pw| unlock_params(pw))
    })?;
    assert_eq!(wallet.seed()?, &seed);

    let mut wallet = Wallet::new(WalletKind::Native);
    wallet.deformat(&raw)?;
    let err = unlock_with_retry(&mut wallet, PassphraseSource::File, |_| {
        Some(unlock_params("wrong"))
    })
    .unwrap_err();
    assert_eq!(err, WalletError::WrongPassphrase);
    Ok(())
}

#[test]
fn user_entropy_does_not_weaken_seed_generation() -> Result<()> {
    use quartz_wallet_core::UserEntropy;
    use std::time::Duration;

    let user = UserEntropy::from_keystrokes(
        "asdfjkl;",
        &[Duration::from_millis(101), Duration::from_millis(87)],
    );
    let source = RandomSource::with_user_entropy(user);
    let a = Seed::generate(256, &source)?;
    let b = Seed::generate(256, &source)?;
    assert_ne!(a, b);
    assert_eq!(a.bit_len(), 256);
    Ok(())
}
