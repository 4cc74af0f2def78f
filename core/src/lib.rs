// lib.rs - Seed lifecycle and wallet storage engine

pub mod baseconv;
pub mod crypto;
pub mod entropy;
pub mod errors;
pub mod mnemonic;
pub mod seed;
pub mod split;
pub mod wallet;
pub mod wordlist;

// Re-export common types
pub use baseconv::{BaseConv, BaseId, Pad};
pub use crypto::{HashPreset, KdfBackend, KdfPolicy, HASH_PRESETS};
pub use entropy::{RandomSource, UserEntropy};
pub use errors::{WalletError, WalletResult};
pub use mnemonic::MnemonicFormat;
pub use seed::{Seed, SeedId, Subseed, SubseedForm, SubseedIdx, SubseedList};
pub use split::{
    join_shares, join_shares_with_master, split_seed, SeedShare, SeedShareList, ShareKind,
    SplitSpec, SplitSpecifier,
};
pub use wallet::hidden::{
    read_hidden_wallet, scan_for_incog_id, write_hidden_wallet, HiddenLocation, ScanOutcome,
};
pub use wallet::{
    format_by_code, format_by_ext, format_info, read_wallet, unlock_with_retry, write_wallet,
    EncryptParams, PassphraseSource, UnlockParams, Wallet, WalletContainer, WalletKind,
};
