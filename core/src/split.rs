//! N-of-N seed splitting over an additive one-time-pad scheme.
//!
//! Shares 1..N-1 are pseudorandom derivations of the parent seed; the
//! final share is the XOR remainder, so folding all shares together in
//! any order reconstructs the parent exactly. One share may instead be a
//! "master share" bound to a fixed index, reusable across splits.

use zeroize::Zeroizing;

use crate::crypto::scramble_seed;
use crate::errors::{WalletError, WalletResult};
use crate::seed::{IdTable, Seed, SeedId};

pub const SHARE_COUNT_MIN: u32 = 2;
pub const SHARE_COUNT_MAX: u32 = 1024;
pub const MASTER_SHARE_MAX_IDX: u32 = 1024;
pub const SHARE_MAX_NONCE: u16 = 1000;

pub const DFL_SPLIT_ID: &str = "default";

const SPLIT_TYPE: &str = "N-of-N";

/// Parameters of one split: a textual split ID, the share count, and an
/// optional master share index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSpec {
    id: String,
    count: u32,
    master_idx: Option<u32>,
}

impl SplitSpec {
    pub fn new(id: Option<&str>, count: u32, master_idx: Option<u32>) -> WalletResult<Self> {
        if !(SHARE_COUNT_MIN..=SHARE_COUNT_MAX).contains(&count) {
            return Err(WalletError::Validation(format!(
                "{count}: share count out of range ({SHARE_COUNT_MIN}..{SHARE_COUNT_MAX})"
            )));
        }
        if let Some(midx) = master_idx {
            if !(1..=MASTER_SHARE_MAX_IDX).contains(&midx) {
                return Err(WalletError::Validation(format!(
                    "{midx}: master share index out of range (1..{MASTER_SHARE_MAX_IDX})"
                )));
            }
        }
        let id = id.unwrap_or(DFL_SPLIT_ID);
        if id.is_empty() {
            return Err(WalletError::Validation(
                "split ID string may not be empty".to_string(),
            ));
        }
        Ok(SplitSpec {
            id: id.to_string(),
            count,
            master_idx,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn master_idx(&self) -> Option<u32> {
        self.master_idx
    }
}

/// A share specifier of the form `idx:count` or `id:idx:count`,
/// identifying one share of one split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSpecifier {
    pub id: String,
    pub idx: u32,
    pub count: u32,
}

impl std::str::FromStr for SplitSpecifier {
    type Err = WalletError;

    fn from_str(s: &str) -> WalletResult<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        let (id, idx_s, count_s) = match parts.as_slice() {
            [id, idx, count] => (*id, *idx, *count),
            [idx, count] => (DFL_SPLIT_ID, *idx, *count),
            _ => {
                return Err(WalletError::Validation(format!(
                    "{s:?}: seed split specifier cannot be parsed"
                )))
            }
        };
        let idx: u32 = idx_s
            .parse()
            .map_err(|_| WalletError::Validation(format!("{idx_s:?}: invalid share index")))?;
        let count: u32 = count_s
            .parse()
            .map_err(|_| WalletError::Validation(format!("{count_s:?}: invalid share count")))?;
        if !(SHARE_COUNT_MIN..=SHARE_COUNT_MAX).contains(&count) {
            return Err(WalletError::Validation(format!(
                "{count}: share count out of range ({SHARE_COUNT_MIN}..{SHARE_COUNT_MAX})"
            )));
        }
        if idx < 1 || idx > count {
            return Err(WalletError::Validation(format!(
                "{idx}: share index greater than share count or zero"
            )));
        }
        Ok(SplitSpecifier {
            id: id.to_string(),
            idx,
            count,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareKind {
    /// Pseudorandom derivation of the parent.
    Ordinary,
    /// Derived from the fixed master index, independent of count and
    /// split ID. The stored value is the reusable base seed.
    Master { master_idx: u32 },
    /// The XOR remainder completing the split.
    Residue,
}

/// One share of a split seed. Shares have their own Seed IDs and are
/// stored/persisted exactly like ordinary seeds.
#[derive(Debug, Clone)]
pub struct SeedShare {
    seed: Seed,
    idx: u32,
    nonce: u16,
    kind: ShareKind,
}

impl SeedShare {
    pub fn seed(&self) -> &Seed {
        &self.seed
    }

    pub fn id(&self) -> &SeedId {
        self.seed.id()
    }

    pub fn idx(&self) -> u32 {
        self.idx
    }

    pub fn kind(&self) -> ShareKind {
        self.kind
    }

    pub fn nonce(&self) -> u16 {
        self.nonce
    }
}

fn derive_share_bytes(
    parent: &Seed,
    id: &str,
    count: u32,
    idx: u32,
    nonce: u16,
    master_idx: Option<u32>,
) -> Zeroizing<Vec<u8>> {
    // field maximums: id: 256 chars, count: 1024, idx: 1024, nonce: 1000
    let mut key = format!("{SPLIT_TYPE}:{id}:").into_bytes();
    key.extend_from_slice(&(count as u16).to_be_bytes());
    key.extend_from_slice(&(idx as u16).to_be_bytes());
    key.extend_from_slice(&nonce.to_be_bytes());
    if let Some(midx) = master_idx {
        key.extend_from_slice(b":master:");
        key.extend_from_slice(&(midx as u16).to_be_bytes());
    }
    let scrambled = scramble_seed(parent.data(), &key);
    Zeroizing::new(scrambled[..parent.byte_len()].to_vec())
}

fn derive_master_base_bytes(parent: &Seed, master_idx: u32, nonce: u16) -> Zeroizing<Vec<u8>> {
    let mut key = b"master_share:".to_vec();
    key.extend_from_slice(&(master_idx as u16).to_be_bytes());
    key.extend_from_slice(&nonce.to_be_bytes());
    let scrambled = scramble_seed(parent.data(), &key);
    Zeroizing::new(scrambled[..parent.byte_len()].to_vec())
}

/// Convert a master share's base seed into the form that participates in
/// a particular split's XOR. Collisions are not avoided here: the derived
/// value is never used as a user-facing identifier.
fn derive_master_joining_bytes(base: &[u8], id: &str, count: u32) -> Zeroizing<Vec<u8>> {
    let mut key = id.as_bytes().to_vec();
    key.push(b':');
    key.extend_from_slice(&(count as u16).to_be_bytes());
    let scrambled = scramble_seed(base, &key);
    Zeroizing::new(scrambled[..base.len()].to_vec())
}

fn xor_fold(acc: &mut [u8], other: &[u8]) {
    assert!(acc.len() == other.len(), "share length mismatch in XOR fold");
    for (a, b) in acc.iter_mut().zip(other.iter()) {
        *a ^= b;
    }
}

/// A complete N-of-N split of a parent seed.
pub struct SeedShareList {
    parent_id: SeedId,
    spec: SplitSpec,
    shares: Vec<SeedShare>,
    nonce_start: u16,
}

impl SeedShareList {
    pub fn parent_id(&self) -> &SeedId {
        &self.parent_id
    }

    pub fn spec(&self) -> &SplitSpec {
        &self.spec
    }

    pub fn count(&self) -> u32 {
        self.spec.count()
    }

    /// The share at a 1-based index.
    pub fn share(&self, idx: u32) -> WalletResult<&SeedShare> {
        self.shares
            .get(idx as usize - 1)
            .ok_or_else(|| WalletError::Validation(format!("{idx}: share index out of range")))
    }

    pub fn shares(&self) -> &[SeedShare] {
        &self.shares
    }

    pub fn master_share(&self) -> Option<&SeedShare> {
        self.shares
            .first()
            .filter(|s| matches!(s.kind, ShareKind::Master { .. }))
    }

    /// Filename stem for one share, encoding its position in the split.
    pub fn share_filename_stem(&self, idx: u32) -> WalletResult<String> {
        let share = self.share(idx)?;
        Ok(match share.kind {
            ShareKind::Master { master_idx } => {
                format!("{}-MASTER{}[{}]", self.parent_id, master_idx, share.id())
            }
            _ => {
                let msdata = match self.spec.master_idx() {
                    Some(midx) => format!("_with_master{midx}"),
                    None => String::new(),
                };
                format!(
                    "{}-{}-{}of{}{}[{}]",
                    self.parent_id,
                    self.spec.id(),
                    idx,
                    self.spec.count(),
                    msdata,
                    share.id()
                )
            }
        })
    }

    /// Reconstruct the parent seed from this list's shares.
    pub fn join(&self) -> WalletResult<Seed> {
        let seeds: Vec<Seed> = self.shares.iter().map(|s| s.seed.clone()).collect();
        match self.spec.master_idx() {
            Some(midx) => join_shares_with_master(&seeds, midx, Some(self.spec.id())),
            None => join_shares(&seeds),
        }
    }

    pub(crate) fn nonce_start(&self) -> u16 {
        self.nonce_start
    }
}

/// Split a seed into `spec.count()` shares.
///
/// The derivation is a pure function of (seed, count, split ID, master
/// index): Seed-ID collisions among the shares are resolved by a
/// deterministic nonce scan, and a collision on the computed final share
/// restarts the whole list with an incremented starting nonce, so an
/// identical split always reproduces identical shares.
pub fn split_seed(parent: &Seed, spec: &SplitSpec) -> WalletResult<SeedShareList> {
    let count = spec.count();

    let master = match spec.master_idx() {
        Some(midx) => Some(make_master_share(parent, midx)?),
        None => None,
    };

    for nonce_start in 0..=SHARE_MAX_NONCE {
        let mut table = IdTable::default();
        let mut shares: Vec<SeedShare> = Vec::with_capacity(count as usize);

        if let Some(ms) = &master {
            table.insert(ms.id().clone(), 1, ms.nonce);
            shares.push(ms.clone());
        }

        let first_idx = if master.is_some() { 2 } else { 1 };
        for idx in first_idx..count {
            let share = make_ordinary_share(parent, spec, idx, nonce_start, &table)?;
            table.insert(share.id().clone(), idx, share.nonce);
            shares.push(share);
        }

        // final share: XOR remainder over the parent and all shares
        // issued so far (the master participates in derived form)
        let mut residue = Zeroizing::new(parent.data().to_vec());
        for share in &shares {
            match share.kind {
                ShareKind::Master { .. } => {
                    let derived = derive_master_joining_bytes(
                        share.seed.data(),
                        spec.id(),
                        count,
                    );
                    xor_fold(&mut residue, &derived);
                }
                _ => xor_fold(&mut residue, share.seed.data()),
            }
        }

        let residue_sid = SeedId::of(&residue);
        if table.contains(&residue_sid) || residue_sid == *parent.id() {
            log::debug!(
                "final share Seed ID collision with {residue_sid}, \
                 incrementing start nonce to {}",
                nonce_start + 1
            );
            continue;
        }

        shares.push(SeedShare {
            seed: Seed::new(&residue)?,
            idx: count,
            nonce: nonce_start,
            kind: ShareKind::Residue,
        });

        let list = SeedShareList {
            parent_id: parent.id().clone(),
            spec: spec.clone(),
            shares,
            nonce_start,
        };
        debug_assert!(list.join()? == *parent, "rejoined seed mismatch");
        return Ok(list);
    }

    Err(WalletError::Validation(
        "share nonce range exceeded".to_string(),
    ))
}

fn make_master_share(parent: &Seed, master_idx: u32) -> WalletResult<SeedShare> {
    for nonce in 0..=SHARE_MAX_NONCE {
        let bytes = derive_master_base_bytes(parent, master_idx, nonce);
        let sid = SeedId::of(&bytes);
        if sid == *parent.id() {
            log::debug!(
                "master share Seed ID collision with parent seed, incrementing nonce to {}",
                nonce + 1
            );
            continue;
        }
        return Ok(SeedShare {
            seed: Seed::new(&bytes)?,
            idx: 1,
            nonce,
            kind: ShareKind::Master { master_idx },
        });
    }
    Err(WalletError::Validation(
        "master share nonce range exceeded".to_string(),
    ))
}

fn make_ordinary_share(
    parent: &Seed,
    spec: &SplitSpec,
    idx: u32,
    nonce_start: u16,
    table: &IdTable,
) -> WalletResult<SeedShare> {
    for nonce in nonce_start..=SHARE_MAX_NONCE {
        let bytes = derive_share_bytes(
            parent,
            spec.id(),
            spec.count(),
            idx,
            nonce,
            spec.master_idx(),
        );
        let sid = SeedId::of(&bytes);
        if table.contains(&sid) || sid == *parent.id() {
            log::debug!(
                "share {idx}: Seed ID collision with {sid}, incrementing nonce to {}",
                nonce + 1
            );
            continue;
        }
        return Ok(SeedShare {
            seed: Seed::new(&bytes)?,
            idx,
            nonce,
            kind: ShareKind::Ordinary,
        });
    }
    Err(WalletError::Validation(
        "share nonce range exceeded".to_string(),
    ))
}

/// Join plain shares: XOR-fold, independent of order.
pub fn join_shares(shares: &[Seed]) -> WalletResult<Seed> {
    let count = shares.len() as u32;
    if !(SHARE_COUNT_MIN..=SHARE_COUNT_MAX).contains(&count) {
        return Err(WalletError::Validation(format!(
            "{count}: invalid number of shares to join"
        )));
    }

    let byte_len = shares[0].byte_len();
    let mut acc = Zeroizing::new(vec![0u8; byte_len]);
    for share in shares {
        if share.byte_len() != byte_len {
            return Err(WalletError::SeedLength(format!(
                "share length mismatch: {} != {}",
                share.bit_len(),
                byte_len * 8
            )));
        }
        xor_fold(&mut acc, share.data());
    }
    Seed::new(&acc)
}

/// Join where the first share is a master share's base seed: the base is
/// first converted to its derived form for (split ID, total count).
pub fn join_shares_with_master(
    shares: &[Seed],
    master_idx: u32,
    id: Option<&str>,
) -> WalletResult<Seed> {
    if !(1..=MASTER_SHARE_MAX_IDX).contains(&master_idx) {
        return Err(WalletError::Validation(format!(
            "{master_idx}: master share index out of range (1..{MASTER_SHARE_MAX_IDX})"
        )));
    }
    if shares.len() < 2 {
        return Err(WalletError::Validation(
            "master share join requires at least two shares".to_string(),
        ));
    }

    let id = id.unwrap_or(DFL_SPLIT_ID);
    let count = shares.len() as u32;
    let derived = derive_master_joining_bytes(shares[0].data(), id, count);

    let mut seeds = vec![Seed::new(&derived)?];
    seeds.extend_from_slice(&shares[1..]);
    join_shares(&seeds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn parent() -> Seed {
        Seed::new(&hex::decode("deadbeef".repeat(4)).unwrap()).unwrap()
    }

    #[test]
    fn spec_validation() {
        assert!(SplitSpec::new(None, 1, None).is_err());
        assert!(SplitSpec::new(None, 1025, None).is_err());
        assert!(SplitSpec::new(None, 2, Some(0)).is_err());
        assert!(SplitSpec::new(None, 2, Some(1025)).is_err());
        assert!(SplitSpec::new(Some(""), 2, None).is_err());
        let spec = SplitSpec::new(None, 3, None).unwrap();
        assert_eq!(spec.id(), "default");
    }

    #[test]
    fn specifier_parsing() {
        let s = SplitSpecifier::from_str("alice:2:3").unwrap();
        assert_eq!((s.id.as_str(), s.idx, s.count), ("alice", 2, 3));
        let d = SplitSpecifier::from_str("1:2").unwrap();
        assert_eq!(d.id, "default");
        assert!(SplitSpecifier::from_str("4:3").is_err());
        assert!(SplitSpecifier::from_str("1").is_err());
        assert!(SplitSpecifier::from_str("a:b:c:d").is_err());
    }

    #[test]
    fn split_and_join_round_trips_for_all_counts() {
        let p = parent();
        for count in 2..=8u32 {
            let spec = SplitSpec::new(None, count, None).unwrap();
            let list = split_seed(&p, &spec).unwrap();
            assert_eq!(list.shares().len(), count as usize);
            assert_eq!(list.join().unwrap(), p);
        }
    }

    #[test]
    fn join_is_order_independent() {
        let p = parent();
        let spec = SplitSpec::new(Some("shuffle"), 5, None).unwrap();
        let list = split_seed(&p, &spec).unwrap();

        let mut seeds: Vec<Seed> = list.shares().iter().map(|s| s.seed().clone()).collect();
        seeds.reverse();
        assert_eq!(join_shares(&seeds).unwrap(), p);
        seeds.swap(0, 2);
        assert_eq!(join_shares(&seeds).unwrap(), p);
    }

    #[test]
    fn split_is_deterministic() {
        let p = parent();
        let spec = SplitSpec::new(Some("repeat"), 4, None).unwrap();
        let a = split_seed(&p, &spec).unwrap();
        let b = split_seed(&p, &spec).unwrap();
        for (x, y) in a.shares().iter().zip(b.shares().iter()) {
            assert_eq!(x.seed(), y.seed());
            assert_eq!(x.nonce(), y.nonce());
        }
    }

    #[test]
    fn distinct_split_ids_produce_distinct_shares() {
        let p = parent();
        let a = split_seed(&p, &SplitSpec::new(Some("alpha"), 3, None).unwrap()).unwrap();
        let b = split_seed(&p, &SplitSpec::new(Some("beta"), 3, None).unwrap()).unwrap();
        assert_ne!(a.share(1).unwrap().seed(), b.share(1).unwrap().seed());
        assert_eq!(a.join().unwrap(), b.join().unwrap());
    }

    #[test]
    fn master_share_split_round_trips() {
        let p = parent();
        let spec = SplitSpec::new(Some("vault"), 4, Some(5)).unwrap();
        let list = split_seed(&p, &spec).unwrap();

        let master = list.master_share().expect("master share present");
        assert_eq!(master.idx(), 1);
        assert!(matches!(master.kind(), ShareKind::Master { master_idx: 5 }));
        assert_eq!(list.join().unwrap(), p);
    }

    #[test]
    fn master_share_is_reusable_across_splits() {
        let p = parent();
        let a = split_seed(&p, &SplitSpec::new(Some("one"), 3, Some(2)).unwrap()).unwrap();
        let b = split_seed(&p, &SplitSpec::new(Some("two"), 5, Some(2)).unwrap()).unwrap();

        // same base seed regardless of split parameters
        assert_eq!(
            a.master_share().unwrap().seed(),
            b.master_share().unwrap().seed()
        );

        // manual join from stored share seeds
        let seeds: Vec<Seed> = b.shares().iter().map(|s| s.seed().clone()).collect();
        assert_eq!(join_shares_with_master(&seeds, 2, Some("two")).unwrap(), p);
    }

    #[test]
    fn join_rejects_length_mismatch_and_bad_counts() {
        let a = Seed::new(&[1u8; 16]).unwrap();
        let b = Seed::new(&[2u8; 32]).unwrap();
        assert!(matches!(
            join_shares(&[a.clone(), b]),
            Err(WalletError::SeedLength(_))
        ));
        assert!(join_shares(&[a]).is_err());
    }

    #[test]
    fn share_filenames_encode_split_position() {
        let p = parent();
        let spec = SplitSpec::new(Some("col"), 3, Some(7)).unwrap();
        let list = split_seed(&p, &spec).unwrap();
        let ms = list.share_filename_stem(1).unwrap();
        assert!(ms.contains("MASTER7"));
        let ord = list.share_filename_stem(2).unwrap();
        assert!(ord.contains("col-2of3_with_master7"));
        assert_eq!(list.nonce_start(), 0);
    }
}
