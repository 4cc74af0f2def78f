//! The root secret and its deterministic descendants.
//!
//! A `Seed` is 16, 24 or 32 bytes of entropy identified by an 8-digit
//! content checksum. Subseeds are derived from a parent seed and an index
//! by scrambling the parent with a derivation key; their identifiers are
//! deduplicated against everything previously issued, so a subseed is a
//! pure function of (parent, index, form) plus the collision history.

use std::collections::HashMap;

use zeroize::Zeroizing;

use crate::crypto::{chksum8, is_chksum8, scramble_seed};
use crate::entropy::RandomSource;
use crate::errors::{WalletError, WalletResult};

pub const SEED_BIT_LENS: [u32; 3] = [128, 192, 256];
pub const DFL_SEED_BIT_LEN: u32 = 256;

pub const SUBSEED_MIN_IDX: u32 = 1;
pub const SUBSEED_MAX_IDX: u32 = 1_000_000;
pub const SUBSEED_MAX_NONCE: u16 = 1000;

/// Default number of subseed index slots scanned when resolving an
/// unknown Seed ID.
pub const SUBSEED_DFL_SCAN_LEN: u32 = 100;

pub fn is_valid_seed_bit_len(bits: u32) -> bool {
    SEED_BIT_LENS.contains(&bits)
}

/// An 8-hex-digit content checksum identifying a seed without revealing
/// it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeedId(String);

impl SeedId {
    pub fn of(data: &[u8]) -> Self {
        SeedId(chksum8(data))
    }

    pub fn parse(s: &str) -> WalletResult<Self> {
        if is_chksum8(s) {
            Ok(SeedId(s.to_string()))
        } else {
            Err(WalletError::Validation(format!(
                "{s:?}: invalid Seed ID (expected 8 upper-case hex digits)"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SeedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The root secret from which all wallet keys derive.
///
/// Immutable once created. Never mutated in place; every derived value
/// (subseed, share, re-encryption) is a fresh `Seed`.
#[derive(Clone)]
pub struct Seed {
    data: Zeroizing<Vec<u8>>,
    sid: SeedId,
}

impl Seed {
    pub fn new(bytes: &[u8]) -> WalletResult<Self> {
        let bits = bytes.len() as u32 * 8;
        if !is_valid_seed_bit_len(bits) {
            return Err(WalletError::SeedLength(format!(
                "{} bytes (valid lengths: 16, 24, 32)",
                bytes.len()
            )));
        }
        Ok(Seed {
            data: Zeroizing::new(bytes.to_vec()),
            sid: SeedId::of(bytes),
        })
    }

    /// Create a new seed from fresh entropy.
    pub fn generate(bit_len: u32, random: &RandomSource) -> WalletResult<Self> {
        if !is_valid_seed_bit_len(bit_len) {
            return Err(WalletError::SeedLength(format!(
                "{bit_len} bits (valid lengths: 128, 192, 256)"
            )));
        }
        let material = random.seed_material();
        Seed::new(&material[..bit_len as usize / 8])
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    pub fn bit_len(&self) -> u32 {
        self.data.len() as u32 * 8
    }

    pub fn id(&self) -> &SeedId {
        &self.sid
    }
}

impl PartialEq for Seed {
    fn eq(&self, other: &Self) -> bool {
        self.data.as_slice() == other.data.as_slice()
    }
}

impl Eq for Seed {}

impl std::fmt::Debug for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Seed")
            .field("sid", &self.sid)
            .field("bit_len", &self.bit_len())
            .field("data", &"<redacted>")
            .finish()
    }
}

/// Long subseeds keep the parent's length; short subseeds are 16 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubseedForm {
    Long,
    Short,
}

impl SubseedForm {
    pub fn letter(&self) -> char {
        match self {
            SubseedForm::Long => 'L',
            SubseedForm::Short => 'S',
        }
    }

    fn byte_len(&self, parent: &Seed) -> usize {
        match self {
            SubseedForm::Long => parent.byte_len(),
            SubseedForm::Short => 16,
        }
    }
}

/// A subseed index with its long/short selector, e.g. `12L` or `7S`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubseedIdx {
    pub idx: u32,
    pub form: SubseedForm,
}

impl std::str::FromStr for SubseedIdx {
    type Err = WalletError;

    fn from_str(s: &str) -> WalletResult<Self> {
        let (num, form) = match s.chars().last() {
            Some('L') | Some('l') => (&s[..s.len() - 1], SubseedForm::Long),
            Some('S') | Some('s') => (&s[..s.len() - 1], SubseedForm::Short),
            _ => (s, SubseedForm::Long),
        };
        let idx: u32 = num.parse().map_err(|_| {
            WalletError::Validation(format!(
                "{s:?}: invalid subseed index (valid format: an integer, plus optional letter 'S', 's', 'L' or 'l')"
            ))
        })?;
        if !(SUBSEED_MIN_IDX..=SUBSEED_MAX_IDX).contains(&idx) {
            return Err(WalletError::Validation(format!(
                "{idx}: subseed index out of range (1..{SUBSEED_MAX_IDX})"
            )));
        }
        Ok(SubseedIdx { idx, form })
    }
}

impl std::fmt::Display for SubseedIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.idx, self.form.letter())
    }
}

/// A seed derived from a parent seed plus an index.
///
/// Carries only a weak back-reference to its parent: the parent's Seed ID
/// and the derivation index, never the parent itself.
#[derive(Debug, Clone)]
pub struct Subseed {
    seed: Seed,
    idx: u32,
    nonce: u16,
    form: SubseedForm,
    parent_id: SeedId,
}

impl Subseed {
    pub fn seed(&self) -> &Seed {
        &self.seed
    }

    pub fn id(&self) -> &SeedId {
        self.seed.id()
    }

    pub fn idx(&self) -> SubseedIdx {
        SubseedIdx {
            idx: self.idx,
            form: self.form,
        }
    }

    pub fn nonce(&self) -> u16 {
        self.nonce
    }

    pub fn parent_id(&self) -> &SeedId {
        &self.parent_id
    }
}

pub(crate) fn derive_subseed_bytes(
    parent: &Seed,
    idx: u32,
    nonce: u16,
    form: SubseedForm,
) -> Zeroizing<Vec<u8>> {
    // field maximums: idx 1,000,000, nonce 1000, short flag 1
    let mut scramble_key = [0u8; 7];
    scramble_key[..4].copy_from_slice(&idx.to_be_bytes());
    scramble_key[4..6].copy_from_slice(&nonce.to_be_bytes());
    scramble_key[6] = matches!(form, SubseedForm::Short) as u8;

    let scrambled = scramble_seed(parent.data(), &scramble_key);
    Zeroizing::new(scrambled[..form.byte_len(parent)].to_vec())
}

/// Insertion-ordered table of issued Seed IDs.
#[derive(Debug, Default, Clone)]
pub(crate) struct IdTable {
    order: Vec<SeedId>,
    map: HashMap<SeedId, (u32, u16)>,
}

impl IdTable {
    pub fn contains(&self, sid: &SeedId) -> bool {
        self.map.contains_key(sid)
    }

    pub fn get(&self, sid: &SeedId) -> Option<(u32, u16)> {
        self.map.get(sid).copied()
    }

    pub fn insert(&mut self, sid: SeedId, idx: u32, nonce: u16) {
        assert!(!self.map.contains_key(&sid), "duplicate Seed ID inserted");
        self.order.push(sid.clone());
        self.map.insert(sid, (idx, nonce));
    }

    pub fn id_at(&self, pos: usize) -> Option<&SeedId> {
        self.order.get(pos)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Lazily generated list of a seed's subseeds, long and short forms in
/// lockstep, with collision-free Seed IDs.
pub struct SubseedList<'a> {
    parent: &'a Seed,
    long: IdTable,
    short: IdTable,
    scan_len: u32,
}

impl<'a> SubseedList<'a> {
    pub fn new(parent: &'a Seed) -> Self {
        Self::with_scan_len(parent, SUBSEED_DFL_SCAN_LEN)
    }

    pub fn with_scan_len(parent: &'a Seed, scan_len: u32) -> Self {
        SubseedList {
            parent,
            long: IdTable::default(),
            short: IdTable::default(),
            scan_len,
        }
    }

    pub fn len(&self) -> u32 {
        self.long.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.long.is_empty()
    }

    /// Generate subseed entries up to `last_idx`. Returns early when
    /// `stop_at` is generated.
    fn generate(&mut self, last_idx: u32, stop_at: Option<&SeedId>) -> WalletResult<()> {
        let first_idx = self.len() + 1;

        for idx in first_idx..=last_idx {
            let hit_long = self.add_entry(idx, SubseedForm::Long)?;
            let hit_short = self.add_entry(idx, SubseedForm::Short)?;
            if let Some(target) = stop_at {
                let hit = |sid: &SeedId| sid == target;
                if hit_long.as_ref().map(&hit).unwrap_or(false)
                    || hit_short.as_ref().map(&hit).unwrap_or(false)
                {
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    fn add_entry(&mut self, idx: u32, form: SubseedForm) -> WalletResult<Option<SeedId>> {
        for nonce in 0..=SUBSEED_MAX_NONCE {
            let sid = SeedId::of(&derive_subseed_bytes(self.parent, idx, nonce, form));
            if self.long.contains(&sid) || self.short.contains(&sid) || sid == *self.parent.id() {
                log::debug!(
                    "subseed {idx}{}: Seed ID collision with {sid}, incrementing nonce to {}",
                    form.letter(),
                    nonce + 1
                );
                continue;
            }
            let table = match form {
                SubseedForm::Long => &mut self.long,
                SubseedForm::Short => &mut self.short,
            };
            table.insert(sid.clone(), idx, nonce);
            return Ok(Some(sid));
        }
        // leaving the tables half-filled would make later results depend
        // on this failure, so give up entirely
        Err(WalletError::Validation(
            "subseed nonce range exceeded".to_string(),
        ))
    }

    /// The subseed at a given index, generating entries as needed.
    pub fn subseed(&mut self, ss_idx: &SubseedIdx) -> WalletResult<Subseed> {
        if ss_idx.idx > self.len() {
            self.generate(ss_idx.idx, None)?;
        }

        let table = match ss_idx.form {
            SubseedForm::Long => &self.long,
            SubseedForm::Short => &self.short,
        };
        let sid = table
            .id_at(ss_idx.idx as usize - 1)
            .cloned()
            .ok_or_else(|| {
                WalletError::Validation(format!("{ss_idx}: subseed index out of range"))
            })?;
        let (idx, nonce) = table.get(&sid).expect("indexed entry present");
        assert!(idx == ss_idx.idx, "subseed table order out of sync");

        let seed = Seed::new(&derive_subseed_bytes(self.parent, idx, nonce, ss_idx.form))?;
        assert!(*seed.id() == sid, "subseed Seed ID mismatch on re-derivation");
        Ok(Subseed {
            seed,
            idx,
            nonce,
            form: ss_idx.form,
            parent_id: self.parent.id().clone(),
        })
    }

    /// Search for the subseed with the given Seed ID, scanning up to
    /// `last_idx` (or the list's scan length) index slots.
    pub fn subseed_by_id(
        &mut self,
        sid: &SeedId,
        last_idx: Option<u32>,
    ) -> WalletResult<Option<Subseed>> {
        let last_idx = last_idx.unwrap_or(self.scan_len);

        let lookup = |list: &Self| -> Option<(u32, u16, SubseedForm)> {
            for form in [SubseedForm::Long, SubseedForm::Short] {
                let table = match form {
                    SubseedForm::Long => &list.long,
                    SubseedForm::Short => &list.short,
                };
                if let Some((idx, nonce)) = table.get(sid) {
                    return Some((idx, nonce, form));
                }
            }
            None
        };

        if lookup(self).is_none() {
            if self.len() >= last_idx {
                return Ok(None);
            }
            self.generate(last_idx, Some(sid))?;
        }

        match lookup(self) {
            Some((idx, _, form)) => {
                log::debug!("found subseed {sid} ({}:{idx}{})", self.parent.id(), form.letter());
                Ok(Some(self.subseed(&SubseedIdx { idx, form })?))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::str::FromStr;

    fn parent() -> Seed {
        Seed::new(&hex::decode("deadbeef".repeat(4)).unwrap()).unwrap()
    }

    #[test]
    fn seed_length_is_validated() {
        assert!(Seed::new(&[0u8; 16]).is_ok());
        assert!(Seed::new(&[0u8; 24]).is_ok());
        assert!(Seed::new(&[0u8; 32]).is_ok());
        for bad in [0usize, 15, 17, 20, 31, 33, 64] {
            assert!(matches!(
                Seed::new(&vec![0u8; bad]),
                Err(WalletError::SeedLength(_))
            ));
        }
    }

    #[test]
    fn seed_id_reference_vectors() {
        assert_eq!(Seed::new(&[0u8; 16]).unwrap().id().as_str(), "81FC4925");
        assert_eq!(parent().id().as_str(), "43670520");
    }

    #[test]
    fn generated_seeds_have_requested_length() {
        let random = RandomSource::new();
        for bits in SEED_BIT_LENS {
            let seed = Seed::generate(bits, &random).unwrap();
            assert_eq!(seed.bit_len(), bits);
        }
        assert!(Seed::generate(100, &random).is_err());
    }

    #[test]
    fn debug_output_redacts_seed_data() {
        let s = format!("{:?}", parent());
        assert!(s.contains("<redacted>"));
        assert!(!s.contains("deadbeef"));
    }

    #[test]
    fn subseed_idx_parsing() {
        let l = SubseedIdx::from_str("12L").unwrap();
        assert_eq!((l.idx, l.form), (12, SubseedForm::Long));
        let s = SubseedIdx::from_str("7s").unwrap();
        assert_eq!((s.idx, s.form), (7, SubseedForm::Short));
        let dfl = SubseedIdx::from_str("3").unwrap();
        assert_eq!(dfl.form, SubseedForm::Long);
        assert!(SubseedIdx::from_str("0").is_err());
        assert!(SubseedIdx::from_str("1000001L").is_err());
        assert!(SubseedIdx::from_str("xL").is_err());
    }

    #[test]
    fn subseed_derivation_is_deterministic() {
        let p = parent();
        let idx = SubseedIdx::from_str("1L").unwrap();
        let a = SubseedList::new(&p).subseed(&idx).unwrap();
        let b = SubseedList::new(&p).subseed(&idx).unwrap();
        assert_eq!(a.seed(), b.seed());
        assert_eq!(a.id().as_str(), "65CB726B");
        assert_eq!(a.parent_id(), p.id());
    }

    #[test]
    fn short_subseeds_are_16_bytes() {
        let p = Seed::new(&[0x42u8; 32]).unwrap();
        let mut list = SubseedList::new(&p);
        let long = list.subseed(&SubseedIdx::from_str("5L").unwrap()).unwrap();
        let short = list.subseed(&SubseedIdx::from_str("5S").unwrap()).unwrap();
        assert_eq!(long.seed().byte_len(), 32);
        assert_eq!(short.seed().byte_len(), 16);
        assert_ne!(long.id(), short.id());
    }

    #[test]
    fn distinct_indexes_yield_distinct_ids() {
        let p = parent();
        let mut list = SubseedList::with_scan_len(&p, 300);
        let mut seen = HashSet::new();
        for i in 1..=300u32 {
            let ss = list
                .subseed(&SubseedIdx { idx: i, form: SubseedForm::Long })
                .unwrap();
            assert!(seen.insert(ss.id().clone()), "duplicate ID at index {i}");
        }
    }

    #[test]
    fn subseed_lookup_by_id() {
        let p = parent();
        let mut list = SubseedList::new(&p);
        let target = list.subseed(&SubseedIdx::from_str("17S").unwrap()).unwrap();
        let target_id = target.id().clone();

        let mut fresh = SubseedList::new(&p);
        let found = fresh.subseed_by_id(&target_id, None).unwrap().unwrap();
        assert_eq!(found.seed(), target.seed());
        assert_eq!(found.idx().idx, 17);

        let missing = SeedId::parse("00000000").unwrap();
        assert!(fresh.subseed_by_id(&missing, Some(20)).unwrap().is_none());
    }
}
