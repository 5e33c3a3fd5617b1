//! The domain cache.
//!
//! The cache maps domain names to a [`DomainEntry`] holding all resource
//! records cached for that name plus the set of lookups interested in
//! changes to the name. Entries live in a slab and are referred to by
//! [`DomainId`] tokens which carry a generation so that a token of a removed
//! entry never matches an entry created later in the same slot.
//!
//! Records are removed by a periodic sweep. A record without a deletion
//! time gets one during the sweep that first sees it and is removed by the
//! next one. Records that are dead, not current, or expired are removed
//! right away. An entry that was already empty before the sweep and has no
//! interested lookups is removed, too.

use super::lookup::LookupId;
use crate::base::iana::Rtype;
use crate::base::name;
use crate::base::record::ResourceRecord;
use std::collections::{HashMap, HashSet};
use tracing::trace;

//------------ Configuration Constants ----------------------------------------

/// The maximum number of CNAME records followed for a single name.
pub const MAX_CNAME_CHAIN: usize = 8;

//------------ DomainId ------------------------------------------------------

/// A token referring to a domain entry.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct DomainId {
    index: usize,
    generation: u64,
}

//------------ DomainEntry ---------------------------------------------------

/// The cached state for a single domain name.
#[derive(Clone, Debug, Default)]
pub struct DomainEntry {
    /// The normalized domain name.
    name: String,

    /// All records for the name in the order they were added.
    records: Vec<ResourceRecord>,

    /// The lookups to notify when records for the name change.
    interest: HashSet<LookupId>,
}

impl DomainEntry {
    fn new(name: String) -> Self {
        DomainEntry {
            name,
            records: Vec::new(),
            interest: HashSet::new(),
        }
    }

    /// Returns the domain name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns all records of the entry.
    pub fn records(&self) -> &[ResourceRecord] {
        &self.records
    }

    /// Returns an iterator over the interested lookups.
    pub fn interested(&self) -> impl Iterator<Item = LookupId> + '_ {
        self.interest.iter().copied()
    }

    /// Returns whether the entry can be dropped.
    fn is_unused(&self) -> bool {
        self.records.is_empty() && self.interest.is_empty()
    }
}

//------------ Slot ----------------------------------------------------------

#[derive(Clone, Debug, Default)]
struct Slot {
    generation: u64,
    entry: Option<DomainEntry>,
}

//------------ SweepReport ---------------------------------------------------

/// What a sweep has removed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SweepReport {
    /// The number of records removed.
    pub records: usize,

    /// The number of domain entries removed.
    pub domains: usize,
}

//------------ DomainCache ---------------------------------------------------

/// The cache of resource records keyed by domain name.
///
/// All names given to the methods are normalized first.
#[derive(Clone, Debug, Default)]
pub struct DomainCache {
    slots: Vec<Slot>,
    free: Vec<usize>,
    names: HashMap<String, DomainId>,
}

impl DomainCache {
    /// Creates a new, empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of domain entries.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns whether there are no domain entries at all.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns whether any domain entry holds records.
    pub fn has_records(&self) -> bool {
        self.entries().any(|entry| !entry.records.is_empty())
    }

    /// Returns the token for the entry of `name` if there is one.
    pub fn id(&self, name: &str) -> Option<DomainId> {
        self.names.get(&name::normalize(name)).copied()
    }

    /// Returns the entry for a token if it is still valid.
    pub fn get(&self, id: DomainId) -> Option<&DomainEntry> {
        let slot = self.slots.get(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    fn get_mut(&mut self, id: DomainId) -> Option<&mut DomainEntry> {
        let slot = self.slots.get_mut(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_mut()
    }

    /// Returns the entry for `name` if there is one.
    pub fn entry(&self, name: &str) -> Option<&DomainEntry> {
        self.id(name).and_then(|id| self.get(id))
    }

    /// Returns the token for the entry of `name`, creating it if necessary.
    pub fn locate(&mut self, name: &str) -> DomainId {
        let name = name::normalize(name);
        if let Some(id) = self.names.get(&name) {
            return *id;
        }
        let entry = DomainEntry::new(name.clone());
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.entry = Some(entry);
                DomainId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                DomainId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        };
        self.names.insert(name, id);
        id
    }

    /// Adds a record to the entry of its owner.
    ///
    /// If an equal record is already cached, it is refreshed with the
    /// times of the new record instead.
    pub fn add(&mut self, record: ResourceRecord) -> DomainId {
        let id = self.locate(record.owner());
        if let Some(entry) = self.get_mut(id) {
            let existing = entry.records.iter_mut().find(|item| {
                item.is_current()
                    && item.rtype() == record.rtype()
                    && item.data() == record.data()
                    && item.nxdomain() == record.nxdomain()
            });
            match existing {
                Some(item) => *item = record,
                None => entry.records.push(record),
            }
        }
        id
    }

    /// Returns the usable records of the given type for `name`.
    ///
    /// Negative records for the type are included. The domain entry is
    /// created if it doesn’t exist yet, giving lookups a place to register
    /// their interest before any answer has arrived.
    pub fn lookup(
        &mut self,
        name: &str,
        rtype: Rtype,
        now: u64,
    ) -> Vec<ResourceRecord> {
        let id = self.locate(name);
        match self.get(id) {
            Some(entry) => entry
                .records
                .iter()
                .filter(|rr| rr.rtype() == rtype && rr.is_usable(now))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Removes all records of the given type for `name`.
    ///
    /// This happens when a new answer for the name and type arrives. Returns
    /// the number of records removed.
    pub fn supersede(&mut self, name: &str, rtype: Rtype) -> usize {
        let entry = match self.id(name).and_then(|id| self.get_mut(id)) {
            Some(entry) => entry,
            None => return 0,
        };
        let len = entry.records.len();
        entry.records.retain(|record| record.rtype() != rtype);
        len - entry.records.len()
    }

    /// Marks all records for `name` as not current.
    ///
    /// The records aren’t returned by lookups anymore and are removed by
    /// the next sweep. Returns the number of records affected.
    pub fn invalidate(&mut self, name: &str) -> usize {
        let entry = match self.id(name).and_then(|id| self.get_mut(id)) {
            Some(entry) => entry,
            None => return 0,
        };
        let mut res = 0;
        for record in entry.records.iter_mut().filter(|rr| rr.is_current()) {
            record.set_current(false);
            res += 1;
        }
        res
    }

    /// Registers a lookup’s interest in `name`.
    pub fn register_interest(
        &mut self,
        name: &str,
        lookup: LookupId,
    ) -> DomainId {
        let id = self.locate(name);
        if let Some(entry) = self.get_mut(id) {
            entry.interest.insert(lookup);
        }
        id
    }

    /// Removes a lookup’s interest from the given entries.
    ///
    /// Tokens of entries that have been removed in the meantime are
    /// ignored.
    pub fn release_interest(&mut self, domains: &[DomainId], lookup: LookupId) {
        for id in domains {
            if let Some(entry) = self.get_mut(*id) {
                entry.interest.remove(&lookup);
            }
        }
    }

    /// Returns the lookups interested in `name`.
    pub fn interested(&self, name: &str) -> Vec<LookupId> {
        match self.entry(name) {
            Some(entry) => entry.interested().collect(),
            None => Vec::new(),
        }
    }

    /// Sweeps the cache at time `now`.
    ///
    /// Afterwards, every record left has a deletion time after `now`.
    pub fn sweep(&mut self, now: u64) -> SweepReport {
        let mut report = SweepReport::default();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let entry = match slot.entry.as_mut() {
                Some(entry) => entry,
                None => continue,
            };
            let was_empty = entry.records.is_empty();
            let len = entry.records.len();
            entry.records.retain_mut(|record| {
                if record.delete_time() == 0 {
                    record.set_delete_time(now + 1);
                    true
                } else {
                    record.is_current()
                        && !record.is_dead()
                        && !record.is_expired(now)
                }
            });
            report.records += len - entry.records.len();

            if was_empty && entry.is_unused() {
                trace!("dropping domain entry {}", entry.name);
                self.names.remove(&entry.name);
                slot.entry = None;
                slot.generation += 1;
                self.free.push(index);
                report.domains += 1;
            }
        }
        report
    }

    /// Returns an iterator over all domain entries.
    pub fn entries(&self) -> impl Iterator<Item = &DomainEntry> + '_ {
        self.slots.iter().filter_map(|slot| slot.entry.as_ref())
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::record::{RecordData, Section};
    use std::net::Ipv4Addr;

    fn a_record(
        owner: &str,
        last: u8,
        expire: u64,
        delete: u64,
    ) -> ResourceRecord {
        let mut res = ResourceRecord::new(
            owner,
            RecordData::A(Ipv4Addr::new(192, 0, 2, last)),
            Section::Answer,
        );
        res.set_times(expire, delete);
        res
    }

    #[test]
    fn add_and_lookup() {
        let mut cache = DomainCache::new();
        cache.add(a_record("example.com", 1, 100, 100));
        cache.add(a_record("example.com", 2, 100, 100));
        cache.add(ResourceRecord::negative(
            "example.com",
            Rtype::AAAA,
            false,
            100,
        ));
        assert_eq!(cache.lookup("Example.COM.", Rtype::A, 10).len(), 2);
        assert_eq!(cache.lookup("example.com", Rtype::AAAA, 10).len(), 1);
        assert!(cache.lookup("example.com", Rtype::MX, 10).is_empty());
        assert!(cache.lookup("example.com", Rtype::A, 100).is_empty());

        // The miss created an entry.
        assert!(cache.lookup("other.example", Rtype::A, 10).is_empty());
        assert!(cache.entry("other.example").is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn add_refreshes_equal_record() {
        let mut cache = DomainCache::new();
        cache.add(a_record("example.com", 1, 100, 100));
        cache.add(a_record("example.com", 1, 200, 200));
        let records = cache.lookup("example.com", Rtype::A, 150);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].expire_time(), 200);
    }

    #[test]
    fn supersede_and_invalidate() {
        let mut cache = DomainCache::new();
        cache.add(a_record("example.com", 1, 100, 100));
        let mut txt = ResourceRecord::new(
            "example.com",
            RecordData::Txt("hi".into()),
            Section::Answer,
        );
        txt.set_times(100, 100);
        cache.add(txt);

        assert_eq!(cache.supersede("example.com", Rtype::A), 1);
        assert!(cache.lookup("example.com", Rtype::A, 0).is_empty());
        assert_eq!(cache.lookup("example.com", Rtype::TXT, 0).len(), 1);
        assert_eq!(cache.supersede("nosuch.example", Rtype::A), 0);

        assert_eq!(cache.invalidate("example.com"), 1);
        assert!(cache.lookup("example.com", Rtype::TXT, 0).is_empty());
        assert_eq!(cache.sweep(0).records, 1);
    }

    #[test]
    fn sweep_removes_in_two_rounds() {
        let mut cache = DomainCache::new();
        cache.add(a_record("example.com", 1, 100, 50));
        let id = cache.id("example.com").unwrap();

        let report = cache.sweep(60);
        assert_eq!(report, SweepReport { records: 1, domains: 0 });
        assert!(cache.get(id).unwrap().records().is_empty());

        let report = cache.sweep(61);
        assert_eq!(report, SweepReport { records: 0, domains: 1 });
        assert!(cache.get(id).is_none());
        assert!(cache.is_empty());

        // A new entry reusing the slot doesn’t match the old token.
        let new_id = cache.locate("other.example");
        assert_ne!(id, new_id);
        assert!(cache.get(id).is_none());
    }

    #[test]
    fn sweep_defers_records_without_delete_time() {
        let mut cache = DomainCache::new();
        cache.add(a_record("example.com", 1, 10_000, 0));
        cache.add(a_record("example.com", 2, 10_000, 400));
        cache.add(a_record("example.com", 3, 100, 400));

        let report = cache.sweep(300);
        assert_eq!(report.records, 1);
        for record in cache.entry("example.com").unwrap().records() {
            assert!(record.delete_time() == 0 || record.delete_time() > 300);
        }

        let report = cache.sweep(600);
        assert_eq!(report.records, 2);
        assert!(!cache.has_records());
    }

    #[test]
    fn sweep_keeps_entries_with_interest() {
        let mut cache = DomainCache::new();
        let lookup = LookupId::from_int(7);
        let id = cache.register_interest("example.com", lookup);
        cache.sweep(10);
        cache.sweep(20);
        assert!(cache.get(id).is_some());
        assert_eq!(cache.interested("example.com"), vec![lookup]);

        cache.release_interest(&[id], lookup);
        cache.sweep(30);
        assert!(cache.get(id).is_none());
    }

    #[test]
    fn dead_records_are_swept() {
        let mut cache = DomainCache::new();
        cache.add(a_record("example.com", 1, 1000, 1000));
        let id = cache.id("example.com").unwrap();
        if let Some(entry) = cache.get_mut(id) {
            entry.records[0].kill();
        }
        assert_eq!(cache.sweep(1).records, 1);
    }
}
