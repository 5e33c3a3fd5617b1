//! Resource records.
//!
//! This module defines the resource record as the resolver keeps it: the
//! decoded record data of the supported types plus the bookkeeping needed
//! for caching, i.e., expiry and deletion times and a few flags.
//!
//! All times are whole seconds since the epoch of the resolver’s clock. A
//! deletion time of zero means that no deletion time has been decided yet.

use super::iana::Rtype;
use core::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

//------------ Section -------------------------------------------------------

/// The message section a record was taken from.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Section {
    /// The answer section.
    Answer,

    /// The authority section.
    Authority,

    /// The additional section.
    Additional,

    /// The record was made up by the resolver, e.g., a negative record.
    Synthesized,
}

//------------ Mx ------------------------------------------------------------

/// Mail exchange data.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Mx {
    /// The preference of this exchange; lower values are preferred.
    pub preference: u16,

    /// The host name of the exchange.
    pub exchange: String,
}

//------------ Srv -----------------------------------------------------------

/// Server selection data.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Srv {
    /// The priority of the target; lower values are preferred.
    pub priority: u16,

    /// The relative weight among targets with the same priority.
    pub weight: u16,

    /// The port of the service on the target.
    pub port: u16,

    /// The host name of the target.
    pub target: String,
}

//------------ RecordData ----------------------------------------------------

/// The type specific data of a record.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum RecordData {
    /// An IPv4 host address.
    A(Ipv4Addr),

    /// An IPv6 host address.
    Aaaa(Ipv6Addr),

    /// The canonical name of an alias.
    Cname(String),

    /// A domain name pointer.
    Ptr(String),

    /// A mail exchange.
    Mx(Mx),

    /// A service location.
    Srv(Srv),

    /// Text. Multiple character strings are joined without separator.
    Txt(String),

    /// The record states that there is no data at all.
    ///
    /// Whether the name doesn’t exist or only has no records of the
    /// requested type is decided by the record’s `nxdomain` flag.
    Negative,
}

impl RecordData {
    /// Returns the record type of the data.
    ///
    /// Negative data has no type of its own and returns `None`.
    pub fn rtype(&self) -> Option<Rtype> {
        match *self {
            RecordData::A(_) => Some(Rtype::A),
            RecordData::Aaaa(_) => Some(Rtype::AAAA),
            RecordData::Cname(_) => Some(Rtype::CNAME),
            RecordData::Ptr(_) => Some(Rtype::PTR),
            RecordData::Mx(_) => Some(Rtype::MX),
            RecordData::Srv(_) => Some(Rtype::SRV),
            RecordData::Txt(_) => Some(Rtype::TXT),
            RecordData::Negative => None,
        }
    }

    /// Returns the address if this is address data.
    pub fn address(&self) -> Option<IpAddr> {
        match *self {
            RecordData::A(addr) => Some(addr.into()),
            RecordData::Aaaa(addr) => Some(addr.into()),
            _ => None,
        }
    }
}

impl fmt::Display for RecordData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RecordData::A(addr) => fmt::Display::fmt(&addr, f),
            RecordData::Aaaa(addr) => fmt::Display::fmt(&addr, f),
            RecordData::Cname(ref name) | RecordData::Ptr(ref name) => {
                write!(f, "{}.", name)
            }
            RecordData::Mx(ref mx) => {
                write!(f, "{} {}.", mx.preference, mx.exchange)
            }
            RecordData::Srv(ref srv) => write!(
                f,
                "{} {} {} {}.",
                srv.priority, srv.weight, srv.port, srv.target
            ),
            RecordData::Txt(ref text) => write!(f, "{:?}", text),
            RecordData::Negative => f.write_str("<no data>"),
        }
    }
}

//------------ ResourceRecord ------------------------------------------------

/// A resource record as kept by the resolver.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResourceRecord {
    /// The owner name in normalized form.
    owner: String,

    /// The record type.
    ///
    /// This is the type of the data or, for negative records, the type that
    /// was asked for. [`Rtype::NONE`] marks a dead record.
    rtype: Rtype,

    /// The data of the record.
    data: RecordData,

    /// Whether this is a negative record for a non-existing name.
    nxdomain: bool,

    /// Whether the record is still valid.
    ///
    /// Records that are being replaced are marked as not current and are
    /// not returned by lookups anymore.
    current: bool,

    /// The time the record expires.
    expire_time: u64,

    /// The time after which the record is removed from the cache.
    delete_time: u64,

    /// The section the record was found in.
    section: Section,
}

impl ResourceRecord {
    /// Creates a new record from its owner and data.
    ///
    /// The record is current and has both times set to zero.
    pub fn new(
        owner: impl Into<String>,
        data: RecordData,
        section: Section,
    ) -> Self {
        ResourceRecord {
            owner: owner.into(),
            rtype: data.rtype().unwrap_or(Rtype::NONE),
            data,
            nxdomain: false,
            current: true,
            expire_time: 0,
            delete_time: 0,
            section,
        }
    }

    /// Creates a negative record for the given name and type.
    ///
    /// Both expiry and deletion time are set to `until`.
    pub fn negative(
        owner: impl Into<String>,
        rtype: Rtype,
        nxdomain: bool,
        until: u64,
    ) -> Self {
        ResourceRecord {
            owner: owner.into(),
            rtype,
            data: RecordData::Negative,
            nxdomain,
            current: true,
            expire_time: until,
            delete_time: until,
            section: Section::Synthesized,
        }
    }

    /// Returns the owner name.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Returns the record type.
    pub fn rtype(&self) -> Rtype {
        self.rtype
    }

    /// Returns the record data.
    pub fn data(&self) -> &RecordData {
        &self.data
    }

    /// Returns whether this is a record for a non-existing name.
    pub fn nxdomain(&self) -> bool {
        self.nxdomain
    }

    /// Returns whether this is a negative record of any kind.
    pub fn is_negative(&self) -> bool {
        matches!(self.data, RecordData::Negative)
    }

    /// Returns whether the record is current.
    pub fn is_current(&self) -> bool {
        self.current
    }

    /// Marks the record as being replaced.
    pub fn set_current(&mut self, current: bool) {
        self.current = current
    }

    /// Returns whether the record is dead and only waits for removal.
    pub fn is_dead(&self) -> bool {
        self.rtype == Rtype::NONE
    }

    /// Marks the record as dead.
    pub fn kill(&mut self) {
        self.rtype = Rtype::NONE
    }

    /// Returns the expiry time.
    pub fn expire_time(&self) -> u64 {
        self.expire_time
    }

    /// Returns the deletion time or zero if it hasn’t been decided yet.
    pub fn delete_time(&self) -> u64 {
        self.delete_time
    }

    /// Sets the expiry and deletion times.
    pub fn set_times(&mut self, expire_time: u64, delete_time: u64) {
        self.expire_time = expire_time;
        self.delete_time = delete_time;
    }

    /// Sets the deletion time.
    pub fn set_delete_time(&mut self, delete_time: u64) {
        self.delete_time = delete_time
    }

    /// Returns the section the record was taken from.
    pub fn section(&self) -> Section {
        self.section
    }

    /// Returns whether the record has expired or is due for deletion.
    pub fn is_expired(&self, now: u64) -> bool {
        self.expire_time <= now
            || (self.delete_time != 0 && self.delete_time <= now)
    }

    /// Returns whether a lookup may use the record at time `now`.
    pub fn is_usable(&self, now: u64) -> bool {
        self.current && !self.is_dead() && !self.is_expired(now)
    }
}

impl fmt::Display for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}. {} {}", self.owner, self.rtype, self.data)
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn record_type_follows_data() {
        let rr = ResourceRecord::new(
            "example.com",
            RecordData::A(Ipv4Addr::new(192, 0, 2, 1)),
            Section::Answer,
        );
        assert_eq!(rr.rtype(), Rtype::A);
        assert!(rr.is_current());
        assert!(!rr.is_negative());
        assert_eq!(
            rr.data().address(),
            Some("192.0.2.1".parse::<IpAddr>().unwrap())
        );
        assert_eq!(format!("{}", rr), "example.com. A 192.0.2.1");
    }

    #[test]
    fn usability() {
        let mut rr = ResourceRecord::new(
            "example.com",
            RecordData::Txt("hello".into()),
            Section::Additional,
        );
        rr.set_times(100, 0);
        assert!(rr.is_usable(99));
        assert!(!rr.is_usable(100));
        rr.set_delete_time(50);
        assert!(!rr.is_usable(60));
        rr.set_delete_time(0);
        rr.set_current(false);
        assert!(!rr.is_usable(10));
        rr.set_current(true);
        rr.kill();
        assert!(rr.is_dead());
        assert!(!rr.is_usable(10));
    }

    #[test]
    fn negative_record() {
        let rr =
            ResourceRecord::negative("nosuch.example", Rtype::A, true, 300);
        assert!(rr.nxdomain());
        assert!(rr.is_negative());
        assert_eq!(rr.rtype(), Rtype::A);
        assert_eq!(rr.expire_time(), 300);
        assert_eq!(rr.delete_time(), 300);
        assert_eq!(rr.section(), Section::Synthesized);
    }
}
