//! Looking up names.
//!
//! A [`Lookup`] asks the resolver about a single name and record type. It
//! answers from the cache if it can. Otherwise, it has the engine send a
//! query and returns an empty result for now. Once the answer has arrived,
//! the lookup is notified and asking again gives the answer.
//!
//! Labels that are address literals are answered right away without asking
//! anyone. So is `localhost`.

use super::engine::{Outcome, ResolverEngine};
use crate::base::iana::Rtype;
use crate::base::name;
use crate::base::record::{Mx, RecordData, ResourceRecord, Section, Srv};
use std::fmt::Write;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

//------------ LookupId ------------------------------------------------------

/// The identifier of a lookup within its engine.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct LookupId(u64);

impl LookupId {
    /// Creates an identifier from its integer value.
    pub const fn from_int(value: u64) -> Self {
        LookupId(value)
    }

    /// Returns the integer value of the identifier.
    pub const fn to_int(self) -> u64 {
        self.0
    }
}

//------------ Status --------------------------------------------------------

/// The state of a lookup.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Status {
    /// Nothing is happening.
    ///
    /// Either the lookup has no record type the resolver can decode or a
    /// query needs to be sent.
    Passive,

    /// A query is in flight.
    Active,

    /// The answer is known. It may be empty.
    Done,

    /// The query has timed out.
    Failed,
}

impl Status {
    /// Returns whether nothing more is going to happen.
    pub fn is_finished(self) -> bool {
        matches!(self, Status::Done | Status::Failed)
    }
}

//------------ Watch ---------------------------------------------------------

/// How the engine notifies a lookup.
#[derive(Debug, Default)]
pub(crate) struct Watch {
    generation: AtomicU64,
    notify: Notify,
}

impl Watch {
    pub(crate) fn signal(&self) {
        self.generation.fetch_add(1, Ordering::Release);
        self.notify.notify_one();
    }
}

//------------ Lookup --------------------------------------------------------

/// A lookup of a name and record type.
///
/// Dropping the lookup releases its interest in the names it looked at.
pub struct Lookup {
    engine: ResolverEngine,
    id: LookupId,
    watch: Arc<Watch>,
    label: String,
    rtype: Rtype,
}

impl Lookup {
    /// Creates a new lookup.
    ///
    /// Nothing happens until the lookup is asked for its records or status.
    pub fn new(engine: &ResolverEngine, label: &str, rtype: Rtype) -> Self {
        let (id, watch) = engine.register_lookup();
        Lookup {
            engine: engine.clone(),
            id,
            watch,
            label: label.into(),
            rtype,
        }
    }

    /// Creates a lookup for the host names of an address.
    ///
    /// This is a PTR lookup for the name in the `in-addr.arpa` or
    /// `ip6.arpa` domain derived from the address.
    pub fn reverse(engine: &ResolverEngine, addr: IpAddr) -> Self {
        Self::new(engine, &reverse_name(addr), Rtype::PTR)
    }

    /// Returns the identifier of the lookup.
    pub fn id(&self) -> LookupId {
        self.id
    }

    /// Returns the label looked up.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Changes the label to look up.
    pub fn set_label(&mut self, label: &str) {
        self.engine.reset_lookup(self.id);
        self.label = label.into();
    }

    /// Returns the record type looked up.
    pub fn rtype(&self) -> Rtype {
        self.rtype
    }

    /// Changes the record type to look up.
    ///
    /// [`Rtype::NONE`] and types the resolver can’t decode, such as
    /// [`Rtype::ANY`], turn the lookup passive.
    pub fn set_rtype(&mut self, rtype: Rtype) {
        self.engine.reset_lookup(self.id);
        self.rtype = rtype;
    }

    /// Returns the current state without sending a query.
    ///
    /// This registers the lookup’s interest in the names it visits, so
    /// cache entries for them may be created.
    pub fn status(&self) -> Status {
        if self.literal().is_some() {
            return Status::Done;
        }
        self.engine.evaluate(self.id, &self.label, self.rtype).status
    }

    /// Makes sure a query is in flight unless the answer is known.
    ///
    /// Returns the state afterwards.
    pub fn start(&self) -> Status {
        if self.literal().is_some() {
            return Status::Done;
        }
        match self.engine.start(self.id, &self.label, self.rtype) {
            Outcome {
                missing: Some(_), ..
            } => self.engine.evaluate(self.id, &self.label, self.rtype).status,
            outcome => outcome.status,
        }
    }

    /// Returns the current state and sends a query if necessary.
    ///
    /// If a query had to be sent, the state is reported as passive.
    pub fn query_status(&self) -> Status {
        if self.literal().is_some() {
            return Status::Done;
        }
        self.engine.start(self.id, &self.label, self.rtype).status
    }

    /// Returns the records found.
    ///
    /// If the answer isn’t known yet, a query is sent if necessary and the
    /// result is empty. Negative answers result in an empty list, too.
    pub fn records(&self) -> Vec<ResourceRecord> {
        self.outcome().records
    }

    /// Returns the addresses found for an A or AAAA lookup.
    pub fn addresses(&self) -> Vec<IpAddr> {
        if let Some(addr) = self.literal() {
            return vec![addr];
        }
        self.records()
            .iter()
            .filter_map(|record| record.data().address())
            .collect()
    }

    /// Returns the mail exchanges found, most preferred first.
    pub fn mail_servers(&self) -> Vec<Mx> {
        let mut res: Vec<_> = self
            .records()
            .into_iter()
            .filter_map(|record| match record.data() {
                RecordData::Mx(mx) => Some(mx.clone()),
                _ => None,
            })
            .collect();
        res.sort_by_key(|mx| mx.preference);
        res
    }

    /// Returns the servers found for an SRV lookup.
    ///
    /// The servers are ordered by priority and, within the same priority,
    /// by descending weight.
    pub fn servers(&self) -> Vec<Srv> {
        let mut res: Vec<_> = self
            .records()
            .into_iter()
            .filter_map(|record| match record.data() {
                RecordData::Srv(srv) => Some(srv.clone()),
                _ => None,
            })
            .collect();
        res.sort_by(|left, right| {
            left.priority
                .cmp(&right.priority)
                .then(right.weight.cmp(&left.weight))
        });
        res
    }

    /// Returns the host names found for a PTR lookup.
    pub fn host_names(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .filter_map(|record| match record.data() {
                RecordData::Ptr(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns the canonical name of the label.
    ///
    /// For a CNAME lookup, this is the target of the record found. For all
    /// other types, this is the name at the end of the alias chain if any
    /// aliases were followed.
    pub fn canonical_name(&self) -> Option<String> {
        let outcome = self.outcome();
        if outcome.canonical.is_some() {
            return outcome.canonical;
        }
        outcome.records.iter().find_map(|record| match record.data() {
            RecordData::Cname(name) => Some(name.clone()),
            _ => None,
        })
    }

    /// Returns the texts found for a TXT lookup.
    pub fn texts(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .filter_map(|record| match record.data() {
                RecordData::Txt(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns whether the name is known not to exist.
    pub fn is_nxdomain(&self) -> bool {
        if self.literal().is_some() {
            return false;
        }
        self.engine.evaluate(self.id, &self.label, self.rtype).nxdomain
    }

    /// Returns how often the engine has notified the lookup.
    pub fn generation(&self) -> u64 {
        self.watch.generation.load(Ordering::Acquire)
    }

    /// Waits until the engine notifies the lookup.
    ///
    /// A notification that happened since the last call completes the
    /// future right away.
    pub async fn changed(&self) {
        self.watch.notify.notified().await
    }

    /// Returns the state from the engine, sending a query if necessary.
    fn outcome(&self) -> Outcome {
        if let Some(addr) = self.literal() {
            let data = match addr {
                IpAddr::V4(addr) => RecordData::A(addr),
                IpAddr::V6(addr) => RecordData::Aaaa(addr),
            };
            let mut record = ResourceRecord::new(
                name::normalize(&self.label),
                data,
                Section::Synthesized,
            );
            record.set_times(u64::MAX, u64::MAX);
            return Outcome {
                status: Status::Done,
                records: vec![record],
                canonical: None,
                nxdomain: false,
                missing: None,
            };
        }
        self.engine.start(self.id, &self.label, self.rtype)
    }

    /// Returns the address if the label is an address literal.
    fn literal(&self) -> Option<IpAddr> {
        literal_address(&self.label, self.rtype)
    }
}

impl Drop for Lookup {
    fn drop(&mut self) {
        self.engine.release_lookup(self.id)
    }
}

//------------ Helper Functions ----------------------------------------------

/// Returns the address for a label that is an address literal.
///
/// IPv4 literals and `localhost` are recognized for A lookups, IPv6
/// literals and `localhost` for AAAA lookups.
pub fn literal_address(label: &str, rtype: Rtype) -> Option<IpAddr> {
    let is_localhost = name::normalize(label) == "localhost";
    match rtype {
        Rtype::A => {
            if is_localhost {
                Some(Ipv4Addr::LOCALHOST.into())
            } else {
                label.parse::<Ipv4Addr>().ok().map(Into::into)
            }
        }
        Rtype::AAAA => {
            if is_localhost {
                Some(Ipv6Addr::LOCALHOST.into())
            } else {
                label.parse::<Ipv6Addr>().ok().map(Into::into)
            }
        }
        _ => None,
    }
}

/// Returns the absolute domain name for reverse lookups of `addr`.
pub fn reverse_name(addr: IpAddr) -> String {
    let mut res = String::new();
    match addr {
        IpAddr::V4(addr) => {
            for octet in addr.octets().iter().rev() {
                let _ = write!(res, "{}.", octet);
            }
            res.push_str("in-addr.arpa.");
        }
        IpAddr::V6(addr) => {
            for octet in addr.octets().iter().rev() {
                let _ = write!(res, "{:x}.{:x}.", octet & 0x0f, octet >> 4);
            }
            res.push_str("ip6.arpa.");
        }
    }
    res
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::resolv::clock::FakeClock;
    use crate::resolv::conf::ResolvConf;
    use crate::resolv::config::Config;
    use crate::resolv::socket::MemorySocket;
    use rstest::rstest;
    use std::net::SocketAddr;

    fn engine() -> (ResolverEngine, MemorySocket) {
        let sock = MemorySocket::new();
        let engine = ResolverEngine::with_clock(
            ResolvConf::with_servers([
                "192.0.2.53:53".parse::<SocketAddr>().unwrap()
            ]),
            Config::new(),
            sock.clone(),
            FakeClock::new(),
        );
        (engine, sock)
    }

    #[rstest]
    #[case("127.0.0.1", Rtype::A, Some("127.0.0.1"))]
    #[case("localhost", Rtype::A, Some("127.0.0.1"))]
    #[case("LocalHost.", Rtype::A, Some("127.0.0.1"))]
    #[case("localhost", Rtype::AAAA, Some("::1"))]
    #[case("2001:db8::1", Rtype::AAAA, Some("2001:db8::1"))]
    #[case("192.0.2.1", Rtype::AAAA, None)]
    #[case("2001:db8::1", Rtype::A, None)]
    #[case("localhost", Rtype::MX, None)]
    #[case("example.com", Rtype::A, None)]
    fn literals(
        #[case] label: &str,
        #[case] rtype: Rtype,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(
            literal_address(label, rtype),
            expected.map(|addr| addr.parse::<IpAddr>().unwrap())
        );
    }

    #[test]
    fn literal_shortcut() {
        let (engine, sock) = engine();
        let lookup = engine.lookup("127.0.0.1", Rtype::A);
        assert_eq!(lookup.addresses(), vec![IpAddr::from([127, 0, 0, 1])]);
        assert_eq!(lookup.status(), Status::Done);
        let lookup = engine.lookup("localhost", Rtype::A);
        assert_eq!(lookup.addresses(), vec![IpAddr::from([127, 0, 0, 1])]);
        assert_eq!(lookup.records().len(), 1);
        assert_eq!(sock.sent_len(), 0);
        assert_eq!(engine.domain_count(), 0);
        assert!(engine.pending_queries().is_empty());
    }

    #[test]
    fn miss_sends_query() {
        let (engine, sock) = engine();
        let lookup = engine.lookup("example.com", Rtype::A);
        assert_eq!(lookup.status(), Status::Passive);
        assert!(lookup.addresses().is_empty());
        assert_eq!(lookup.status(), Status::Active);
        assert_eq!(sock.sent_len(), 1);
        assert!(lookup.addresses().is_empty());
        assert_eq!(sock.sent_len(), 1);
    }

    #[test]
    fn query_status_triggers() {
        let (engine, sock) = engine();
        let lookup = engine.lookup("example.com", Rtype::MX);
        assert_eq!(lookup.query_status(), Status::Passive);
        assert_eq!(sock.sent_len(), 1);
        assert_eq!(lookup.query_status(), Status::Active);
        assert_eq!(sock.sent_len(), 1);
    }

    #[test]
    fn start_reports_active() {
        let (engine, _sock) = engine();
        let lookup = engine.lookup("example.com", Rtype::TXT);
        assert_eq!(lookup.start(), Status::Active);
        assert_eq!(lookup.status(), Status::Active);
    }

    #[test]
    fn no_type_is_passive() {
        let (engine, sock) = engine();
        for rtype in [Rtype::NONE, Rtype::ANY, Rtype::NS] {
            let lookup = engine.lookup("example.com", rtype);
            assert_eq!(lookup.query_status(), Status::Passive);
            assert_eq!(lookup.start(), Status::Passive);
            assert!(lookup.records().is_empty());
        }
        assert_eq!(sock.sent_len(), 0);
    }

    #[test]
    fn drop_releases() {
        let (engine, _sock) = engine();
        let lookup = engine.lookup("example.com", Rtype::A);
        assert!(!engine.is_idle());
        drop(lookup);
        assert!(engine.is_idle());
    }

    #[test]
    fn reverse_names() {
        assert_eq!(
            reverse_name("192.0.2.1".parse().unwrap()),
            "1.2.0.192.in-addr.arpa."
        );
        assert_eq!(
            reverse_name("2001:db8::567:89ab".parse().unwrap()),
            "b.a.9.8.7.6.5.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.\
             8.b.d.0.1.0.0.2.ip6.arpa."
        );
    }
}
