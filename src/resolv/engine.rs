//! The resolver engine.
//!
//! The [`ResolverEngine`] ties everything together. It owns the domain
//! cache, the registry of queries in flight, and the socket. It never
//! blocks and never spawns anything. Instead, whoever runs it calls
//! [`on_readable`][ResolverEngine::on_readable] when the socket has data
//! and [`on_timer`][ResolverEngine::on_timer] once the time returned by
//! [`next_timer`][ResolverEngine::next_timer] has come. The
//! [driver][super::driver] does exactly that on top of tokio.
//!
//! The engine is a cheap to clone handle. All clones refer to the same
//! state, which is protected by a mutex.

use super::cache::{DomainCache, DomainId, SweepReport, MAX_CNAME_CHAIN};
use super::clock::{Clock, SystemClock};
use super::conf::ResolvConf;
use super::config::Config;
use super::lookup::{Lookup, LookupId, Status, Watch};
use super::pending::{PendingQuery, QueryRegistry};
use super::socket::DgramSocket;
use crate::base::answer::{decode_answer, Question};
use crate::base::header::HeaderSection;
use crate::base::iana::Rtype;
use crate::base::name;
use crate::base::query::encode_query;
use crate::base::record::{RecordData, ResourceRecord};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, trace, warn};

//------------ Configuration Constants ----------------------------------------

/// The size of the receive buffer.
///
/// Answers to queries without EDNS are at most 512 octets. Anything up to
/// a typical MTU is accepted anyway.
const RECV_BUF_LEN: usize = 1500;

//------------ ResolverEngine ------------------------------------------------

/// The resolver engine.
#[derive(Clone)]
pub struct ResolverEngine {
    inner: Arc<Mutex<Inner>>,

    /// Signalled whenever the next timer may have moved or idleness may
    /// have changed.
    timer: Arc<Notify>,
}

struct Inner {
    conf: ResolvConf,
    config: Config,
    socket: Box<dyn DgramSocket + Send>,
    clock: Arc<dyn Clock>,
    cache: DomainCache,
    queries: QueryRegistry,
    lookups: HashMap<LookupId, LookupState>,
    next_lookup: u64,
    last_sweep: Duration,
}

/// What the engine knows about a live lookup.
struct LookupState {
    watch: Arc<Watch>,

    /// The domain entries the lookup has registered interest in.
    domains: Vec<DomainId>,
}

impl ResolverEngine {
    /// Creates a new engine using the system clock.
    ///
    /// The socket must be non-blocking.
    pub fn new(
        conf: ResolvConf,
        config: Config,
        socket: impl DgramSocket + Send + 'static,
    ) -> Self {
        Self::with_clock(conf, config, socket, SystemClock::new())
    }

    /// Creates a new engine using the given clock.
    pub fn with_clock(
        mut conf: ResolvConf,
        config: Config,
        socket: impl DgramSocket + Send + 'static,
        clock: impl Clock + 'static,
    ) -> Self {
        conf.finalize();
        let clock: Arc<dyn Clock> = Arc::new(clock);
        let last_sweep = clock.elapsed();
        ResolverEngine {
            inner: Arc::new(Mutex::new(Inner {
                conf,
                config,
                socket: Box::new(socket),
                clock,
                cache: DomainCache::new(),
                queries: QueryRegistry::new(),
                lookups: HashMap::new(),
                next_lookup: 0,
                last_sweep,
            })),
            timer: Arc::new(Notify::new()),
        }
    }

    /// Returns the resolver configuration.
    pub fn conf(&self) -> ResolvConf {
        self.inner.lock().conf.clone()
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> Config {
        self.inner.lock().config.clone()
    }

    /// Returns the current time of the engine’s clock in whole seconds.
    pub fn now(&self) -> u64 {
        self.inner.lock().clock.now_secs()
    }

    /// Creates a lookup for `label` and `rtype`.
    pub fn lookup(&self, label: &str, rtype: Rtype) -> Lookup {
        Lookup::new(self, label, rtype)
    }

    /// Sends a query for `label` and `rtype` unless one is in flight.
    ///
    /// If a query is in flight already, its retransmission count is
    /// restarted. Returns `false` if no query could be sent because the
    /// name can’t be encoded.
    pub fn send_query(&self, label: &str, rtype: Rtype) -> bool {
        let res = self.inner.lock().send_query(label, rtype);
        self.timer.notify_one();
        res
    }

    /// Cancels the query for `label` and `rtype`.
    ///
    /// Lookups interested in the name are notified. Returns whether there
    /// was such a query.
    pub fn cancel(&self, label: &str, rtype: Rtype) -> bool {
        let mut inner = self.inner.lock();
        let query = match inner.queries.cancel(label, rtype) {
            Some(query) => query,
            None => return false,
        };
        debug!("cancelled query for {} {}", query.qname(), query.qtype());
        inner.notify_names([query.qname()]);
        drop(inner);
        self.timer.notify_one();
        true
    }

    /// Marks all cached records for `label` as no longer current.
    pub fn invalidate(&self, label: &str) {
        let mut inner = self.inner.lock();
        if inner.cache.invalidate(label) > 0 {
            inner.notify_names([label]);
        }
    }

    /// Processes a single datagram waiting on the socket.
    ///
    /// Returns `false` if there was no datagram to receive, in which case
    /// the socket should be waited on before calling this method again.
    pub fn on_readable(&self) -> bool {
        self.inner.lock().on_readable()
    }

    /// Processes timers.
    ///
    /// This retransmits or times out queries whose deadline has passed and
    /// sweeps the cache if the sweep interval has passed.
    pub fn on_timer(&self) {
        self.inner.lock().on_timer()
    }

    /// Returns the time of the next timer as time of the engine’s clock.
    pub fn next_timer(&self) -> Duration {
        self.inner.lock().next_timer()
    }

    /// Returns the time until the next timer.
    pub fn time_until_timer(&self) -> Duration {
        let inner = self.inner.lock();
        inner.next_timer().saturating_sub(inner.clock.elapsed())
    }

    /// Sweeps the cache right away.
    pub fn sweep(&self) -> SweepReport {
        let mut inner = self.inner.lock();
        let now = inner.clock.elapsed();
        inner.sweep(now)
    }

    /// Returns whether the engine has nothing to do.
    ///
    /// This is the case if there are no lookups alive, no queries in flight,
    /// and no records in the cache.
    pub fn is_idle(&self) -> bool {
        let inner = self.inner.lock();
        inner.lookups.is_empty()
            && inner.queries.is_empty()
            && !inner.cache.has_records()
    }

    /// Returns a snapshot of the queries in flight.
    pub fn pending_queries(&self) -> Vec<PendingQuery> {
        self.inner.lock().queries.iter().cloned().collect()
    }

    /// Returns the usable cached records for `label` and `rtype`.
    ///
    /// Unlike a lookup, this never creates a domain entry.
    pub fn cached(&self, label: &str, rtype: Rtype) -> Vec<ResourceRecord> {
        let inner = self.inner.lock();
        let now = inner.clock.now_secs();
        match inner.cache.entry(label) {
            Some(entry) => entry
                .records()
                .iter()
                .filter(|rr| rr.rtype() == rtype && rr.is_usable(now))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Returns the number of domain entries in the cache.
    pub fn domain_count(&self) -> usize {
        self.inner.lock().cache.len()
    }

    /// Returns the notification for timer changes.
    pub(crate) fn timer_notify(&self) -> &Notify {
        &self.timer
    }

    //--- Interface for lookups

    pub(crate) fn register_lookup(&self) -> (LookupId, Arc<Watch>) {
        let mut inner = self.inner.lock();
        let id = LookupId::from_int(inner.next_lookup);
        inner.next_lookup += 1;
        let watch = Arc::new(Watch::default());
        inner.lookups.insert(
            id,
            LookupState {
                watch: watch.clone(),
                domains: Vec::new(),
            },
        );
        (id, watch)
    }

    /// Drops all interest registered by a lookup.
    pub(crate) fn reset_lookup(&self, id: LookupId) {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;
        if let Some(state) = inner.lookups.get_mut(&id) {
            let domains = std::mem::take(&mut state.domains);
            inner.cache.release_interest(&domains, id);
        }
    }

    pub(crate) fn release_lookup(&self, id: LookupId) {
        let mut inner = self.inner.lock();
        if let Some(state) = inner.lookups.remove(&id) {
            inner.cache.release_interest(&state.domains, id);
        }
        drop(inner);
        self.timer.notify_one();
    }

    /// Determines the state of a lookup without changing anything.
    pub(crate) fn evaluate(
        &self,
        id: LookupId,
        label: &str,
        rtype: Rtype,
    ) -> Outcome {
        self.inner.lock().evaluate(id, label, rtype)
    }

    /// Determines the state of a lookup and sends a query if necessary.
    ///
    /// The returned outcome is the one from before sending the query.
    pub(crate) fn start(
        &self,
        id: LookupId,
        label: &str,
        rtype: Rtype,
    ) -> Outcome {
        let mut inner = self.inner.lock();
        let outcome = inner.evaluate(id, label, rtype);
        if let Some(target) = outcome.missing.as_ref() {
            inner.send_query(target, rtype);
            drop(inner);
            self.timer.notify_one();
        }
        outcome
    }
}

impl Inner {
    fn send_query(&mut self, label: &str, rtype: Rtype) -> bool {
        let qname = name::normalize(label);
        if self.queries.restart(&qname, rtype) {
            trace!("query for {} {} already in flight", qname, rtype);
            return true;
        }
        let id = self.queries.peek_id();
        let msg = match encode_query(&qname, rtype, id) {
            Ok(msg) => msg,
            Err(err) => {
                debug!("cannot query for {} {}: {}", qname, rtype, err);
                return false;
            }
        };
        let now = self.clock.elapsed();
        let deadline = now + self.config.retransmit_timeout();
        let query = self
            .queries
            .register(&qname, rtype, now.as_secs(), deadline, self.conf.rotate)
            .clone();
        self.transmit(&query, &msg);
        true
    }

    fn transmit(&self, query: &PendingQuery, msg: &[u8]) {
        let idx = query.server_index(self.conf.servers.len());
        let server = match self.conf.servers.get(idx) {
            Some(server) => *server,
            None => {
                warn!("no name servers configured");
                return;
            }
        };
        match self.socket.send_to(msg, server) {
            Ok(_) => trace!(
                "sent query {} for {} {} to {}",
                query.id(),
                query.qname(),
                query.qtype(),
                server
            ),
            Err(err) => warn!(
                "failed to send query for {} {} to {}: {}",
                query.qname(),
                query.qtype(),
                server,
                err
            ),
        }
    }

    fn on_readable(&mut self) -> bool {
        let mut buf = [0u8; RECV_BUF_LEN];
        let (len, source) = match self.socket.recv_from(&mut buf) {
            Ok(res) => res,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                return false
            }
            Err(err) => {
                warn!("failed to receive: {}", err);
                return false;
            }
        };
        let msg = &buf[..len];
        trace!("received {} octets from {}", len, source);

        if !self.conf.servers.contains(&source) {
            debug!("ignoring datagram from unknown source {}", source);
            return true;
        }
        if len < HeaderSection::LEN {
            debug!("ignoring short datagram from {}", source);
            return true;
        }
        if msg[2] & 0x80 == 0 {
            debug!("ignoring non-response from {}", source);
            return true;
        }
        let id = u16::from_be_bytes([msg[0], msg[1]]);
        let query = match self.queries.find_by_id(id) {
            Some(query) => query.clone(),
            None => {
                debug!("ignoring spurious answer {} from {}", id, source);
                return true;
            }
        };
        let question = Question {
            qname: query.qname(),
            qtype: query.qtype(),
            started: query.started(),
            negative_ttl: self.config.negative_ttl(),
        };
        let answer = match decode_answer(msg, &question) {
            Ok(answer) => answer,
            Err(err) => {
                debug!(
                    "dropping answer for {} {}: {}",
                    query.qname(),
                    query.qtype(),
                    err
                );
                return true;
            }
        };
        trace!(
            "accepted answer {} for {} {} with {} records",
            id,
            query.qname(),
            query.qtype(),
            answer.records().len()
        );
        self.queries.take_by_id(id);

        self.cache.supersede(query.qname(), query.qtype());
        let mut touched = vec![query.qname().to_string()];
        for record in answer.into_records() {
            if !touched.iter().any(|name| name == record.owner()) {
                touched.push(record.owner().to_string())
            }
            self.cache.add(record);
        }
        self.notify_names(touched.iter().map(String::as_str));
        true
    }

    fn on_timer(&mut self) {
        let now = self.clock.elapsed();
        if now >= self.last_sweep + self.config.sweep_interval() {
            self.sweep(now);
        }

        let config = &self.config;
        let advanced = self.queries.advance(now, config.max_retries(), |step| {
            config.backoff(step)
        });
        for query in &advanced.due {
            debug!(
                "retransmitting query {} for {} {} (step {})",
                query.id(),
                query.qname(),
                query.qtype(),
                query.step()
            );
            let msg = encode_query(query.qname(), query.qtype(), query.id());
            if let Ok(msg) = msg {
                self.transmit(query, &msg)
            }
        }
        let hold = self.config.failure_hold().as_secs();
        for query in &advanced.timed_out {
            warn!("query for {} {} timed out", query.qname(), query.qtype());
            self.queries.mark_failed(
                query.qname(),
                query.qtype(),
                now.as_secs() + hold,
            );
        }
        if !advanced.timed_out.is_empty() {
            self.notify_names(advanced.timed_out.iter().map(|q| q.qname()));
        }
    }

    fn next_timer(&self) -> Duration {
        let sweep = self.last_sweep + self.config.sweep_interval();
        match self.queries.next_deadline() {
            Some(deadline) => deadline.min(sweep),
            None => sweep,
        }
    }

    fn sweep(&mut self, now: Duration) -> SweepReport {
        let report = self.cache.sweep(now.as_secs());
        self.queries.sweep_failures(now.as_secs());
        self.last_sweep = now;
        debug!(
            "cache sweep removed {} records and {} domains, {} domains left",
            report.records,
            report.domains,
            self.cache.len()
        );
        report
    }

    /// Notifies all lookups interested in any of the given names once.
    fn notify_names<'a>(&self, names: impl IntoIterator<Item = &'a str>) {
        let mut ids = HashSet::new();
        for name in names {
            ids.extend(self.cache.interested(name));
        }
        for id in ids {
            if let Some(state) = self.lookups.get(&id) {
                state.watch.signal()
            }
        }
    }

    fn register_interest(&mut self, id: LookupId, name: &str) {
        let domain = self.cache.register_interest(name, id);
        if let Some(state) = self.lookups.get_mut(&id) {
            if !state.domains.contains(&domain) {
                state.domains.push(domain)
            }
        }
    }

    fn evaluate(&mut self, id: LookupId, label: &str, rtype: Rtype) -> Outcome {
        if !rtype.is_supported() {
            return Outcome::new(Status::Passive);
        }
        let now = self.clock.now_secs();
        let mut failed = false;
        let mut nxdomain = false;
        for candidate in self.conf.candidates(label) {
            match self.resolve_name(id, &candidate, rtype, now) {
                Resolved::Data { records, name } => {
                    let mut res = Outcome::new(Status::Done);
                    res.records = records;
                    if name != candidate {
                        res.canonical = Some(name)
                    }
                    return res;
                }
                Resolved::Negative(nx) => nxdomain = nx,
                Resolved::Failed => failed = true,
                Resolved::Pending => return Outcome::new(Status::Active),
                Resolved::Missing(target) => {
                    let mut res = Outcome::new(Status::Passive);
                    res.missing = Some(target);
                    return res;
                }
            }
        }
        let mut res = Outcome::new(if failed {
            Status::Failed
        } else {
            Status::Done
        });
        res.nxdomain = nxdomain && !failed;
        res
    }

    /// Resolves a single name following CNAME records.
    fn resolve_name(
        &mut self,
        id: LookupId,
        name: &str,
        rtype: Rtype,
        now: u64,
    ) -> Resolved {
        let mut name = name::normalize(name);
        for _ in 0..=MAX_CNAME_CHAIN {
            self.register_interest(id, &name);
            let records = self.cache.lookup(&name, rtype, now);
            if !records.is_empty() {
                if records.iter().all(ResourceRecord::is_negative) {
                    return Resolved::Negative(
                        records.iter().any(ResourceRecord::nxdomain),
                    );
                }
                let records = records
                    .into_iter()
                    .filter(|record| !record.is_negative())
                    .collect();
                return Resolved::Data { records, name };
            }
            if rtype != Rtype::CNAME {
                let target = self
                    .cache
                    .lookup(&name, Rtype::CNAME, now)
                    .into_iter()
                    .find_map(|record| match record.data() {
                        RecordData::Cname(target) => Some(target.clone()),
                        _ => None,
                    });
                if let Some(target) = target {
                    name = target;
                    continue;
                }
            }
            if self.queries.find_by_type(&name, rtype).is_some() {
                return Resolved::Pending;
            }
            if self.queries.is_failed(&name, rtype, now) {
                return Resolved::Failed;
            }
            return Resolved::Missing(name);
        }
        debug!("CNAME chain for {} too long", name);
        Resolved::Failed
    }
}

//------------ Outcome -------------------------------------------------------

/// The state of a lookup as determined by the engine.
#[derive(Clone, Debug)]
pub(crate) struct Outcome {
    pub status: Status,

    /// The records found if the status is `Done`.
    pub records: Vec<ResourceRecord>,

    /// The name the records were found at if aliases were followed.
    pub canonical: Option<String>,

    /// Whether all names tried don’t exist.
    pub nxdomain: bool,

    /// The name that needs to be queried next.
    pub missing: Option<String>,
}

impl Outcome {
    fn new(status: Status) -> Self {
        Outcome {
            status,
            records: Vec::new(),
            canonical: None,
            nxdomain: false,
            missing: None,
        }
    }
}

//------------ Resolved ------------------------------------------------------

/// The state of a single name.
enum Resolved {
    /// Records were found, possibly at the end of a CNAME chain.
    Data {
        records: Vec<ResourceRecord>,
        name: String,
    },

    /// A negative answer is cached. The flag is for NXDOMAIN.
    Negative(bool),

    /// The last query for the name timed out.
    Failed,

    /// A query is in flight.
    Pending,

    /// Nothing is known and this name needs to be asked for.
    Missing(String),
}
