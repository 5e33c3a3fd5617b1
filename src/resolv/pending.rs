//! Queries in flight.
//!
//! The registry keeps one [`PendingQuery`] per queried name and record type.
//! Each query carries the transaction ID it was sent with, how often it has
//! been retransmitted, and the deadline for the next retransmission. Queries
//! that ran out of retransmissions leave a failure marker behind for a
//! while so that lookups can report them as failed instead of immediately
//! asking again.

use crate::base::iana::Rtype;
use crate::base::name;
use std::collections::HashMap;
use std::time::Duration;

//------------ PendingQuery --------------------------------------------------

/// A query waiting for its answer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PendingQuery {
    /// The transaction ID.
    id: u16,

    /// The normalized query name.
    qname: String,

    /// The record type asked for.
    qtype: Rtype,

    /// The number of retransmissions so far.
    step: u8,

    /// When the query was first sent, in seconds of the resolver clock.
    started: u64,

    /// When the query is to be retransmitted next.
    deadline: Duration,

    /// The index of the server the first transmission went to.
    server_offset: usize,
}

impl PendingQuery {
    /// Returns the transaction ID.
    pub fn id(&self) -> u16 {
        self.id
    }

    /// Returns the query name.
    pub fn qname(&self) -> &str {
        &self.qname
    }

    /// Returns the record type.
    pub fn qtype(&self) -> Rtype {
        self.qtype
    }

    /// Returns the number of retransmissions so far.
    pub fn step(&self) -> u8 {
        self.step
    }

    /// Returns the time the query was first sent, in whole seconds.
    pub fn started(&self) -> u64 {
        self.started
    }

    /// Returns the deadline for the next retransmission.
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Returns the index of the server for the current step.
    pub fn server_index(&self, server_count: usize) -> usize {
        if server_count == 0 {
            0
        } else {
            (self.server_offset + usize::from(self.step)) % server_count
        }
    }

    /// Returns whether this is the query for `qname` and `qtype`.
    fn matches(&self, qname: &str, qtype: Rtype) -> bool {
        self.qtype == qtype && self.qname == qname
    }
}

//------------ QueryRegistry -------------------------------------------------

/// The collection of queries in flight.
#[derive(Clone, Debug)]
pub struct QueryRegistry {
    /// The queries.
    queries: Vec<PendingQuery>,

    /// The next transaction ID to try.
    next_id: u16,

    /// The number of queries registered, for picking the first server.
    registered: usize,

    /// Timed out queries and when they are forgotten.
    failures: HashMap<(String, Rtype), u64>,
}

impl QueryRegistry {
    /// Creates a new registry.
    ///
    /// Transaction IDs start at a random value and count up from there.
    pub fn new() -> Self {
        Self::with_first_id(rand::random())
    }

    /// Creates a new registry using the given first transaction ID.
    pub fn with_first_id(id: u16) -> Self {
        QueryRegistry {
            queries: Vec::new(),
            next_id: id,
            registered: 0,
            failures: HashMap::new(),
        }
    }

    /// Returns the number of queries in flight.
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// Returns whether there are no queries in flight.
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Returns an iterator over all queries in flight.
    pub fn iter(&self) -> impl Iterator<Item = &PendingQuery> + '_ {
        self.queries.iter()
    }

    /// Returns the query for `qname` and `qtype` if there is one.
    pub fn find_by_type(
        &self,
        qname: &str,
        qtype: Rtype,
    ) -> Option<&PendingQuery> {
        let qname = name::normalize(qname);
        self.queries.iter().find(|query| query.matches(&qname, qtype))
    }

    /// Restarts the retransmission count of the query for `qname` and
    /// `qtype`.
    ///
    /// The start time stays unchanged. Returns whether there was such a
    /// query.
    pub fn restart(&mut self, qname: &str, qtype: Rtype) -> bool {
        let qname = name::normalize(qname);
        match self.queries.iter_mut().find(|q| q.matches(&qname, qtype)) {
            Some(query) => {
                query.step = 0;
                true
            }
            None => false,
        }
    }

    /// Returns the transaction ID the next query will get.
    ///
    /// IDs still in use by queries in flight are skipped.
    pub fn peek_id(&self) -> u16 {
        let mut id = self.next_id;
        while self.queries.iter().any(|query| query.id == id) {
            id = id.wrapping_add(1);
        }
        id
    }

    /// Registers a new query.
    ///
    /// The query gets the ID returned by [`peek_id`][Self::peek_id] and a
    /// retransmit deadline of `deadline`. Any failure marker for the name
    /// and type is removed.
    pub fn register(
        &mut self,
        qname: &str,
        qtype: Rtype,
        started: u64,
        deadline: Duration,
        rotate: bool,
    ) -> &PendingQuery {
        let qname = name::normalize(qname);
        let id = self.peek_id();
        self.next_id = id.wrapping_add(1);
        self.failures.remove(&(qname.clone(), qtype));
        let server_offset = if rotate { self.registered } else { 0 };
        self.registered = self.registered.wrapping_add(1);
        let idx = self.queries.len();
        self.queries.push(PendingQuery {
            id,
            qname,
            qtype,
            step: 0,
            started,
            deadline,
            server_offset,
        });
        &self.queries[idx]
    }

    /// Returns the query with transaction ID `id`.
    pub fn find_by_id(&self, id: u16) -> Option<&PendingQuery> {
        self.queries.iter().find(|query| query.id == id)
    }

    /// Removes the query with transaction ID `id`.
    pub fn take_by_id(&mut self, id: u16) -> Option<PendingQuery> {
        let idx = self.queries.iter().position(|query| query.id == id)?;
        Some(self.queries.swap_remove(idx))
    }

    /// Removes the query for `qname` and `qtype`.
    pub fn cancel(
        &mut self,
        qname: &str,
        qtype: Rtype,
    ) -> Option<PendingQuery> {
        let qname = name::normalize(qname);
        let idx = self
            .queries
            .iter()
            .position(|query| query.matches(&qname, qtype))?;
        Some(self.queries.swap_remove(idx))
    }

    /// Returns the earliest retransmit deadline.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.queries.iter().map(|query| query.deadline).min()
    }

    /// Advances all queries whose deadline has passed.
    ///
    /// Queries that have been retransmitted `max_retries` times already are
    /// removed and returned as timed out. All others advance to the next
    /// step and get a new deadline from `backoff`; they are returned as due
    /// for retransmission.
    pub fn advance(
        &mut self,
        now: Duration,
        max_retries: u8,
        backoff: impl Fn(u8) -> Duration,
    ) -> Advanced {
        let mut res = Advanced::default();
        let mut idx = 0;
        while idx < self.queries.len() {
            if self.queries[idx].deadline > now {
                idx += 1;
                continue;
            }
            if self.queries[idx].step >= max_retries {
                res.timed_out.push(self.queries.swap_remove(idx));
                continue;
            }
            let query = &mut self.queries[idx];
            query.step += 1;
            query.deadline = now + backoff(query.step);
            res.due.push(query.clone());
            idx += 1;
        }
        res
    }

    /// Marks `qname` and `qtype` as failed until `until`.
    pub fn mark_failed(&mut self, qname: &str, qtype: Rtype, until: u64) {
        self.failures.insert((name::normalize(qname), qtype), until);
    }

    /// Returns whether `qname` and `qtype` are marked as failed at `now`.
    pub fn is_failed(&self, qname: &str, qtype: Rtype, now: u64) -> bool {
        self.failures
            .get(&(name::normalize(qname), qtype))
            .map(|until| *until > now)
            .unwrap_or(false)
    }

    /// Forgets failure markers that have run out.
    pub fn sweep_failures(&mut self, now: u64) {
        self.failures.retain(|_, until| *until > now)
    }
}

impl Default for QueryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

//------------ Advanced ------------------------------------------------------

/// The outcome of [`QueryRegistry::advance`].
#[derive(Clone, Debug, Default)]
pub struct Advanced {
    /// Queries to retransmit now.
    pub due: Vec<PendingQuery>,

    /// Queries that have run out of retransmissions.
    pub timed_out: Vec<PendingQuery>,
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    fn secs(secs: u64) -> Duration {
        Duration::from_secs(secs)
    }

    #[test]
    fn register_and_find() {
        let mut queries = QueryRegistry::with_first_id(0xfffe);
        let id = queries
            .register("Foo.com.", Rtype::A, 10, secs(11), false)
            .id();
        assert_eq!(id, 0xfffe);
        queries.register("foo.com", Rtype::AAAA, 10, secs(11), false);
        queries.register("bar.com", Rtype::A, 10, secs(11), false);
        assert_eq!(queries.len(), 3);
        assert_eq!(queries.find_by_id(0xffff).unwrap().qtype(), Rtype::AAAA);
        assert_eq!(queries.find_by_id(0).unwrap().qname(), "bar.com");
        assert_eq!(queries.find_by_type("foo.com", Rtype::A).unwrap().id(), id);
        assert!(queries.find_by_type("foo.com", Rtype::MX).is_none());
        assert!(queries.find_by_id(1).is_none());
    }

    #[test]
    fn restart_keeps_start_time() {
        let mut queries = QueryRegistry::with_first_id(1);
        queries.register("foo.com", Rtype::A, 10, secs(1), false);
        queries.advance(secs(1), 4, |_| secs(2));
        assert_eq!(
            queries.find_by_type("foo.com", Rtype::A).unwrap().step(),
            1
        );
        assert!(queries.restart("foo.com", Rtype::A));
        let query = queries.find_by_type("foo.com", Rtype::A).unwrap();
        assert_eq!(query.step(), 0);
        assert_eq!(query.started(), 10);
        assert_eq!(queries.len(), 1);
        assert!(!queries.restart("bar.com", Rtype::A));
    }

    #[test]
    fn ids_in_use_are_skipped() {
        let mut queries = QueryRegistry::with_first_id(5);
        queries.register("a.example", Rtype::A, 0, secs(1), false);
        queries.next_id = 5;
        assert_eq!(queries.peek_id(), 6);
        let query = queries.register("b.example", Rtype::A, 0, secs(1), false);
        assert_eq!(query.id(), 6);
    }

    #[test]
    fn advance_and_time_out() {
        let mut queries = QueryRegistry::with_first_id(1);
        queries.register("foo.com", Rtype::A, 0, secs(1), false);
        queries.register("bar.com", Rtype::A, 0, secs(5), false);

        let backoff = |step: u8| secs(u64::from(step) * 10);
        let res = queries.advance(secs(1), 2, backoff);
        assert_eq!(res.due.len(), 1);
        assert_eq!(res.due[0].qname(), "foo.com");
        assert_eq!(res.due[0].deadline(), secs(11));
        assert_eq!(queries.next_deadline(), Some(secs(5)));

        let res = queries.advance(secs(11), 2, backoff);
        assert_eq!(res.due.len(), 2);
        let res = queries.advance(secs(31), 2, backoff);
        assert_eq!(res.timed_out.len(), 1);
        assert_eq!(res.due.len(), 1);
        assert_eq!(res.due[0].qname(), "bar.com");
        assert_eq!(res.timed_out[0].qname(), "foo.com");
        assert_eq!(queries.len(), 1);
    }

    #[test]
    fn server_rotation() {
        let mut queries = QueryRegistry::with_first_id(1);
        queries.register("foo.com", Rtype::A, 0, secs(1), false);
        queries.register("bar.com", Rtype::A, 0, secs(1), true);
        let foo = queries.find_by_type("foo.com", Rtype::A).unwrap();
        assert_eq!(foo.server_index(2), 0);
        let bar = queries.find_by_type("bar.com", Rtype::A).unwrap();
        assert_eq!(bar.server_index(2), 1);
        queries.advance(secs(1), 4, |_| secs(1));
        let foo = queries.find_by_type("foo.com", Rtype::A).unwrap();
        assert_eq!(foo.server_index(2), 1);
        assert_eq!(foo.server_index(0), 0);
    }

    #[test]
    fn failures() {
        let mut queries = QueryRegistry::with_first_id(1);
        queries.mark_failed("foo.com", Rtype::A, 30);
        assert!(queries.is_failed("FOO.com", Rtype::A, 29));
        assert!(!queries.is_failed("foo.com", Rtype::A, 30));
        assert!(!queries.is_failed("foo.com", Rtype::AAAA, 0));

        queries.register("foo.com", Rtype::A, 0, secs(1), false);
        assert!(!queries.is_failed("foo.com", Rtype::A, 0));

        queries.mark_failed("bar.com", Rtype::A, 30);
        queries.sweep_failures(30);
        assert!(queries.failures.is_empty());
    }

    #[test]
    fn cancel() {
        let mut queries = QueryRegistry::with_first_id(1);
        queries.register("foo.com", Rtype::A, 0, secs(1), false);
        assert_eq!(queries.cancel("foo.com", Rtype::A).unwrap().id(), 1);
        assert!(queries.cancel("foo.com", Rtype::A).is_none());
        assert!(queries.is_empty());
    }
}
