//! A hand-made name server for the resolver tests.
//!
//! The resolver under test sends its queries into a `MemorySocket` or a
//! real UDP socket. The helpers here pick those queries apart and build
//! answers to them.

#![allow(dead_code)]

use dnsq::base::Rtype;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Appends the uncompressed wire format of `name`.
pub fn push_name(name: &str, target: &mut Vec<u8>) {
    let name = name.strip_suffix('.').unwrap_or(name);
    if !name.is_empty() {
        for label in name.split('.') {
            target.push(label.len() as u8);
            target.extend_from_slice(label.as_bytes());
        }
    }
    target.push(0);
}

//------------ Query ---------------------------------------------------------

/// The interesting parts of a query sent by the resolver.
#[derive(Clone, Debug)]
pub struct Query {
    pub id: u16,
    pub qname: String,
    pub qtype: Rtype,

    /// The header and question section.
    pub wire: Vec<u8>,
}

impl Query {
    /// Picks apart a query.
    ///
    /// Panics if the message isn’t a query with a single question.
    pub fn parse(msg: &[u8]) -> Self {
        assert_eq!(msg[2] & 0x80, 0, "not a query");
        assert_eq!(&msg[4..6], b"\x00\x01", "not a single question");
        let mut pos = 12;
        let mut labels = Vec::new();
        loop {
            let len = usize::from(msg[pos]);
            pos += 1;
            if len == 0 {
                break;
            }
            labels.push(String::from_utf8(msg[pos..pos + len].into()).unwrap());
            pos += len;
        }
        let qtype =
            Rtype::from_int(u16::from_be_bytes([msg[pos], msg[pos + 1]]));
        Query {
            id: u16::from_be_bytes([msg[0], msg[1]]),
            qname: labels.join("."),
            qtype,
            wire: msg[..pos + 4].into(),
        }
    }
}

//------------ Reply ---------------------------------------------------------

/// Builds an answer to a query.
///
/// All records end up in the answer section.
pub struct Reply {
    msg: Vec<u8>,
    ancount: u16,
}

impl Reply {
    /// Starts an answer with the given response code.
    pub fn new(query: &Query, rcode: u8) -> Self {
        let mut msg = query.wire.clone();
        msg[2] |= 0x80;
        msg[3] = 0x80 | (rcode & 0x0F);
        Reply { msg, ancount: 0 }
    }

    /// Changes the ID of the answer.
    pub fn id(mut self, id: u16) -> Self {
        self.msg[..2].copy_from_slice(&id.to_be_bytes());
        self
    }

    /// Sets the TC bit.
    pub fn tc(mut self) -> Self {
        self.msg[2] |= 0x02;
        self
    }

    /// Adds a record with raw data.
    pub fn record(
        mut self,
        owner: &str,
        rtype: Rtype,
        ttl: u32,
        rdata: &[u8],
    ) -> Self {
        push_name(owner, &mut self.msg);
        self.msg.extend_from_slice(&rtype.to_int().to_be_bytes());
        self.msg.extend_from_slice(b"\x00\x01");
        self.msg.extend_from_slice(&ttl.to_be_bytes());
        self.msg
            .extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        self.msg.extend_from_slice(rdata);
        self.ancount += 1;
        self
    }

    pub fn a(self, owner: &str, ttl: u32, addr: Ipv4Addr) -> Self {
        self.record(owner, Rtype::A, ttl, &addr.octets())
    }

    pub fn aaaa(self, owner: &str, ttl: u32, addr: Ipv6Addr) -> Self {
        self.record(owner, Rtype::AAAA, ttl, &addr.octets())
    }

    pub fn cname(self, owner: &str, ttl: u32, target: &str) -> Self {
        let mut rdata = Vec::new();
        push_name(target, &mut rdata);
        self.record(owner, Rtype::CNAME, ttl, &rdata)
    }

    pub fn mx(
        self,
        owner: &str,
        ttl: u32,
        preference: u16,
        exchange: &str,
    ) -> Self {
        let mut rdata = preference.to_be_bytes().to_vec();
        push_name(exchange, &mut rdata);
        self.record(owner, Rtype::MX, ttl, &rdata)
    }

    pub fn ptr(self, owner: &str, ttl: u32, target: &str) -> Self {
        let mut rdata = Vec::new();
        push_name(target, &mut rdata);
        self.record(owner, Rtype::PTR, ttl, &rdata)
    }

    /// Returns the finished message.
    pub fn finish(mut self) -> Vec<u8> {
        self.msg[6..8].copy_from_slice(&self.ancount.to_be_bytes());
        self.msg
    }
}
