//! Decoding answer messages.
//!
//! The decoder takes a received message together with what was asked for
//! and turns it into the list of resource records the resolver will cache.
//! Only records of class IN and of the supported types are kept. Everything
//! else is skipped over using the record’s data length.
//!
//! Negative answers are turned into records, too: a response with the
//! NXDOMAIN response code and a response that doesn’t contain anything for
//! the question both produce a single negative record so the fact can be
//! cached like any other answer.

use super::header::HeaderSection;
use super::iana::{Class, Opcode, Rcode, Rtype};
use super::name::parse_name;
use super::record::{Mx, RecordData, ResourceRecord, Section, Srv};
use super::wire::{FormError, Parse, ParseError};
use core::fmt;
use octseq::parse::Parser;
use std::net::{Ipv4Addr, Ipv6Addr};
use tracing::{debug, trace};

//------------ Configuration Constants ----------------------------------------

/// TTL below which records from all sections are deleted when they expire.
///
/// Records with a longer TTL found in the authority or additional sections
/// only get their deletion time decided by the next cache sweep.
const SHORT_TTL: u32 = 600;

//------------ Question ------------------------------------------------------

/// What was asked for in the query an answer responds to.
#[derive(Clone, Copy, Debug)]
pub struct Question<'a> {
    /// The normalized query name.
    pub qname: &'a str,

    /// The record type asked for.
    pub qtype: Rtype,

    /// The time the query was first sent, in seconds of the resolver clock.
    pub started: u64,

    /// How long negative answers are to be kept, in seconds.
    pub negative_ttl: u32,
}

//------------ Answer --------------------------------------------------------

/// The records decoded from an answer message.
#[derive(Clone, Debug, Default)]
pub struct Answer {
    records: Vec<ResourceRecord>,
    complete: bool,
}

impl Answer {
    /// Returns the decoded records.
    pub fn records(&self) -> &[ResourceRecord] {
        &self.records
    }

    /// Converts the answer into its records.
    pub fn into_records(self) -> Vec<ResourceRecord> {
        self.records
    }

    /// Returns whether all records of the message were decoded.
    ///
    /// If this is `false`, the message ended early somewhere after the
    /// answer section. The records from the answer section are still there.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Returns whether the answer is an NXDOMAIN answer.
    pub fn is_nxdomain(&self) -> bool {
        self.records.len() == 1 && self.records[0].nxdomain()
    }
}

//------------ decode_answer -------------------------------------------------

/// Decodes the answer message `msg` to `question`.
///
/// The message must repeat the question it answers. A truncated message
/// is only used if its answer section answers the question.
///
/// Expiry times of the records are relative to the time the query was
/// started. Records from the answer section and records with a TTL below
/// ten minutes get the same deletion time. All others get a deletion time
/// of zero, leaving the decision to the cache.
pub fn decode_answer(
    msg: &[u8],
    question: &Question,
) -> Result<Answer, AnswerError> {
    let mut parser = Parser::from_ref(msg);
    let section = HeaderSection::parse(&mut parser)?;
    let header = section.header();
    let counts = section.counts();

    if header.opcode() != Opcode::QUERY {
        return Err(AnswerError::Opcode(header.opcode()));
    }
    if counts.qdcount() != 1 || !parse_question(&mut parser, question)? {
        return Err(AnswerError::Question);
    }
    match header.rcode() {
        Rcode::NOERROR => {}
        Rcode::NXDOMAIN => {
            let until = question
                .started
                .saturating_add(question.negative_ttl.into());
            return Ok(Answer {
                records: vec![ResourceRecord::negative(
                    question.qname,
                    question.qtype,
                    true,
                    until,
                )],
                complete: true,
            });
        }
        rcode => return Err(AnswerError::Rcode(rcode)),
    }

    let ancount = usize::from(counts.ancount());
    let nscount = usize::from(counts.nscount());
    let mut records = Vec::new();
    let mut complete = true;
    for idx in 0..counts.rr_count() {
        let section = if idx < ancount {
            Section::Answer
        } else if idx < ancount + nscount {
            Section::Authority
        } else {
            Section::Additional
        };
        match parse_record(&mut parser, msg, section, question.started) {
            Ok(Some(record)) => {
                trace!("decoded {}", record);
                records.push(record)
            }
            Ok(None) => {}
            Err(err) if section == Section::Answer => {
                return Err(err.into());
            }
            Err(err) => {
                debug!(
                    "answer for {} {} truncated in {:?} section: {}",
                    question.qname, question.qtype, section, err
                );
                complete = false;
                break;
            }
        }
    }

    if header.tc() {
        // The rest didn't fit, so a missing answer proves nothing.
        if !has_answer(&records, question) {
            return Err(AnswerError::Truncated);
        }
        complete = false;
    } else if !has_answer(&records, question) {
        let until = question
            .started
            .saturating_add(question.negative_ttl.into());
        records.push(ResourceRecord::negative(
            question.qname,
            question.qtype,
            false,
            until,
        ));
    }

    Ok(Answer { records, complete })
}

/// Parses the question section and compares it to `question`.
fn parse_question(
    parser: &mut Parser<'_, [u8]>,
    question: &Question,
) -> Result<bool, ParseError> {
    let qname = parse_name(parser)?;
    let qtype = Rtype::parse(parser)?;
    let qclass = Class::parse(parser)?;
    Ok(qname == question.qname
        && qtype == question.qtype.qtype()
        && qclass == Class::IN)
}

/// Returns whether the records answer the question.
///
/// Questions for types that can’t be decoded always count as answered so
/// that no negative record is made up for them.
fn has_answer(records: &[ResourceRecord], question: &Question) -> bool {
    if !question.qtype.is_supported() {
        return true;
    }
    records.iter().any(|record| {
        record.section() == Section::Answer
            && record.owner() == question.qname
            && (record.rtype() == question.qtype
                || record.rtype() == Rtype::CNAME)
    })
}

/// Parses a single resource record.
///
/// Returns `Ok(None)` if the record is of a class or type that isn’t kept.
/// Either way, the parser is positioned after the record.
fn parse_record(
    parser: &mut Parser<'_, [u8]>,
    msg: &[u8],
    section: Section,
    started: u64,
) -> Result<Option<ResourceRecord>, ParseError> {
    let owner = parse_name(parser)?;
    let rtype = Rtype::parse(parser)?;
    let class = Class::parse(parser)?;
    let ttl = u32::parse(parser)?;
    let rdlen = usize::from(u16::parse(parser)?);
    let start = parser.pos();
    if parser.remaining() < rdlen {
        return Err(ParseError::ShortInput);
    }
    let end = start + rdlen;
    parser.seek(end)?;

    if class != Class::IN {
        debug!("skipping {} record of class {}", owner, class);
        return Ok(None);
    }

    // Names in the record data may point anywhere before the data, so the
    // data parser covers the whole message up to the end of the data.
    let mut rdata = Parser::from_ref(&msg[..end]);
    rdata.seek(start)?;
    let data = match rtype {
        Rtype::A => {
            let mut buf = [0u8; 4];
            rdata.parse_buf(&mut buf)?;
            RecordData::A(Ipv4Addr::from(buf))
        }
        Rtype::AAAA => {
            let mut buf = [0u8; 16];
            rdata.parse_buf(&mut buf)?;
            RecordData::Aaaa(Ipv6Addr::from(buf))
        }
        Rtype::CNAME => RecordData::Cname(parse_name(&mut rdata)?),
        Rtype::PTR => RecordData::Ptr(parse_name(&mut rdata)?),
        Rtype::MX => RecordData::Mx(Mx {
            preference: u16::parse(&mut rdata)?,
            exchange: parse_name(&mut rdata)?,
        }),
        Rtype::SRV => RecordData::Srv(Srv {
            priority: u16::parse(&mut rdata)?,
            weight: u16::parse(&mut rdata)?,
            port: u16::parse(&mut rdata)?,
            target: parse_name(&mut rdata)?,
        }),
        Rtype::TXT => RecordData::Txt(parse_txt(&mut rdata)?),
        _ => {
            trace!("skipping {} record for {}", rtype, owner);
            return Ok(None);
        }
    };
    if rdata.remaining() != 0 {
        return Err(FormError::new("trailing record data").into());
    }

    let mut record = ResourceRecord::new(owner, data, section);
    let expire = started.saturating_add(ttl.into());
    let delete = if section == Section::Answer || ttl < SHORT_TTL {
        expire
    } else {
        0
    };
    record.set_times(expire, delete);
    Ok(Some(record))
}

/// Parses the character strings of TXT record data.
fn parse_txt(parser: &mut Parser<'_, [u8]>) -> Result<String, ParseError> {
    let mut text = Vec::new();
    while parser.remaining() > 0 {
        let len = usize::from(parser.parse_u8()?);
        text.extend_from_slice(parser.peek(len)?);
        parser.advance(len)?;
    }
    Ok(String::from_utf8_lossy(&text).into_owned())
}

//============ Error Types ===================================================

//------------ AnswerError ---------------------------------------------------

/// An answer message could not be used.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AnswerError {
    /// The message has an opcode other than QUERY.
    Opcode(Opcode),

    /// The response code signals an error.
    Rcode(Rcode),

    /// The question section doesn’t match the question asked.
    Question,

    /// The message was truncated without answering the question.
    Truncated,

    /// The message is broken before the end of the answer section.
    Parse(ParseError),
}

impl From<ParseError> for AnswerError {
    fn from(err: ParseError) -> Self {
        AnswerError::Parse(err)
    }
}

impl From<octseq::parse::ShortInput> for AnswerError {
    fn from(_: octseq::parse::ShortInput) -> Self {
        AnswerError::Parse(ParseError::ShortInput)
    }
}

impl fmt::Display for AnswerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            AnswerError::Opcode(opcode) => {
                write!(f, "unexpected opcode {}", opcode)
            }
            AnswerError::Rcode(rcode) => write!(f, "error response {}", rcode),
            AnswerError::Question => f.write_str("question mismatch"),
            AnswerError::Truncated => f.write_str("truncated answer"),
            AnswerError::Parse(ref err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for AnswerError {}

//============ Testing =======================================================
