//! Basics.
//!
//! This module provides the types for working with DNS data the resolver
//! needs: IANA parameter types, the message header, domain names in their
//! presentation form, and resource records of the supported types.
//!
//!
//! ## Parsing and Composing Messages
//!
//! In order to easily distinguish the process of creating and disecting
//! wire-format messages from other forms of representation conversion, we
//! use the term *parsing* for extracting data from a wire-format
//! representation and *composing* for producing such a representation.
//!
//! Both parsing and composing happen on buffers holding a complete DNS
//! message. Parsing uses the `Parser` type from the [octseq] crate over an
//! octets slice. Composing appends to anything implementing
//! [`bytes::BufMut`].
//!
//! The resolver only ever composes one kind of message, a query with a
//! single question, which is done by [`encode_query`]. Likewise, the only
//! messages parsed are answers to those queries which are turned into
//! resource records by [`decode_answer`].
//!
//! [octseq]: https://docs.rs/octseq/

pub use self::answer::{decode_answer, Answer, AnswerError, Question};
pub use self::header::{Header, HeaderCounts, HeaderSection};
pub use self::iana::{Class, Opcode, Rcode, Rtype};
pub use self::query::{encode_query, MAX_QUERY_LEN};
pub use self::record::{Mx, RecordData, ResourceRecord, Section, Srv};
pub use self::wire::{ComposeError, FormError, ParseError};

pub mod answer;
pub mod header;
pub mod iana;
pub mod name;
pub mod query;
pub mod record;
pub mod wire;
