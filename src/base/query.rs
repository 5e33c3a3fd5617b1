//! Building query messages.

use super::header::HeaderSection;
use super::iana::{Class, Rtype};
use super::name;
use super::wire::{Compose, ComposeError};
use bytes::{Bytes, BytesMut};

//------------ Configuration Constants ----------------------------------------

/// The maximum size of a query message.
///
/// Queries are sent over UDP without EDNS, so they must stay below the
/// classic 512 octet limit. Names long enough to hit this are refused.
pub const MAX_QUERY_LEN: usize = 500;

//------------ encode_query --------------------------------------------------

/// Creates the wire format of a query for `qname` and `qtype`.
///
/// The query has the given ID, the RD bit set, and a single question with
/// class IN. Record types the resolver cannot decode are asked for as ANY
/// (see [`Rtype::qtype`]).
///
/// Fails if the name is malformed or the message would be longer than
/// [`MAX_QUERY_LEN`]. Nothing is produced in this case.
pub fn encode_query(
    qname: &str,
    qtype: Rtype,
    id: u16,
) -> Result<Bytes, ComposeError> {
    let len = HeaderSection::LEN
        + name::compose_len(qname)?
        + usize::from(u16::COMPOSE_LEN) * 2;
    if len > MAX_QUERY_LEN {
        return Err(ComposeError::Overflow);
    }

    let mut target = BytesMut::with_capacity(len);
    let mut section = HeaderSection::new();
    section.header_mut().set_id(id);
    section.header_mut().set_rd(true);
    section.counts_mut().set_qdcount(1);
    section.compose(&mut target);
    name::compose_name(qname, &mut target)?;
    qtype.qtype().compose(&mut target);
    Class::IN.compose(&mut target);
    debug_assert_eq!(target.len(), len);
    Ok(target.freeze())
}

//============ Testing =======================================================
