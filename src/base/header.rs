//! The header of a DNS message.
//!
//! Each DNS message starts with a twelve octet long header section
//! containing some general information related to the message as well as
//! the number of records in each of the four sections that follow the header.
//! Its content and format are defined in section 4.1.1 of [RFC 1035].
//!
//! The header is split into two types: [`Header`] contains the ID, opcode,
//! rcode, and flags at the beginning and [`HeaderCounts`] contains the
//! section counts. The [`HeaderSection`] type wraps both of them into a
//! single type.
//!
//! [RFC 1035]: https://tools.ietf.org/html/rfc1035

use super::iana::{Opcode, Rcode};
use super::wire::{Compose, Parse, ParseError};
use bytes::BufMut;
use octseq::parse::Parser;

//------------ Header --------------------------------------------------

/// The first part of the header of a DNS message.
///
/// This type represents the information contained in the first four octets
/// of the header: the message ID, opcode, rcode, and the various flags. It
/// keeps those four octets in wire representation, i.e., in network byte
/// order. The data is layed out like this:
///
/// ```text
///                                 1  1  1  1  1  1
///   0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |                      ID                       |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// |QR|   Opcode  |AA|TC|RD|RA|Z |AD|CD|   RCODE   |
/// +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Header {
    /// The actual header in its wire format representation.
    inner: [u8; 4],
}

impl Header {
    /// Creates a new header.
    ///
    /// The new header has all fields as either zero or false. Thus, the
    /// opcode will be [`Opcode::QUERY`] and the response code will be
    /// [`Rcode::NOERROR`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of the ID field.
    pub fn id(self) -> u16 {
        u16::from_be_bytes([self.inner[0], self.inner[1]])
    }

    /// Sets the value of the ID field.
    pub fn set_id(&mut self, value: u16) {
        self.inner[..2].copy_from_slice(&value.to_be_bytes())
    }

    /// Returns whether the QR bit is set, i.e., the message is a response.
    pub fn qr(self) -> bool {
        self.get_bit(2, 7)
    }

    /// Sets the value of the QR bit.
    pub fn set_qr(&mut self, set: bool) {
        self.set_bit(2, 7, set)
    }

    /// Returns the value of the Opcode field.
    pub fn opcode(self) -> Opcode {
        Opcode::from_int((self.inner[2] >> 3) & 0x0F)
    }

    /// Sets the value of the opcode field.
    pub fn set_opcode(&mut self, opcode: Opcode) {
        self.inner[2] = self.inner[2] & 0x87 | ((opcode.to_int() & 0x0F) << 3);
    }

    /// Returns whether the AA bit is set.
    pub fn aa(self) -> bool {
        self.get_bit(2, 2)
    }

    /// Returns whether the TC bit is set.
    pub fn tc(self) -> bool {
        self.get_bit(2, 1)
    }

    /// Sets the value of the TC bit.
    pub fn set_tc(&mut self, set: bool) {
        self.set_bit(2, 1, set)
    }

    /// Returns whether the RD bit is set.
    pub fn rd(self) -> bool {
        self.get_bit(2, 0)
    }

    /// Sets the value of the RD bit.
    pub fn set_rd(&mut self, set: bool) {
        self.set_bit(2, 0, set)
    }

    /// Returns whether the RA bit is set.
    pub fn ra(self) -> bool {
        self.get_bit(3, 7)
    }

    /// Returns the value of the RCODE field.
    pub fn rcode(self) -> Rcode {
        Rcode::masked(self.inner[3])
    }

    /// Sets the value of the RCODE field.
    pub fn set_rcode(&mut self, rcode: Rcode) {
        self.inner[3] = self.inner[3] & 0xF0 | (rcode.to_int() & 0x0F);
    }

    //--- Internal helpers

    /// Returns the value of the bit at the given position.
    ///
    /// The argument `offset` gives the byte offset of the underlying bytes
    /// slice and `bit` gives the number of the bit with the most significant
    /// bit being 7.
    fn get_bit(self, offset: usize, bit: usize) -> bool {
        self.inner[offset] & (1 << bit) != 0
    }

    /// Sets or resets the given bit.
    fn set_bit(&mut self, offset: usize, bit: usize, set: bool) {
        if set {
            self.inner[offset] |= 1 << bit
        } else {
            self.inner[offset] &= !(1 << bit)
        }
    }
}

//------------ HeaderCounts -------------------------------------------------

/// The section count part of the header section of a DNS message.
///
/// This part consists of four 16 bit counters for the number of entries in
/// the four sections of a DNS message.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct HeaderCounts {
    qdcount: u16,
    ancount: u16,
    nscount: u16,
    arcount: u16,
}

impl HeaderCounts {
    /// Creates a new value with all counters set to zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of the QDCOUNT field.
    pub fn qdcount(self) -> u16 {
        self.qdcount
    }

    /// Sets the value of the QDCOUNT field.
    pub fn set_qdcount(&mut self, value: u16) {
        self.qdcount = value
    }

    /// Returns the value of the ANCOUNT field.
    pub fn ancount(self) -> u16 {
        self.ancount
    }

    /// Sets the value of the ANCOUNT field.
    pub fn set_ancount(&mut self, value: u16) {
        self.ancount = value
    }

    /// Returns the value of the NSCOUNT field.
    pub fn nscount(self) -> u16 {
        self.nscount
    }

    /// Sets the value of the NSCOUNT field.
    pub fn set_nscount(&mut self, value: u16) {
        self.nscount = value
    }

    /// Returns the value of the ARCOUNT field.
    pub fn arcount(self) -> u16 {
        self.arcount
    }

    /// Sets the value of the ARCOUNT field.
    pub fn set_arcount(&mut self, value: u16) {
        self.arcount = value
    }

    /// Returns the number of records in all three record sections.
    pub fn rr_count(self) -> usize {
        usize::from(self.ancount)
            + usize::from(self.nscount)
            + usize::from(self.arcount)
    }
}

//------------ HeaderSection -------------------------------------------------

/// The complete header section of a DNS message.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct HeaderSection {
    header: Header,
    counts: HeaderCounts,
}

impl HeaderSection {
    /// The length of the header section in octets.
    pub const LEN: usize = 12;

    /// Creates a new header section with all fields zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the header part.
    pub fn header(&self) -> Header {
        self.header
    }

    /// Returns a mutable reference to the header part.
    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    /// Returns the counts part.
    pub fn counts(&self) -> HeaderCounts {
        self.counts
    }

    /// Returns a mutable reference to the counts part.
    pub fn counts_mut(&mut self) -> &mut HeaderCounts {
        &mut self.counts
    }

    /// Parses a header section from the beginning of a parser.
    pub fn parse(parser: &mut Parser<'_, [u8]>) -> Result<Self, ParseError> {
        let mut inner = [0u8; 4];
        parser.parse_buf(&mut inner)?;
        Ok(HeaderSection {
            header: Header { inner },
            counts: HeaderCounts {
                qdcount: u16::parse(parser)?,
                ancount: u16::parse(parser)?,
                nscount: u16::parse(parser)?,
                arcount: u16::parse(parser)?,
            },
        })
    }

    /// Appends the wire format of the header section to `target`.
    pub fn compose<B: BufMut>(&self, target: &mut B) {
        target.put_slice(&self.header.inner);
        self.counts.qdcount.compose(target);
        self.counts.ancount.compose(target);
        self.counts.nscount.compose(target);
        self.counts.arcount.compose(target);
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn flags_and_fields() {
        let mut header = Header::new();
        header.set_id(0x1234);
        header.set_rd(true);
        header.set_opcode(Opcode::UPDATE);
        header.set_rcode(Rcode::NXDOMAIN);
        assert_eq!(header.id(), 0x1234);
        assert!(header.rd());
        assert!(!header.qr());
        assert_eq!(header.opcode(), Opcode::UPDATE);
        assert_eq!(header.rcode(), Rcode::NXDOMAIN);
        header.set_qr(true);
        assert!(header.qr());
        assert_eq!(header.opcode(), Opcode::UPDATE);
    }

    #[test]
    fn parse_section() {
        let data = [
            0xab, 0xcd, 0x81, 0x83, 0, 1, 0, 2, 0, 3, 0, 4,
        ];
        let mut parser = Parser::from_ref(&data[..]);
        let section = HeaderSection::parse(&mut parser).unwrap();
        assert_eq!(section.header().id(), 0xabcd);
        assert!(section.header().qr());
        assert!(section.header().rd());
        assert!(section.header().ra());
        assert_eq!(section.header().opcode(), Opcode::QUERY);
        assert_eq!(section.header().rcode(), Rcode::NXDOMAIN);
        assert_eq!(section.counts().qdcount(), 1);
        assert_eq!(section.counts().rr_count(), 9);
        assert_eq!(parser.remaining(), 0);

        let mut out = Vec::new();
        section.compose(&mut out);
        assert_eq!(out, data);
    }

    #[test]
    fn short_section() {
        let data = [0xab, 0xcd, 0x81];
        let mut parser = Parser::from_ref(&data[..]);
        assert_eq!(
            HeaderSection::parse(&mut parser),
            Err(ParseError::ShortInput)
        );
    }
}
