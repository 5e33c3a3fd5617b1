//! Resource Record (RR) TYPEs

//------------ Rtype ---------------------------------------------------------

int_enum! {
    /// Resource Record Types.
    ///
    /// Each resource records has a 16 bit type value indicating what kind of
    /// information is represented by the record. Queries include the type of
    /// record information that is requested.
    ///
    /// Only the types the resolver knows how to query for and to decode are
    /// given names here. Any other value can still be represented and is
    /// skipped over when found in an answer.
    ///
    /// In order to avoid confusion over capitalization, the mnemonics are
    /// treated as single acronyms and therefore all variant names are spelled
    /// with an initial capital letter in accordance with the Rust naming
    /// guidelines.
    =>
    Rtype, u16;

    /// No type at all.
    ///
    /// The value is reserved on the wire. The cache uses it to mark records
    /// that are logically dead and only wait for the next sweep.
    (NONE => 0, "NONE")

    /// A host address.
    (A => 1, "A")

    /// An authoritative name server.
    (NS => 2, "NS")

    /// The canonical name for an alias
    (CNAME => 5, "CNAME")

    /// Marks the start of a zone of authority.
    (SOA => 6, "SOA")

    /// A domain name pointer.
    (PTR => 12, "PTR")

    /// Mail exchange.
    (MX => 15, "MX")

    /// Text strings.
    (TXT => 16, "TXT")

    /// IPv6 address.
    (AAAA => 28, "AAAA")

    /// Server selection.
    (SRV => 33, "SRV")

    /// A request for all records the server/cache has available.
    (ANY => 255, "ANY")
}

int_enum_str_with_decimal!(Rtype, u16, "unknown record type");

impl Rtype {
    /// Returns the type to put into the question of a query.
    ///
    /// Only the record types the resolver can decode are asked for
    /// directly. Everything else, including [`Rtype::NONE`], is turned into
    /// a query for [`Rtype::ANY`].
    #[must_use]
    pub fn qtype(self) -> Self {
        match self {
            Rtype::A
            | Rtype::AAAA
            | Rtype::MX
            | Rtype::SRV
            | Rtype::CNAME
            | Rtype::PTR
            | Rtype::TXT => self,
            _ => Rtype::ANY,
        }
    }

    /// Returns whether the resolver can decode records of this type.
    #[must_use]
    pub fn is_supported(self) -> bool {
        self.qtype() != Rtype::ANY
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use core::str::FromStr;

    #[test]
    fn qtype_mapping() {
        assert_eq!(Rtype::A.qtype().to_int(), 1);
        assert_eq!(Rtype::AAAA.qtype().to_int(), 28);
        assert_eq!(Rtype::MX.qtype().to_int(), 15);
        assert_eq!(Rtype::SRV.qtype().to_int(), 33);
        assert_eq!(Rtype::CNAME.qtype().to_int(), 5);
        assert_eq!(Rtype::PTR.qtype().to_int(), 12);
        assert_eq!(Rtype::TXT.qtype().to_int(), 16);
        assert_eq!(Rtype::NONE.qtype().to_int(), 255);
        assert_eq!(Rtype::NS.qtype().to_int(), 255);
        assert_eq!(Rtype::from_int(99).qtype(), Rtype::ANY);
    }

    #[test]
    fn from_str_and_display() {
        assert_eq!(Rtype::from_str("aaaa"), Ok(Rtype::AAAA));
        assert_eq!(Rtype::from_str("33"), Ok(Rtype::SRV));
        assert_eq!(Rtype::from_str("1234"), Ok(Rtype::from_int(1234)));
        assert!(Rtype::from_str("bogus").is_err());
        assert_eq!(format!("{}", Rtype::MX), "MX");
        assert_eq!(format!("{}", Rtype::from_int(99)), "99");
        assert_eq!(format!("{:?}", Rtype::TXT), "Rtype::TXT");
    }
}
