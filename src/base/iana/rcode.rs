//! DNS response codes.

//------------ Rcode ---------------------------------------------------------

int_enum! {
    /// DNS Response Codes.
    ///
    /// The response code of a response indicates what happend on the server
    /// when trying to answer the query. The code is a 4 bit value and part
    /// of the header of a DNS message.
    ///
    /// Only the four bits carried in the header are represented. Extended
    /// response codes need EDNS which the resolver does not speak.
    =>
    Rcode, u8;

    /// No error condition.
    (NOERROR => 0, "NOERROR")

    /// The name server was unable to interpret the query.
    (FORMERR => 1, "FORMERR")

    /// The name server was unable to process this query due to a problem
    /// with the name server.
    (SERVFAIL => 2, "SERVFAIL")

    /// The domain name referenced in the query does not exist.
    ///
    /// Unlike the other codes this one is a regular, cacheable answer.
    (NXDOMAIN => 3, "NXDOMAIN")

    /// The name server does not support the requested kind of query.
    (NOTIMP => 4, "NOTIMP")

    /// The name server refuses to perform the operation for policy reasons.
    (REFUSED => 5, "REFUSED")
}

int_enum_str_with_decimal!(Rcode, u8, "unknown response code");

impl Rcode {
    /// Creates an rcode from the lower four bits of an octet.
    #[must_use]
    pub const fn masked(value: u8) -> Self {
        Rcode::from_int(value & 0x0F)
    }
}
