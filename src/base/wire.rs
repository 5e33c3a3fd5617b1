//! Creating and consuming data in wire format.

use bytes::BufMut;
use core::fmt;
use octseq::parse::{Parser, ShortInput};

//------------ Compose -------------------------------------------------------

/// A type that knows how to append its wire format to a buffer.
pub trait Compose {
    /// The length in octets of the wire format.
    const COMPOSE_LEN: u16 = 0;

    /// Appends the wire format of `self` to `target`.
    fn compose<B: BufMut>(&self, target: &mut B);
}

impl<T: Compose + ?Sized> Compose for &T {
    const COMPOSE_LEN: u16 = T::COMPOSE_LEN;

    fn compose<B: BufMut>(&self, target: &mut B) {
        (*self).compose(target)
    }
}

impl Compose for u8 {
    const COMPOSE_LEN: u16 = 1;

    fn compose<B: BufMut>(&self, target: &mut B) {
        target.put_u8(*self)
    }
}

impl Compose for u16 {
    const COMPOSE_LEN: u16 = 2;

    fn compose<B: BufMut>(&self, target: &mut B) {
        target.put_u16(*self)
    }
}

impl Compose for u32 {
    const COMPOSE_LEN: u16 = 4;

    fn compose<B: BufMut>(&self, target: &mut B) {
        target.put_u32(*self)
    }
}

//------------ Parse ---------------------------------------------------------

/// A type that can extract a value from a parser.
///
/// All parsing in the resolver happens on a received datagram held as a
/// plain octets slice, so the trait is fixed to parsers over `[u8]`.
pub trait Parse: Sized {
    /// Extracts a value from the beginning of `parser`.
    ///
    /// If parsing fails and an error is returned, the parser’s position
    /// should be considered to be undefined.
    fn parse(parser: &mut Parser<'_, [u8]>) -> Result<Self, ParseError>;

    /// Skips over a value of this type at the beginning of `parser`.
    fn skip(parser: &mut Parser<'_, [u8]>) -> Result<(), ParseError>;
}

impl Parse for u8 {
    fn parse(parser: &mut Parser<'_, [u8]>) -> Result<Self, ParseError> {
        parser.parse_u8().map_err(Into::into)
    }

    fn skip(parser: &mut Parser<'_, [u8]>) -> Result<(), ParseError> {
        parser.advance(1).map_err(Into::into)
    }
}

impl Parse for u16 {
    fn parse(parser: &mut Parser<'_, [u8]>) -> Result<Self, ParseError> {
        parser.parse_u16_be().map_err(Into::into)
    }

    fn skip(parser: &mut Parser<'_, [u8]>) -> Result<(), ParseError> {
        parser.advance(2).map_err(Into::into)
    }
}

impl Parse for u32 {
    fn parse(parser: &mut Parser<'_, [u8]>) -> Result<Self, ParseError> {
        parser.parse_u32_be().map_err(Into::into)
    }

    fn skip(parser: &mut Parser<'_, [u8]>) -> Result<(), ParseError> {
        parser.advance(4).map_err(Into::into)
    }
}

//============ Error Types ===================================================

//------------ ComposeError --------------------------------------------------

/// An error happened while composing a query.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ComposeError {
    /// A label of the name is longer than 63 octets.
    LongLabel,

    /// The name contains an empty label, i.e., two dots in a row.
    EmptyLabel,

    /// The message would exceed the size limit for queries.
    Overflow,
}

impl fmt::Display for ComposeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ComposeError::LongLabel => f.write_str("long label"),
            ComposeError::EmptyLabel => f.write_str("empty label"),
            ComposeError::Overflow => {
                f.write_str("query exceeds maximum message size")
            }
        }
    }
}

impl std::error::Error for ComposeError {}

//------------ ParseError ----------------------------------------------------

/// An error happened while parsing data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseError {
    /// An attempt was made to go beyond the end of the parser.
    ShortInput,

    /// A formatting error occurred.
    Form(FormError),
}

impl ParseError {
    /// Creates a new parse error as a form error with the given message.
    pub fn form_error(msg: &'static str) -> Self {
        FormError::new(msg).into()
    }
}

//--- From

impl From<ShortInput> for ParseError {
    fn from(_: ShortInput) -> Self {
        ParseError::ShortInput
    }
}

impl From<FormError> for ParseError {
    fn from(err: FormError) -> Self {
        ParseError::Form(err)
    }
}

//--- Display and Error

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ParseError::ShortInput => f.write_str("unexpected end of input"),
            ParseError::Form(ref err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for ParseError {}

//------------ FormError -----------------------------------------------------

/// A formatting error occured.
///
/// This is a generic error for all kinds of error cases that result in data
/// not being accepted. For diagnostics, the error is being given a static
/// string describing the error.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FormError(&'static str);

impl FormError {
    /// Creates a new form error value with the given diagnostics string.
    pub fn new(msg: &'static str) -> Self {
        FormError(msg)
    }
}

//--- Display and Error

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for FormError {}
