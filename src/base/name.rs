//! Domain names.
//!
//! The resolver keeps domain names in their textual presentation form:
//! labels separated by dots, all ASCII letters in lower case and without a
//! trailing dot for the root. The empty string is the root name. The
//! functions here convert between that form and the wire format, including
//! following compression pointers when parsing names from a message.

use super::wire::{ComposeError, FormError, ParseError};
use bytes::BufMut;
use octseq::parse::Parser;

//------------ Configuration Constants ----------------------------------------

/// The maximum length of a single label in octets.
pub const MAX_LABEL_LEN: usize = 63;

/// The maximum length of a domain name in wire format.
pub const MAX_NAME_LEN: usize = 255;

//------------ Presentation Form ---------------------------------------------

/// Returns the canonical form of a domain name.
///
/// This removes a single trailing dot and converts all ASCII letters to
/// lower case, which is how names are used as cache keys.
pub fn normalize(name: &str) -> String {
    let name = name.strip_suffix('.').unwrap_or(name);
    name.to_ascii_lowercase()
}

/// Returns the number of dots in a name.
pub fn dot_count(name: &str) -> usize {
    name.strip_suffix('.').unwrap_or(name).matches('.').count()
}

//------------ Composing -----------------------------------------------------

/// Appends the uncompressed wire format of a name to `target`.
///
/// Each label is prefixed by its length and the name is terminated by the
/// empty root label. Returns the number of octets appended.
pub fn compose_name<B: BufMut>(
    name: &str,
    target: &mut B,
) -> Result<usize, ComposeError> {
    let name = name.strip_suffix('.').unwrap_or(name);
    let mut len = 1;
    if !name.is_empty() {
        for label in name.split('.') {
            if label.is_empty() {
                return Err(ComposeError::EmptyLabel);
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(ComposeError::LongLabel);
            }
            len += label.len() + 1;
        }
        for label in name.split('.') {
            // Checked above.
            target.put_u8(label.len() as u8);
            target.put_slice(label.as_bytes());
        }
    }
    target.put_u8(0);
    Ok(len)
}

/// Returns the length of the wire format of a name without composing it.
pub fn compose_len(name: &str) -> Result<usize, ComposeError> {
    compose_name(name, &mut Vec::new())
}

//------------ Parsing -------------------------------------------------------

/// Parses a possibly compressed domain name.
///
/// On success, the parser is positioned right after the name as it appears
/// at the original position, i.e., after the first compression pointer if
/// there is one.
///
/// A compression pointer must point strictly backwards: before the
/// position of the pointer itself and before the target of any pointer
/// followed earlier while parsing this name. Anything else is rejected,
/// which also rules out loops.
pub fn parse_name(parser: &mut Parser<'_, [u8]>) -> Result<String, ParseError> {
    let mut name = String::new();
    let mut wire_len = 1;
    let mut cursor = parser.clone();
    let mut end = None;
    let mut limit = cursor.pos();
    loop {
        let pos = cursor.pos();
        match LabelType::parse(&mut cursor)? {
            LabelType::Normal(0) => break,
            LabelType::Normal(len) => {
                wire_len += len + 1;
                if wire_len > MAX_NAME_LEN {
                    return Err(FormError::new("long domain name").into());
                }
                let label = cursor.peek(len)?;
                if !name.is_empty() {
                    name.push('.');
                }
                name.push_str(&String::from_utf8_lossy(label));
                cursor.advance(len)?;
            }
            LabelType::Compressed(target) => {
                if target >= pos || target >= limit {
                    return Err(
                        FormError::new("invalid compression pointer").into()
                    );
                }
                if end.is_none() {
                    end = Some(cursor.pos());
                }
                limit = target;
                cursor.seek(target)?;
            }
        }
    }
    parser.seek(end.unwrap_or_else(|| cursor.pos()))?;
    name.make_ascii_lowercase();
    Ok(name)
}

//------------ LabelType -----------------------------------------------------

/// The type of a label.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum LabelType {
    /// A normal label with its size in octets.
    Normal(usize),

    /// A compressed label with the position of where to continue.
    Compressed(usize),
}

impl LabelType {
    /// Attempts to take a label type from the beginning of `parser`.
    fn parse(parser: &mut Parser<'_, [u8]>) -> Result<Self, ParseError> {
        let ltype = parser.parse_u8()?;
        match ltype {
            0..=0x3F => Ok(LabelType::Normal(ltype.into())),
            0xC0..=0xFF => {
                let res = usize::from(parser.parse_u8()?);
                let res = res | ((usize::from(ltype) & 0x3F) << 8);
                Ok(LabelType::Compressed(res))
            }
            _ => Err(FormError::new("invalid label type").into()),
        }
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn normalize_names() {
        assert_eq!(normalize("WWW.Example.COM."), "www.example.com");
        assert_eq!(normalize("example.com"), "example.com");
        assert_eq!(normalize("."), "");
        assert_eq!(dot_count("www.example.com."), 2);
        assert_eq!(dot_count("host"), 0);
    }

    #[test]
    fn compose() {
        let mut buf = Vec::new();
        assert_eq!(compose_name("www.example.com", &mut buf), Ok(17));
        assert_eq!(buf, b"\x03www\x07example\x03com\x00");

        let mut buf = Vec::new();
        assert_eq!(compose_name("", &mut buf), Ok(1));
        assert_eq!(buf, b"\x00");

        let mut buf = Vec::new();
        assert_eq!(
            compose_name("a..b", &mut buf),
            Err(ComposeError::EmptyLabel)
        );
        let long = "x".repeat(64);
        assert_eq!(compose_len(&long), Err(ComposeError::LongLabel));
        assert!(buf.is_empty());
    }

    #[test]
    fn parse_uncompressed() {
        let data = b"\x03www\x07Example\x03com\x00rest";
        let mut parser = Parser::from_ref(&data[..]);
        assert_eq!(parse_name(&mut parser).unwrap(), "www.example.com");
        assert_eq!(parser.remaining(), 4);
    }

    #[test]
    fn parse_compressed() {
        // "www.example.com" at 0, "mail" + pointer to "example.com" at 17.
        let data = b"\x03www\x07example\x03com\x00\x04mail\xc0\x04tail";
        let mut parser = Parser::from_ref(&data[..]);
        assert_eq!(parse_name(&mut parser).unwrap(), "www.example.com");
        assert_eq!(parse_name(&mut parser).unwrap(), "mail.example.com");
        assert_eq!(parser.remaining(), 4);
        assert_eq!(parser.peek(4).unwrap(), b"tail");
    }

    #[test]
    fn parse_pointer_only() {
        let data = b"\x07example\x03com\x00\xc0\x00";
        let mut parser = Parser::from_ref(&data[..]);
        parser.seek(13).unwrap();
        assert_eq!(parse_name(&mut parser).unwrap(), "example.com");
        assert_eq!(parser.remaining(), 0);
    }

    #[test]
    fn reject_forward_pointer() {
        let data = b"\xc0\x04\x00\x00\x03com\x00";
        let mut parser = Parser::from_ref(&data[..]);
        assert!(matches!(parse_name(&mut parser), Err(ParseError::Form(_))));
    }

    #[test]
    fn reject_self_pointer() {
        let data = b"\x03www\xc0\x04";
        let mut parser = Parser::from_ref(&data[..]);
        assert!(matches!(parse_name(&mut parser), Err(ParseError::Form(_))));
    }

    #[test]
    fn reject_pointer_loop() {
        // The pointer at 2 goes to 0 whose pointer goes back to 2.
        let data = b"\xc0\x02\xc0\x00";
        let mut parser = Parser::from_ref(&data[..]);
        parser.seek(2).unwrap();
        assert!(matches!(parse_name(&mut parser), Err(ParseError::Form(_))));
    }

    #[test]
    fn reject_reserved_label_type() {
        let data = b"\x41abc";
        let mut parser = Parser::from_ref(&data[..]);
        assert!(matches!(parse_name(&mut parser), Err(ParseError::Form(_))));
    }

    #[test]
    fn short_name() {
        let data = b"\x03ww";
        let mut parser = Parser::from_ref(&data[..]);
        assert_eq!(parse_name(&mut parser), Err(ParseError::ShortInput));
    }
}
