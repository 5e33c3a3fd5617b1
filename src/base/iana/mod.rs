//! IANA Definitions for DNS.
//!
//! This module contains types for parameters defined in IANA registries
//! that are relevant for the resolver.
//!
//! All types defined hereunder follow the same basic structure. They are
//! newtypes around the raw integer with associated constants for the
//! well-defined values, so any value received from the wire can be
//! represented. There are two methods `from_int()` and `to_int()` to convert
//! from and to raw integer values as well as implementations of the `From`
//! trait for these. `FromStr` and `Display` convert from the mnemonics to the
//! values and back.
//!
//! Each type has a module of its own which also holds its `FromStrError`.
//! The types themselves are re-exported here.

pub use self::class::Class;
pub use self::opcode::Opcode;
pub use self::rcode::Rcode;
pub use self::rtype::Rtype;

#[macro_use]
mod macros;

pub mod class;
pub mod opcode;
pub mod rcode;
pub mod rtype;
