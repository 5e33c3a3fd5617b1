//! A caching asynchronous DNS stub resolver.
//!
//! This crate provides a small stub resolver that sends queries over UDP to
//! the recursive servers configured for the system, caches everything it
//! learns, and hands out non-blocking lookups that are notified when their
//! answer arrives.
//!
//! # Modules
//!
//! * [base] contains the wire format: IANA registries, the message header,
//!   domain names, resource records, as well as encoding queries and
//!   decoding answers.
//! * [resolv] contains the resolver itself: the configuration, the domain
//!   cache, the registry of queries in flight, the resolver engine, and
//!   lookups.
//!
//! # Reference of Feature Flags
//!
//! * `net`: Adds the [`Driver`][resolv::Driver] running a resolver engine
//!   on a [Tokio](https://tokio.rs/) UDP socket. This feature is enabled
//!   by default.
//!
//! Lookups can be awaited without the `net` feature. The engine then needs
//! to be driven by some other means, for instance a non-blocking
//! [`std::net::UdpSocket`] polled by the application.

#![allow(renamed_and_removed_lints)]
#![allow(clippy::unknown_clippy_lints)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod base;
pub mod resolv;
