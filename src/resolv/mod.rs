//! An asynchronous caching stub resolver.
//!
//! The resolver sends queries over UDP to the servers listed in a
//! [`ResolvConf`], caches every record it learns per domain name, and
//! answers [`Lookup`]s from that cache. Lookups never block. A lookup
//! whose data is missing triggers a query and is notified once something
//! changed for any of the names it depends on.
//!
//! All state lives in a [`ResolverEngine`]. The engine doesn’t do any I/O
//! on its own initiative: it needs to be told when its socket is readable
//! and when its timer fired. With the `net` feature, the [`Driver`] does
//! this on a tokio runtime.
//!
//! ```no_run
//! # #[cfg(feature = "net")]
//! # async fn run() -> std::io::Result<()> {
//! use dnsq::base::Rtype;
//! use dnsq::resolv::{Driver, Lookup};
//!
//! let (engine, driver) = Driver::system().await?;
//! tokio::spawn(driver.run());
//! let lookup = Lookup::new(&engine, "www.example.com", Rtype::A);
//! lookup.start();
//! while lookup.addresses().is_empty() && !lookup.status().is_finished() {
//!     lookup.changed().await;
//! }
//! println!("{:?}", lookup.addresses());
//! # Ok(())
//! # }
//! ```

pub use self::cache::{DomainCache, DomainEntry, DomainId, SweepReport};
pub use self::clock::{Clock, FakeClock, SystemClock};
pub use self::conf::ResolvConf;
pub use self::config::Config;
#[cfg(feature = "net")]
pub use self::driver::Driver;
pub use self::engine::ResolverEngine;
pub use self::lookup::{
    literal_address, reverse_name, Lookup, LookupId, Status,
};
pub use self::pending::{PendingQuery, QueryRegistry};
pub use self::socket::{DgramSocket, MemorySocket};

pub mod cache;
pub mod clock;
pub mod conf;
pub mod config;
#[cfg(feature = "net")]
pub mod driver;
pub mod engine;
pub mod lookup;
pub mod pending;
pub mod socket;
