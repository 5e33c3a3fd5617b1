//! Looks up host names and addresses like the `host` utility.
use dnsq::base::Rtype;
use dnsq::resolv::{Driver, Lookup, ResolverEngine, Status};
use std::env;
use std::net::IpAddr;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// Waits until the lookup is finished.
async fn finish(lookup: &Lookup) -> Status {
    lookup.start();
    loop {
        let status = lookup.status();
        if status.is_finished() {
            return status;
        }
        lookup.changed().await
    }
}

async fn forward(engine: &ResolverEngine, name: &str) {
    for rtype in [Rtype::A, Rtype::AAAA, Rtype::MX] {
        let lookup = engine.lookup(name, rtype);
        if finish(&lookup).await == Status::Failed {
            println!("{} {}: timed out", name, rtype);
            continue;
        }
        if lookup.is_nxdomain() {
            println!("Host {} not found: 3(NXDOMAIN)", name);
            return;
        }
        if let Some(canonical) = lookup.canonical_name() {
            if rtype == Rtype::A {
                println!("{} is an alias for {}", name, canonical);
            }
        }
        for addr in lookup.addresses() {
            match addr {
                IpAddr::V4(addr) => println!("{} has address {}", name, addr),
                IpAddr::V6(addr) => {
                    println!("{} has IPv6 address {}", name, addr)
                }
            }
        }
        for mx in lookup.mail_servers() {
            println!(
                "{} mail is handled by {} {}",
                name, mx.preference, mx.exchange
            );
        }
    }
}

async fn reverse(engine: &ResolverEngine, addr: IpAddr) {
    let lookup = Lookup::reverse(engine, addr);
    if finish(&lookup).await == Status::Failed {
        println!("{}: timed out", addr);
        return;
    }
    for name in lookup.host_names() {
        println!("{} domain name pointer {}", lookup.label(), name);
    }
}

#[tokio::main()]
async fn main() {
    // Initialize tracing based logging. Override with env var RUST_LOG, e.g.
    // RUST_LOG=trace.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .without_time()
        .try_init()
        .ok();

    let names: Vec<_> = env::args().skip(1).collect();
    if names.is_empty() {
        println!("Usage: lookup <hostname or address> ...");
        return;
    }

    let (engine, driver) = match Driver::system().await {
        Ok(res) => res,
        Err(err) => {
            eprintln!("Cannot start resolver: {}", err);
            return;
        }
    };
    tokio::spawn(driver.run());

    for name in names {
        if let Ok(addr) = IpAddr::from_str(&name) {
            reverse(&engine, addr).await
        } else {
            forward(&engine, &name).await
        }
    }
}
