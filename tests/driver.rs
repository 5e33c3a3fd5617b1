#![cfg(feature = "net")]

mod common;

use common::{Query, Reply};
use dnsq::base::Rtype;
use dnsq::resolv::{Config, Driver, ResolvConf, Status};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;

const ADDR: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 1);

/// Starts a server answering every query with an A record.
async fn spawn_server() -> SocketAddr {
    let sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = sock.local_addr().unwrap();
    tokio::spawn(async move {
        let mut buf = [0u8; 512];
        loop {
            let (len, from) = match sock.recv_from(&mut buf).await {
                Ok(res) => res,
                Err(_) => return,
            };
            let query = Query::parse(&buf[..len]);
            let reply = Reply::new(&query, 0)
                .a(&query.qname, 3600, ADDR)
                .finish();
            let _ = sock.send_to(&reply, from).await;
        }
    });
    addr
}

#[tokio::test]
async fn lookup_over_udp() {
    let server = spawn_server().await;
    let (engine, driver) =
        Driver::bind(ResolvConf::with_servers([server]), Config::new())
            .await
            .unwrap();
    assert!(driver.local_addr().unwrap().is_ipv4());
    let runner = tokio::spawn(driver.run());

    let lookup = engine.lookup("www.example.com", Rtype::A);
    assert_eq!(lookup.start(), Status::Active);
    tokio::time::timeout(Duration::from_secs(5), async {
        while !lookup.status().is_finished() {
            lookup.changed().await
        }
    })
    .await
    .unwrap();
    assert_eq!(lookup.status(), Status::Done);
    assert_eq!(lookup.addresses(), [IpAddr::from(ADDR)]);
    runner.abort();
}

#[tokio::test]
async fn idle_driver_shuts_down() {
    let mut config = Config::new();
    config.set_shutdown_when_idle(true);
    let (engine, driver) = Driver::bind(
        ResolvConf::with_servers([
            "127.0.0.1:53".parse::<SocketAddr>().unwrap()
        ]),
        config,
    )
    .await
    .unwrap();
    assert!(engine.is_idle());
    tokio::time::timeout(Duration::from_secs(5), driver.run())
        .await
        .unwrap()
        .unwrap();
}
