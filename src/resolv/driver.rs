//! Running the resolver engine on tokio.
//!
//! The [`Driver`] owns a tokio UDP socket shared with a [`ResolverEngine`]
//! and runs the engine: it waits for the socket to become readable and for
//! the engine’s next timer and calls the engine accordingly.

use super::conf::ResolvConf;
use super::config::Config;
use super::engine::ResolverEngine;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::debug;

//------------ Driver --------------------------------------------------------

/// Runs a resolver engine.
pub struct Driver {
    engine: ResolverEngine,
    socket: Arc<UdpSocket>,
}

impl Driver {
    /// Creates an engine and its driver.
    ///
    /// The socket is bound to an unspecified address of the family of the
    /// first configured server and a port picked by the system.
    pub async fn bind(
        mut conf: ResolvConf,
        config: Config,
    ) -> Result<(ResolverEngine, Driver), io::Error> {
        conf.finalize();
        let v4 = conf
            .servers
            .first()
            .map(|addr| addr.is_ipv4())
            .unwrap_or(true);
        let local: SocketAddr = if v4 {
            ([0u8; 4], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = Arc::new(UdpSocket::bind(&local).await?);
        let engine = ResolverEngine::new(conf, config, socket.clone());
        Ok((engine.clone(), Driver { engine, socket }))
    }

    /// Creates an engine and driver using the system configuration.
    pub async fn system() -> Result<(ResolverEngine, Driver), io::Error> {
        let conf = ResolvConf::system();
        let config = Config::from_conf(&conf);
        Self::bind(conf, config).await
    }

    /// Returns the engine.
    pub fn engine(&self) -> &ResolverEngine {
        &self.engine
    }

    /// Returns the local address of the socket.
    pub fn local_addr(&self) -> Result<SocketAddr, io::Error> {
        self.socket.local_addr()
    }

    /// Runs the engine.
    ///
    /// This only returns if the socket fails or, if the engine is
    /// configured to shut down when idle, once the engine is idle.
    pub async fn run(self) -> Result<(), io::Error> {
        let shutdown = self.engine.config().shutdown_when_idle();
        loop {
            if shutdown && self.engine.is_idle() {
                debug!("resolver idle, shutting down");
                return Ok(());
            }
            let wait = self.engine.time_until_timer();
            tokio::select! {
                res = self.socket.readable() => {
                    res?;
                    while self.engine.on_readable() {}
                }
                _ = tokio::time::sleep(wait) => {
                    self.engine.on_timer()
                }
                _ = self.engine.timer_notify().notified() => {}
            }
        }
    }
}
