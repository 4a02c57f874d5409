use anyhow::{anyhow, Context, Result};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use super::{TelemetrySink, TelemetrySnapshot};

/// Fire-and-forget UDP publisher: one JSON datagram per snapshot.
pub struct UdpPublisher {
    target: SocketAddr,
    socket: Option<UdpSocket>,
    sent: u64,
    failed: u64,
}

impl UdpPublisher {
    pub fn new(addr: &str) -> Result<Self> {
        let target = addr
            .to_socket_addrs()
            .with_context(|| format!("resolve telemetry address {}", addr))?
            .next()
            .ok_or_else(|| anyhow!("telemetry address {} resolved to nothing", addr))?;
        Ok(Self {
            target,
            socket: None,
            sent: 0,
            failed: 0,
        })
    }

    pub fn connect(&mut self) -> Result<()> {
        let bind_addr = if self.target.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(bind_addr)
            .with_context(|| format!("bind telemetry socket on {}", bind_addr))?;
        // never let a full send buffer stall the frame loop
        socket
            .set_nonblocking(true)
            .context("set telemetry socket non-blocking")?;
        self.socket = Some(socket);
        log::info!("telemetry: publishing to udp://{}", self.target);
        Ok(())
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// (sent, failed) datagram counts.
    pub fn counts(&self) -> (u64, u64) {
        (self.sent, self.failed)
    }
}

impl TelemetrySink for UdpPublisher {
    fn publish(&mut self, snapshot: &TelemetrySnapshot) -> Result<()> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| anyhow!("telemetry socket not connected"))?;
        let payload = snapshot.to_json().context("serialize telemetry snapshot")?;
        match socket.send_to(payload.as_bytes(), self.target) {
            Ok(_) => {
                self.sent += 1;
                Ok(())
            }
            Err(err) => {
                self.failed += 1;
                Err(anyhow::Error::new(err).context(format!("send telemetry to {}", self.target)))
            }
        }
    }

    fn close(&mut self) {
        if self.socket.take().is_some() {
            log::info!(
                "telemetry: closed (sent={}, failed={})",
                self.sent,
                self.failed
            );
        }
    }
}
