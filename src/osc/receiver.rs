//! UDP receiver feeding decoded OSC messages into the router
//!
//! Runs as a single tokio task. Decode failures are logged and skipped; the
//! socket is rebound whenever the connection config changes.

use super::routes::OscRouter;
use super::{OscError, OscResult};
use crate::persistence::ConnectionConfig;
use rosc::{decoder, OscPacket};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const BUFFER_SIZE: usize = 1536;

pub struct OscReceiver {
    router: Arc<OscRouter>,
    connection_rx: watch::Receiver<ConnectionConfig>,
    cancel: CancellationToken,
}

impl OscReceiver {
    pub fn new(
        router: Arc<OscRouter>,
        connection_rx: watch::Receiver<ConnectionConfig>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            router,
            connection_rx,
            cancel,
        }
    }

    /// Binds the configured address
    ///
    /// Fails when the port is taken, which also keeps a second bridge
    /// instance from running.
    pub async fn bind(connection: &ConnectionConfig) -> OscResult<UdpSocket> {
        let addr = connection.receiver_addr();
        let socket = UdpSocket::bind(&addr)
            .await
            .map_err(|e| OscError::InvalidAddress(format!("{}: {}", addr, e)))?;
        info!("OSC receiver listening on {}", addr);
        Ok(socket)
    }

    /// Receives on `socket` until cancelled
    ///
    /// `socket` must be bound to the address currently held by the connection
    /// watch channel.
    pub async fn run(mut self, mut socket: UdpSocket) -> OscResult<()> {
        let mut current = self.connection_rx.borrow_and_update().clone();
        let mut buffer = vec![0u8; BUFFER_SIZE];

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("OSC receiver stopping");
                    break;
                }
                changed = self.connection_rx.changed() => {
                    if changed.is_err() {
                        debug!("Connection config channel closed");
                        // keep receiving on the current socket until cancelled
                        self.cancel.cancelled().await;
                        break;
                    }
                    let next = self.connection_rx.borrow_and_update().clone();
                    if next == current {
                        debug!("Connection config unchanged, keeping OSC socket");
                        continue;
                    }
                    let (rebound, active) = rebind(socket, current, next).await?;
                    socket = rebound;
                    current = active;
                }
                received = socket.recv_from(&mut buffer) => {
                    match received {
                        Ok((len, from)) => {
                            debug!("Received {} bytes from {}", len, from);
                            self.handle_datagram(&buffer[..len]);
                        }
                        Err(e) => warn!("OSC receive failed: {}", e),
                    }
                }
            }
        }
        Ok(())
    }

    fn handle_datagram(&self, datagram: &[u8]) {
        match decoder::decode_udp(datagram) {
            Ok((_, packet)) => route_packet(&self.router, packet),
            Err(e) => warn!("{}", OscError::Decoding(format!("{:?}", e))),
        }
    }
}

/// Moves the receiver from `current` to `next`
///
/// A socket on the same port has to be released before the new bind. If the
/// new address cannot be bound the previous one is restored; failing that the
/// receiver has no socket left and the error is returned.
async fn rebind(
    socket: UdpSocket,
    current: ConnectionConfig,
    next: ConnectionConfig,
) -> OscResult<(UdpSocket, ConnectionConfig)> {
    if next.receiver.port != current.receiver.port {
        return match OscReceiver::bind(&next).await {
            Ok(new_socket) => Ok((new_socket, next)),
            Err(e) => {
                error!("Keeping previous OSC socket: {}", e);
                Ok((socket, current))
            }
        };
    }

    drop(socket);
    match OscReceiver::bind(&next).await {
        Ok(new_socket) => Ok((new_socket, next)),
        Err(e) => {
            error!("Falling back to {}: {}", current.receiver_addr(), e);
            let previous = OscReceiver::bind(&current).await?;
            Ok((previous, current))
        }
    }
}

/// Routes a message or every message nested in a bundle
pub fn route_packet(router: &OscRouter, packet: OscPacket) {
    match packet {
        OscPacket::Message(message) => {
            if !router.dispatch(&message) {
                debug!("No route for {}", message.addr);
            }
        }
        OscPacket::Bundle(bundle) => {
            for content in bundle.content {
                route_packet(router, content);
            }
        }
    }
}
