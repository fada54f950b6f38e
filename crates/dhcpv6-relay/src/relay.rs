//! The relay engine: configuration, the event loop, and the forward path.

use std::{
    io,
    net::{Ipv6Addr, SocketAddr},
};

use bytes::{Bytes, BytesMut};
use dhcpv6_relay_proto::{
    message::{MessageType, SERVER_PORT},
    option::{OptionCode, OptionTooLong, RelayOption},
    relay::RelayForward,
    wire_encoding::WireEncodeVec,
};
use tokio::{
    net::{lookup_host, UdpSocket},
    sync::mpsc,
};
use tracing::{debug, error, info, warn};

use crate::{
    link::Link,
    policy::{self, Verdict},
    sockets::{self, BindError, Listener, ListenerSet},
};

/// The fixed capacity of the receive buffer.
///
/// An inbound datagram filling the buffer is treated as a protocol violation
/// and dropped, never truncated.
pub const MAX_DATAGRAM_SIZE: usize = 1024;

/// Errors occurring while configuring the upstream server.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Resolving the server host failed.
    #[error("unable to resolve DHCPv6 server address {host}")]
    Resolution {
        /// The host string that failed to resolve.
        host: String,
        #[source]
        source: io::Error,
    },
    /// The server host resolved, but to no usable address.
    #[error("DHCPv6 server {host} did not resolve to an IP address")]
    NoUsableAddress {
        /// The host string that resolved to nothing.
        host: String,
    },
}

/// A lifecycle notification for the point-to-point link, delivered by the
/// embedder to [`Relay::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// The link came up; the relay binds its listener sockets.
    Up,
    /// The link went down; the relay closes all of its sockets.
    Down,
}

macro_rules! log_err {
    ($message:expr) => {
        |err| {
            tracing::error!(%err, $message);
            err
        }
    };
}

enum Wake {
    Event(Option<LinkEvent>),
    Readable(Listener, io::Result<()>),
}

/// The DHCPv6 relay for one point-to-point link.
///
/// The relay owns all of its sockets and buffers and mutates them only from
/// within [`Self::run`] or the explicit lifecycle methods, so no locking is
/// involved: one task drives the whole pipeline, and every inbound datagram
/// is processed to completion before the next event is looked at.
///
/// The upstream socket is send-only; RELAY-REPL responses from the server
/// are currently not read or forwarded back to the client.
#[derive(Debug)]
pub struct Relay<L> {
    link: L,
    server: Option<SocketAddr>,
    trusted: bool,
    listeners: Option<ListenerSet>,
    upstream: Option<UdpSocket>,
    recv_buf: Box<[u8; MAX_DATAGRAM_SIZE]>,
    send_buf: BytesMut,
}

impl<L: Link> Relay<L> {
    /// Creates a relay for the given link, with no server configured and the
    /// link considered untrusted.
    pub fn new(link: L) -> Self {
        Self {
            link,
            server: None,
            trusted: false,
            listeners: None,
            upstream: None,
            recv_buf: Box::new([0; MAX_DATAGRAM_SIZE]),
            send_buf: BytesMut::new(),
        }
    }

    /// Marks the link as trusted or untrusted for relay-wrapped traffic.
    pub fn set_trusted(&mut self, trusted: bool) {
        self.trusted = trusted;
    }

    /// Whether the link is currently marked trusted.
    pub fn trusted(&self) -> bool {
        self.trusted
    }

    /// The currently configured upstream server, if any.
    pub fn server(&self) -> Option<SocketAddr> {
        self.server
    }

    /// Whether the listener sockets are currently bound.
    pub fn is_listening(&self) -> bool {
        self.listeners.is_some()
    }

    /// Resolves `host` and configures it as the upstream server.
    ///
    /// IPv6 results are preferred, but an IPv4-only host is accepted. An
    /// empty host string clears the configuration. Any previously
    /// established upstream socket is discarded, so the next relayed message
    /// connects to the new server.
    pub async fn set_server(&mut self, host: &str) -> Result<(), ConfigError> {
        self.server = None;
        self.upstream = None;

        if host.is_empty() {
            return Ok(());
        }

        let addresses =
            lookup_host((host, SERVER_PORT))
                .await
                .map_err(|source| ConfigError::Resolution {
                    host: host.to_owned(),
                    source,
                })?;

        let mut server = None;
        for address in addresses {
            if server.is_none() || address.is_ipv6() {
                server = Some(address);
            }
            if address.is_ipv6() {
                break;
            }
        }

        let Some(server) = server else {
            return Err(ConfigError::NoUsableAddress {
                host: host.to_owned(),
            });
        };

        info!(server = %server, "using DHCPv6 server");
        self.server = Some(server);
        Ok(())
    }

    /// Configures an already-resolved upstream server address.
    ///
    /// Like [`Self::set_server`], this discards any established upstream
    /// socket.
    pub fn set_server_address(&mut self, server: SocketAddr) {
        self.upstream = None;
        self.server = Some(server);
    }

    /// Brings the relay up: binds the listener sockets on the link's
    /// interface.
    ///
    /// Without a configured server this is a no-op, since the relay has
    /// nowhere to forward to. An already-listening relay replaces its
    /// listener set. On error nothing is left bound.
    pub fn link_up(&mut self) -> Result<(), BindError> {
        if self.server.is_none() {
            debug!("no DHCPv6 server configured, not listening");
            return Ok(());
        }

        self.listeners = Some(ListenerSet::bind(self.link.interface_name())?);
        info!(interface = self.link.interface_name(), "DHCPv6 relay ready");
        Ok(())
    }

    /// Takes the relay down, closing the listener and upstream sockets.
    ///
    /// Safe to call when the relay is already down.
    pub fn link_down(&mut self) {
        self.listeners = None;
        self.upstream = None;
        debug!("DHCPv6 relay down");
    }

    /// Installs pre-bound listener sockets, replacing any current set.
    ///
    /// For embedders that create and bind the sockets themselves instead of
    /// going through [`Self::link_up`].
    pub fn listen_on(&mut self, listeners: ListenerSet) {
        self.listeners = Some(listeners);
    }

    /// Drives the relay until the event channel is closed.
    ///
    /// Link events are applied as they arrive; while the relay is up, each
    /// readiness notification on a listener socket is serviced with a single
    /// non-blocking read.
    pub async fn run(&mut self, mut events: mpsc::Receiver<LinkEvent>) {
        loop {
            let wake = if let Some(listeners) = &self.listeners {
                tokio::select! {
                    event = events.recv() => Wake::Event(event),
                    result = listeners.socket(Listener::LinkLocal).readable() => {
                        Wake::Readable(Listener::LinkLocal, result)
                    }
                    result = listeners.socket(Listener::Multicast).readable() => {
                        Wake::Readable(Listener::Multicast, result)
                    }
                }
            } else {
                Wake::Event(events.recv().await)
            };

            match wake {
                Wake::Event(None) => return,
                Wake::Event(Some(LinkEvent::Up)) => {
                    if let Err(err) = self.link_up() {
                        error!(%err, "failed to bring the DHCPv6 relay up");
                    }
                }
                Wake::Event(Some(LinkEvent::Down)) => self.link_down(),
                Wake::Readable(listener, Ok(())) => {
                    self.service_listener(listener).await;
                }
                Wake::Readable(listener, Err(err)) => {
                    error!(%listener, %err, "listener readiness notification failed");
                }
            }
        }
    }

    /// Reads and processes at most one datagram from the given listener.
    async fn service_listener(&mut self, listener: Listener) {
        let Some(listeners) = &self.listeners else {
            return;
        };

        let (length, source) = match listeners
            .socket(listener)
            .try_recv_from(&mut self.recv_buf[..])
        {
            Ok(received) => received,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => return,
            Err(err) => {
                error!(%listener, %err, "failed to read from listener socket");
                return;
            }
        };

        if length >= self.recv_buf.len() {
            error!(
                length,
                max = self.recv_buf.len(),
                %listener,
                "dropping oversized DHCPv6 datagram"
            );
            return;
        }
        let Some(&type_byte) = self.recv_buf[..length].first() else {
            debug!(%listener, %source, "dropping empty DHCPv6 datagram");
            return;
        };
        let message_type = MessageType::from(type_byte);
        debug!(length, %listener, %source, %message_type, "received DHCPv6 datagram");

        let SocketAddr::V6(source) = source else {
            debug!(%source, "dropping DHCPv6 datagram with a non-IPv6 source");
            return;
        };

        match policy::verdict(message_type, self.trusted) {
            Verdict::Forward => {}
            Verdict::DiscardReply => {
                warn!(%message_type, "discarding server-originated DHCPv6 message received on the client link");
                return;
            }
            Verdict::DiscardUntrustedRelay => {
                warn!(%message_type, "discarding relay-wrapped DHCPv6 message received on untrusted link");
                return;
            }
        }

        let payload = Bytes::copy_from_slice(&self.recv_buf[..length]);
        self.forward(payload, *source.ip()).await;
    }

    /// Wraps the payload in a RELAY-FORW envelope and transmits it upstream.
    ///
    /// Every failure here is per-message: it is logged and the message is
    /// dropped, leaving the sockets as they were.
    async fn forward(&mut self, payload: Bytes, peer_address: Ipv6Addr) {
        let Some(server) = self.server else {
            debug!("no DHCPv6 server configured, dropping message");
            return;
        };

        if self.upstream.is_none() {
            let Ok(socket) = sockets::connect_upstream(server)
                .await
                .map_err(log_err!("failed to connect the upstream socket"))
            else {
                return;
            };
            self.upstream = Some(socket);
        }
        let Some(upstream) = self.upstream.as_ref() else {
            return;
        };

        let Ok(local_address) = upstream
            .local_addr()
            .map_err(log_err!("unable to determine local sending port"))
        else {
            return;
        };

        let mut forward = RelayForward::wrap(peer_address, payload);
        let Ok(options) = self
            .annotation_options(local_address.port())
            .map_err(log_err!("link identification does not fit a relay option"))
        else {
            return;
        };
        forward.options = options;

        let Ok(chunks) = forward
            .encode_to_bytes_vec()
            .map_err(log_err!("failed to encode the relay envelope"))
        else {
            return;
        };

        self.send_buf.clear();
        for chunk in &chunks {
            self.send_buf.extend_from_slice(chunk);
        }

        match upstream.send(&self.send_buf).await {
            Ok(sent) => debug!(sent, server = %server, "relayed DHCPv6 message upstream"),
            Err(err) => error!(%err, server = %server, "failed to transmit the relayed message"),
        }
    }

    /// Builds the annotation options, in their on-the-wire order.
    ///
    /// Relay-Port is always present; Remote-Id and Subscriber-Id are
    /// included only when the link exposes a non-empty value for them.
    fn annotation_options(&self, local_port: u16) -> Result<Vec<RelayOption>, OptionTooLong> {
        let mut options = vec![RelayOption::new(
            OptionCode::RelayPort,
            Bytes::copy_from_slice(&local_port.to_be_bytes()),
        )?];

        if let Some(remote_id) = self.link.remote_id().filter(|id| !id.is_empty()) {
            options.push(RelayOption::new(
                OptionCode::RemoteId,
                Bytes::from(remote_id.into_bytes()),
            )?);
        }
        if let Some(peer_name) = self.link.peer_auth_name().filter(|name| !name.is_empty()) {
            options.push(RelayOption::new(
                OptionCode::SubscriberId,
                Bytes::from(peer_name.into_bytes()),
            )?);
        }

        Ok(options)
    }
}
