//! Creation and lifecycle of the relay's listener and upstream sockets.

use std::{
    fmt, io,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV6},
};

use dhcpv6_relay_proto::message::{ALL_RELAY_AGENTS_AND_SERVERS, SERVER_PORT};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

/// Errors occurring while bringing the listener sockets up.
///
/// Each variant names the step of the bring-up sequence that failed; any
/// failure rolls the relay back to the down state.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    /// The named interface carries no usable link-local address.
    #[error("no link-local address available on interface {0}")]
    NoLinkLocalAddress(String),
    /// Creating, configuring, or binding the link-local socket failed.
    #[error("unable to create or bind the link-local socket")]
    LinkLocalSocket(#[source] io::Error),
    /// Joining the All_DHCP_Relay_Agents_and_Servers group failed.
    #[error("unable to join the DHCPv6 relay multicast group")]
    MulticastJoin(#[source] io::Error),
    /// Creating or binding the multicast socket failed.
    #[error("unable to create or bind the multicast socket")]
    MulticastSocket(#[source] io::Error),
}

/// Label distinguishing the two listener sockets in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listener {
    /// The socket bound to the interface's own link-local address.
    LinkLocal,
    /// The socket bound to the All_DHCP_Relay_Agents_and_Servers group.
    Multicast,
}

impl fmt::Display for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LinkLocal => "LL",
            Self::Multicast => "MC",
        })
    }
}

/// The pair of sockets on which the relay listens while the link is up.
///
/// Dropping the set closes both sockets, so replacing or clearing it is the
/// entire teardown sequence.
#[derive(Debug)]
pub struct ListenerSet {
    link_local: UdpSocket,
    multicast: UdpSocket,
}

impl ListenerSet {
    /// Creates and binds both listener sockets on the named interface.
    ///
    /// The link-local socket is bound to the interface's own link-local
    /// address on the DHCPv6 server port with a unicast hop limit of 1; the
    /// multicast socket joins ff02::1:2 scoped to the interface and binds to
    /// the group address on the same port. Must be called from within a
    /// Tokio runtime.
    pub fn bind(interface: &str) -> Result<Self, BindError> {
        let own_address = link_local_address(interface)?;
        let scope_id = own_address.scope_id();

        let socket = new_listener_socket().map_err(BindError::LinkLocalSocket)?;
        socket
            .set_unicast_hops_v6(1)
            .map_err(BindError::LinkLocalSocket)?;
        socket
            .bind(&SocketAddrV6::new(*own_address.ip(), SERVER_PORT, 0, scope_id).into())
            .map_err(BindError::LinkLocalSocket)?;
        let link_local = UdpSocket::from_std(socket.into()).map_err(BindError::LinkLocalSocket)?;

        let socket = new_listener_socket().map_err(BindError::MulticastSocket)?;
        socket
            .join_multicast_v6(&ALL_RELAY_AGENTS_AND_SERVERS, scope_id)
            .map_err(BindError::MulticastJoin)?;
        socket
            .bind(
                &SocketAddrV6::new(ALL_RELAY_AGENTS_AND_SERVERS, SERVER_PORT, 0, scope_id).into(),
            )
            .map_err(BindError::MulticastSocket)?;
        let multicast = UdpSocket::from_std(socket.into()).map_err(BindError::MulticastSocket)?;

        Ok(Self {
            link_local,
            multicast,
        })
    }

    /// Assembles a listener set from sockets the embedder bound itself.
    pub fn from_sockets(link_local: UdpSocket, multicast: UdpSocket) -> Self {
        Self {
            link_local,
            multicast,
        }
    }

    /// The socket identified by the given label.
    pub fn socket(&self, listener: Listener) -> &UdpSocket {
        match listener {
            Listener::LinkLocal => &self.link_local,
            Listener::Multicast => &self.multicast,
        }
    }
}

fn new_listener_socket() -> io::Result<Socket> {
    let socket = Socket::new(Domain::IPV6, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_nonblocking(true)?;
    Ok(socket)
}

/// Finds the link-local address of the named interface.
///
/// The interface's index becomes the scope id of the returned address, so
/// that binds and the multicast join stay on the interface.
pub fn link_local_address(interface: &str) -> Result<SocketAddrV6, BindError> {
    let Some(found) = pnet_datalink::interfaces()
        .into_iter()
        .find(|candidate| candidate.name == interface)
    else {
        return Err(BindError::NoLinkLocalAddress(interface.to_string()));
    };

    for network in &found.ips {
        let IpAddr::V6(ip) = network.ip() else {
            continue;
        };
        // fe80::/10, the only scope the relay listens on
        if ip.segments()[0] & 0xffc0 != 0xfe80 {
            continue;
        }
        return Ok(SocketAddrV6::new(ip, 0, 0, found.index));
    }

    Err(BindError::NoLinkLocalAddress(interface.to_string()))
}

/// Opens a datagram socket in the server's address family and connects it.
///
/// The socket binds the wildcard address of the matching family, so the
/// kernel picks the ephemeral local port that the Relay-Port option reports
/// to the server.
pub async fn connect_upstream(server: SocketAddr) -> io::Result<UdpSocket> {
    let local: SocketAddr = match server {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    let socket = UdpSocket::bind(local).await?;
    socket.connect(server).await?;
    Ok(socket)
}

#[cfg(test)]
mod tests {
    use test_utils::parse;

    use super::*;

    #[test]
    fn missing_interface_has_no_link_local_address() {
        match link_local_address("does-not-exist0") {
            Err(BindError::NoLinkLocalAddress(interface)) => {
                assert_eq!(interface, "does-not-exist0")
            }
            other => panic!("expected NoLinkLocalAddress, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn upstream_socket_matches_server_family() {
        let server_v6 = UdpSocket::bind((Ipv6Addr::LOCALHOST, 0)).await.unwrap();
        let upstream = connect_upstream(server_v6.local_addr().unwrap())
            .await
            .unwrap();
        let local = upstream.local_addr().unwrap();
        assert!(local.is_ipv6());
        assert_ne!(local.port(), 0);

        let v4_loopback: SocketAddr = parse!("127.0.0.1:0");
        let server_v4 = UdpSocket::bind(v4_loopback).await.unwrap();
        let upstream = connect_upstream(server_v4.local_addr().unwrap())
            .await
            .unwrap();
        let local = upstream.local_addr().unwrap();
        assert!(local.is_ipv4());
        assert_ne!(local.port(), 0);
    }
}
