//! The identity of the point-to-point link served by the relay.

/// Identity of the client-facing link, supplied by the embedding process.
///
/// The relay queries the link once per forwarded message, so implementations
/// may return values that change over the lifetime of the link (for example,
/// a peer that re-authenticates under a different name).
pub trait Link {
    /// The name of the network interface of the link, such as `ppp0`.
    ///
    /// Used to locate the interface's link-local address when the listener
    /// sockets are created.
    fn interface_name(&self) -> &str;

    /// An identifier of the remote peer of the link, if the link layer
    /// provides one.
    ///
    /// Relayed upstream as the Remote-Id option when present and non-empty.
    fn remote_id(&self) -> Option<String> {
        None
    }

    /// The authenticated name of the peer, if the peer authenticated.
    ///
    /// Relayed upstream as the Subscriber-Id option when present and
    /// non-empty.
    fn peer_auth_name(&self) -> Option<String> {
        None
    }
}
