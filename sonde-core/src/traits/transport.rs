//! Metrics transport trait
//!
//! Abstracts the MQTT-style client and the network link under it so the
//! metrics client can be driven without sockets or a real clock.

use core::net::Ipv4Addr;

/// Parameters for a broker connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions<'a> {
    /// Broker host name or address
    pub broker: &'a str,
    /// Broker TCP port
    pub port: u16,
    /// Client identifier presented to the broker
    pub client_id: &'a str,
    /// Username, `None` for anonymous sessions
    pub username: Option<&'a str>,
    /// Password, `None` when not configured
    pub password: Option<&'a str>,
    /// Keep-alive interval in seconds
    pub keep_alive_s: u16,
}

/// Publish/subscribe transport used by the metrics client
///
/// All calls are expected to return promptly; `connect` is the only one that
/// may take a noticeable amount of time.
pub trait MetricsTransport {
    /// Transport specific failure
    type Error: core::fmt::Debug;

    /// Whether the underlying network link is up
    fn network_up(&self) -> bool;

    /// Address of this device on the network, if one was assigned
    fn local_address(&self) -> Option<Ipv4Addr>;

    /// Open a session with the broker
    fn connect(&mut self, options: &ConnectOptions<'_>) -> Result<(), Self::Error>;

    /// Whether a broker session is currently open
    fn is_connected(&self) -> bool;

    /// Close the broker session
    fn disconnect(&mut self);

    /// Send one message
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error>;

    /// Pump keep-alive and inbound traffic
    fn service(&mut self);
}
