//! Client identity used to partition rate limit state.

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

/// Key identifying one client to a limiter.
///
/// Built from the peer address of the connection. Cloning is cheap: the text
/// is shared.
///
/// # Example
/// ```
/// use query_gate::ClientId;
/// use std::net::IpAddr;
///
/// let v4: IpAddr = "1.2.3.4".parse().unwrap();
/// let mapped: IpAddr = "::ffff:1.2.3.4".parse().unwrap();
///
/// // A dual-stack listener reports IPv4 peers as mapped IPv6 addresses
/// assert_eq!(ClientId::from_ip(v4), ClientId::from_ip(mapped));
/// assert_eq!(ClientId::from_ip(v4).as_str(), "1.2.3.4");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(Arc<str>);

impl ClientId {
    /// Create a client id from an arbitrary key.
    pub fn new(key: impl AsRef<str>) -> Self {
        ClientId(Arc::from(key.as_ref()))
    }

    /// Create a client id from a peer IP address.
    ///
    /// IPv4-mapped IPv6 addresses are reduced to their IPv4 form.
    pub fn from_ip(ip: IpAddr) -> Self {
        ClientId::new(ip.to_canonical().to_string())
    }

    /// The key as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<IpAddr> for ClientId {
    fn from(ip: IpAddr) -> Self {
        ClientId::from_ip(ip)
    }
}

impl From<&str> for ClientId {
    fn from(key: &str) -> Self {
        ClientId::new(key)
    }
}
