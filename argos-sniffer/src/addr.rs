use std::fmt;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};

/// Canonical identity of a network node.
///
/// Addresses are stored the way the Bitcoin wire carries them: sixteen
/// bytes with IPv4 mapped into the last four (`::ffff:a.b.c.d`), plus the
/// TCP port. Used as the key of the peer graph and the observation tables,
/// so equality is structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeAddr {
    pub ip: [u8; 16],
    pub port: u16,
}

impl NodeAddr {
    pub fn new(ip: [u8; 16], port: u16) -> Self {
        Self { ip, port }
    }

    /// The dialable socket address, unmapping v4-in-v6 back to IPv4.
    pub fn socket_addr(&self) -> SocketAddr {
        let v6 = Ipv6Addr::from(self.ip);
        match v6.to_ipv4_mapped() {
            Some(v4) => SocketAddr::new(IpAddr::V4(v4), self.port),
            None => SocketAddr::new(IpAddr::V6(v6), self.port),
        }
    }
}

impl From<SocketAddr> for NodeAddr {
    fn from(addr: SocketAddr) -> Self {
        let ip = match addr.ip() {
            IpAddr::V4(v4) => v4.to_ipv6_mapped().octets(),
            IpAddr::V6(v6) => v6.octets(),
        };
        Self {
            ip,
            port: addr.port(),
        }
    }
}

impl From<NodeAddr> for SocketAddr {
    fn from(addr: NodeAddr) -> Self {
        addr.socket_addr()
    }
}

impl fmt::Display for NodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.socket_addr())
    }
}
