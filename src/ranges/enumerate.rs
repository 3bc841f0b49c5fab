// src/ranges/enumerate.rs
use ipnet::{IpAddrRange, IpNet, Ipv4AddrRange, Ipv6AddrRange};
use std::iter::Take;

/// Lazy, cloneable sequence of the addresses in one block.
pub type HostAddresses = Take<IpAddrRange>;

/// Every address in `net` in ascending order, network and broadcast included.
///
/// Nothing is materialized; a /8 costs the same to create as a /32. `cap`
/// truncates the sequence for blocks too wide to sweep.
pub fn enumerate_hosts(net: &IpNet, cap: Option<usize>) -> HostAddresses {
    let range = match net {
        IpNet::V4(n) => IpAddrRange::V4(Ipv4AddrRange::new(n.network(), n.broadcast())),
        IpNet::V6(n) => IpAddrRange::V6(Ipv6AddrRange::new(n.network(), n.broadcast())),
    };
    range.take(cap.unwrap_or(usize::MAX))
}
