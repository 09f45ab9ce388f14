//! Reserved and aliased network tables seeded into a fresh [`crate::trie::Tree`].
//!
//! See `SPEC_FULL.md` §4.6 "Reserved and aliased network seeding" for the reasoning
//! behind treating `fe80::/10` as reserved rather than as one of the IPv4-embedding
//! aliases.

use std::net::Ipv6Addr;

/// A network expressed directly in the unified 128-bit address space.
pub struct SeedNetwork {
    pub address: u128,
    pub prefix_len: u8,
}

/// The canonical location of the IPv4-embedded `FixedNode` subtree: the zero-prefix
/// embedding `::/96`, i.e. `::a.b.c.d`.
pub const IPV4_FIXED_NODE: SeedNetwork = SeedNetwork { address: 0, prefix_len: 96 };

/// The five true IPv4-embedding aliases, each pointing at [`IPV4_FIXED_NODE`].
pub fn aliased_networks() -> Vec<SeedNetwork> {
    vec![
        net("2002::", 16),       // 6to4
        net("2002:a00::", 24),   // 6to4 carrying an RFC 1918 10.0.0.0/8 payload
        net("::ffff:0:0", 96),   // IPv4-mapped
        net("64:ff9b::", 96),    // NAT64
        net("2001::", 32),       // Teredo
    ]
}

/// IANA private/documentation/special-purpose ranges, seeded at their zero-prefix
/// IPv6 embedding, plus the IPv6-native reserved ranges.
pub fn reserved_networks() -> Vec<SeedNetwork> {
    let v4 = [
        ("0.0.0.0", 8),
        ("10.0.0.0", 8),
        ("100.64.0.0", 10),
        ("127.0.0.0", 8),
        ("169.254.0.0", 16),
        ("172.16.0.0", 12),
        ("192.0.0.0", 24),
        ("192.0.2.0", 24),
        ("192.31.196.0", 24),
        ("192.52.193.0", 24),
        ("192.88.99.0", 24),
        ("192.168.0.0", 16),
        ("192.175.48.0", 24),
        ("198.18.0.0", 15),
        ("198.51.100.0", 24),
        ("203.0.113.0", 24),
        ("240.0.0.0", 4),
        ("255.255.255.255", 32),
    ];

    let mut networks: Vec<SeedNetwork> =
        v4.iter().map(|(addr, prefix)| v4_embedded(addr.parse().unwrap(), *prefix)).collect();

    networks.extend([
        net("::1", 128),
        net("::", 128),
        net("100::", 64),
        net("2001:10::", 28),
        net("2001:db8::", 32),
        net("fc00::", 7),
        net("fe80::", 10),
    ]);

    networks
}

fn net(addr: &str, prefix_len: u8) -> SeedNetwork {
    let addr: Ipv6Addr = addr.parse().expect("valid static IPv6 literal");
    SeedNetwork { address: u128::from(addr), prefix_len }
}

/// Embeds an IPv4 `/prefix_len` network at its zero-prefix IPv6 location (`::a.b.c.d`),
/// matching how `Tree::insert` maps plain IPv4 inserts before descending the trie.
fn v4_embedded(addr: std::net::Ipv4Addr, prefix_len: u8) -> SeedNetwork {
    SeedNetwork { address: u128::from(u32::from(addr)), prefix_len: 96 + prefix_len }
}
