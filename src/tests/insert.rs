use std::net::IpAddr;

use crate::tests::bare_options;
use crate::{Tree, Value};

fn addr(s: &str) -> IpAddr {
    s.parse().unwrap()
}

/// S1 — overwrite by wider network: a later, wider insert replaces an earlier,
/// narrower one.
#[test]
fn wider_network_overwrites_narrower() {
    let mut tree = Tree::new(bare_options()).unwrap();
    tree.insert(addr("2003:1000::"), 32, Value::from("string")).unwrap();
    tree.insert(addr("2003::"), 16, Value::from("new string")).unwrap();
    tree.finalize();

    let (network, value) = tree.get(addr("2003::"));
    assert_eq!(network.prefix_len, 16);
    assert_eq!(value, Some(Value::from("new string")));
}

/// S2 — a narrower insert carves a hole out of a wider one; both the hole and the
/// remaining supernet resolve independently.
#[test]
fn narrower_network_carves_out_of_wider() {
    let mut tree = Tree::new(bare_options()).unwrap();
    tree.insert(addr("2003::"), 16, Value::from("string")).unwrap();
    tree.insert(addr("2003:1000::"), 32, Value::from("new string")).unwrap();
    tree.finalize();

    let (subnet, subnet_value) = tree.get(addr("2003:1000::"));
    assert_eq!(subnet.prefix_len, 32);
    assert_eq!(subnet_value, Some(Value::from("new string")));

    let (supernet, supernet_value) = tree.get(addr("2003::"));
    assert!(supernet.prefix_len >= 16, "expected the carved supernet to resolve at /16 or longer");
    assert_eq!(supernet_value, Some(Value::from("string")));
}

#[test]
fn get_on_empty_tree_returns_no_value() {
    let tree = Tree::new(bare_options()).unwrap();
    let (_, value) = tree.get(addr("2003::"));
    assert_eq!(value, None);
}

#[test]
fn insert_rejects_prefix_len_zero() {
    let mut tree = Tree::new(bare_options()).unwrap();
    let err = tree.insert(addr("::"), 0, Value::from("x")).unwrap_err();
    assert!(matches!(err, crate::Error::Config(_)));
}

#[test]
fn identical_values_at_different_networks_both_resolve() {
    let mut tree = Tree::new(bare_options()).unwrap();
    tree.insert(addr("2001:db8:1::"), 48, Value::from("shared")).unwrap();
    tree.insert(addr("2001:db8:2::"), 48, Value::from("shared")).unwrap();
    tree.finalize();

    let (_, a) = tree.get(addr("2001:db8:1::"));
    let (_, b) = tree.get(addr("2001:db8:2::"));
    assert_eq!(a, Some(Value::from("shared")));
    assert_eq!(b, Some(Value::from("shared")));
}
