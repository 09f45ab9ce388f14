use crate::Options;

mod decode;
mod insert;
mod serialize;

/// An `Options` for tests that exercise the plain `2003::/…` address space: reserved
/// and aliased network seeding would only get in the way there.
fn bare_options() -> Options {
    Options::new().include_reserved_networks(true).record_size(28)
}
