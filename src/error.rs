use std::net::IpAddr;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("attempted to insert into the reserved network {ip}/{prefix_len}")]
    ReservedNetwork { ip: IpAddr, prefix_len: u8 },

    #[error("attempted to insert into the aliased network {ip}/{prefix_len}")]
    AliasedNetwork { ip: IpAddr, prefix_len: u8 },

    #[error("merge function failed: {0}")]
    Merge(String),

    #[error("node arena invariant violated: {0}")]
    Arena(String),

    #[error("malformed reconstruction event sequence: {0}")]
    Reconstruction(String),
}

#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("value of {size} bytes exceeds the maximum encodable size of {max} bytes")]
    ValueTooLarge { size: usize, max: usize },

    #[error("pointer offset {offset} does not fit in 32 bits")]
    PointerOutOfRange { offset: u64 },

    #[error("unsupported record size of {0} bits")]
    UnsupportedRecordSize(u8),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
