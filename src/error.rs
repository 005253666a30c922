use thiserror::Error;

pub type CacheResult<T> = ::std::result::Result<T, CacheError>;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache size must be a non-zero power of two, got {0} bytes")]
    CacheSizeNotPowerOfTwo(usize),
    #[error("Cache of {size} bytes cannot hold a single {line} byte line")]
    CacheSmallerThanLine { size: usize, line: usize },
    #[error("Number of ways must be a power of two between 1 and 32, got {0}")]
    InvalidWays(usize),
    #[error("{ways} ways do not fit into {nblocks} cache blocks")]
    TooManyWays { ways: usize, nblocks: usize },
    #[error("Address width of {addr_nbits} bits cannot hold offset + index ({needed} bits) and a tag")]
    AddressTooNarrow { addr_nbits: u32, needed: u32 },
    #[error("Address width is limited to 32 bits, got {0}")]
    AddressTooWide(u32),
    #[error("Opaque field is limited to 8 bits, got {0}")]
    OpaqueTooWide(u32),
    #[error("Config field `{0}` has the wrong type")]
    InvalidConfigField(&'static str),
    #[error("Could not parse config: {0}")]
    BadConfig(#[from] json::Error),
    #[error("Could not read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Simulation made no progress for {cycles} cycles")]
    SimulationStalled { cycles: u64 },
    #[error("The other end of the {0} port has been dropped")]
    PortDisconnected(&'static str),
}
