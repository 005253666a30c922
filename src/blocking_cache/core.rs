use crate::blocking_cache::cache::BlockingCache;
use crate::blocking_cache::config::CacheConfig;
use crate::cache_soc::cache_soc::CacheSoc;
use crate::cache_soc::memory::TestMemory;
use crate::cache_soc::port::port;
use crate::error::CacheResult;

/// Build the cache, a test memory behind it and the ports between them
/// Bad geometries are refused here, before anything is clocked
pub fn init_system(config: &CacheConfig) -> CacheResult<CacheSoc> {
    let geometry = config.geometry()?;

    let (memreq_out, memreq_in) = port("memreq");
    let (memresp_out, memresp_in) = port("memresp");
    let memory = TestMemory::new(config.mem_latency, memreq_in, memresp_out);
    let cache = BlockingCache::new(geometry);

    tracing::info!(
        "Configured {} byte {}-way cache: {} sets, {} bit index, {} bit tag, memory latency {}",
        config.size,
        geometry.num_ways,
        geometry.nsets,
        geometry.idw(),
        geometry.tag_nbits(),
        config.mem_latency
    );

    Ok(CacheSoc::new(cache, Box::new(memory), memreq_out, memresp_in))
}
