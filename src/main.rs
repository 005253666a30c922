use blocking_cache_wa::blocking_cache::config::CacheConfig;
use blocking_cache_wa::blocking_cache::core::init_system;
use blocking_cache_wa::cache_soc::mem_msg::{Line, MemReqMsg};
use blocking_cache_wa::error::CacheResult;
use tracing_subscriber::{EnvFilter, fmt};

/// a few lines worth of writes, sub-line reads of them, then enough conflicting lines to force write backs
fn demo_workload() -> Vec<MemReqMsg> {
    let mut requests = vec![];
    for line in 0..4u32 {
        let data: Line = 0x0F0E_0D0C_0B0A_0908_0706_0504_0302_0100 + line as Line;
        requests.push(MemReqMsg::write(line as u8, 0x0000_1000 + line * 16, 0, data));
    }
    for (i, len) in [1u8, 2, 4, 8, 0].into_iter().enumerate() {
        requests.push(MemReqMsg::read(0x10 + i as u8, 0x0000_1010, len));
    }
    for tag in 1..5u32 {
        requests.push(MemReqMsg::read(0x20 + tag as u8, (tag << 12) | 0x0000_0034, 4));
    }
    requests
}

fn run(config_path: Option<String>) -> CacheResult<()> {
    let config = match config_path {
        Some(path) => {
            tracing::info!("Loading cache config from {path}");
            CacheConfig::from_file(path)?
        }
        None => CacheConfig::default(),
    };

    let mut soc = init_system(&config)?;
    let responses = soc.run(&demo_workload())?;
    for response in &responses {
        tracing::info!("{}", response);
    }

    let stats = soc.stats();
    tracing::info!(
        "{} accesses, {} hits, {} misses, {} evictions, {} refills, {} memory requests in {} cycles",
        stats.accesses,
        stats.hits,
        stats.misses,
        stats.evictions,
        stats.refills,
        soc.memory().num_requests(),
        soc.clock_cycle()
    );
    Ok(())
}

fn main() {
    fmt::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .compact()
        .init();

    tracing::info!("Initializing blocking wide access cache model");

    if let Err(e) = run(std::env::args().nth(1)) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
