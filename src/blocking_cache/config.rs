use std::path::Path;

use crate::blocking_cache::address::AddressSplitter;
use crate::cache_soc::bits::clog2;
use crate::cache_soc::mem_msg::{DATA_NBITS, LINE_NBYTES};
use crate::error::{CacheError, CacheResult};

/// User facing knobs of the cache, everything else is derived from these
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// total capacity in bytes
    pub size: usize,
    pub num_ways: usize,
    pub addr_nbits: u32,
    pub opaque_nbits: u32,
    /// cycles the test memory takes to answer
    pub mem_latency: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            size: 8192,
            num_ways: 2,
            addr_nbits: 32,
            opaque_nbits: 8,
            mem_latency: 2,
        }
    }
}

/// Validated geometry of the cache
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheGeometry {
    pub num_ways: usize,
    /// lines in the whole cache
    pub nblocks: usize,
    /// lines per way, i.e. words in every tag/data array
    pub nsets: usize,
    pub opaque_nbits: u32,
    pub splitter: AddressSplitter,
}

impl CacheGeometry {
    #[inline]
    pub fn idw(&self) -> u32 {
        self.splitter.idw()
    }

    #[inline]
    pub fn tag_nbits(&self) -> u32 {
        self.splitter.tag_nbits()
    }
}

fn field_usize(parsed: &json::JsonValue, key: &'static str, value: &mut usize) -> CacheResult<()> {
    if !parsed[key].is_null() {
        *value = parsed[key].as_usize().ok_or(CacheError::InvalidConfigField(key))?;
    }
    Ok(())
}

fn field_u32(parsed: &json::JsonValue, key: &'static str, value: &mut u32) -> CacheResult<()> {
    if !parsed[key].is_null() {
        *value = parsed[key].as_u32().ok_or(CacheError::InvalidConfigField(key))?;
    }
    Ok(())
}

fn field_u64(parsed: &json::JsonValue, key: &'static str, value: &mut u64) -> CacheResult<()> {
    if !parsed[key].is_null() {
        *value = parsed[key].as_u64().ok_or(CacheError::InvalidConfigField(key))?;
    }
    Ok(())
}

impl CacheConfig {
    /// Parse a config from a json object, keys that are not there keep their default
    ///
    /// ```json
    /// { "size": 8192, "num_ways": 2, "addr_nbits": 32, "opaque_nbits": 8, "mem_latency": 2 }
    /// ```
    pub fn from_json(text: &str) -> CacheResult<Self> {
        let parsed = json::parse(text)?;
        if !parsed.is_object() {
            return Err(CacheError::InvalidConfigField("<root>"));
        }
        let mut config = Self::default();
        field_usize(&parsed, "size", &mut config.size)?;
        field_usize(&parsed, "num_ways", &mut config.num_ways)?;
        field_u32(&parsed, "addr_nbits", &mut config.addr_nbits)?;
        field_u32(&parsed, "opaque_nbits", &mut config.opaque_nbits)?;
        field_u64(&parsed, "mem_latency", &mut config.mem_latency)?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> CacheResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Check the geometry once, before anything gets built
    pub fn geometry(&self) -> CacheResult<CacheGeometry> {
        if self.size == 0 || !self.size.is_power_of_two() {
            return Err(CacheError::CacheSizeNotPowerOfTwo(self.size));
        }
        if self.size < LINE_NBYTES as usize {
            return Err(CacheError::CacheSmallerThanLine {
                size: self.size,
                line: LINE_NBYTES as usize,
            });
        }
        if self.num_ways == 0 || self.num_ways > 32 || !self.num_ways.is_power_of_two() {
            return Err(CacheError::InvalidWays(self.num_ways));
        }

        let nblocks = self.size * 8 / DATA_NBITS as usize;
        if self.num_ways > nblocks {
            return Err(CacheError::TooManyWays {
                ways: self.num_ways,
                nblocks,
            });
        }
        // the ways split the blocks between them, so they share one index space
        let idw = clog2(nblocks) - clog2(self.num_ways);

        if self.addr_nbits > 32 {
            return Err(CacheError::AddressTooWide(self.addr_nbits));
        }
        let offset_nbits = clog2(LINE_NBYTES as usize);
        if self.addr_nbits <= offset_nbits + idw {
            return Err(CacheError::AddressTooNarrow {
                addr_nbits: self.addr_nbits,
                needed: offset_nbits + idw,
            });
        }
        if self.opaque_nbits > 8 {
            return Err(CacheError::OpaqueTooWide(self.opaque_nbits));
        }

        Ok(CacheGeometry {
            num_ways: self.num_ways,
            nblocks,
            nsets: nblocks / self.num_ways,
            opaque_nbits: self.opaque_nbits,
            splitter: AddressSplitter::new(self.addr_nbits, idw),
        })
    }
}
