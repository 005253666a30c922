use crate::blocking_cache::cache::{BlockingCache, CacheIo};
use crate::blocking_cache::ctrl::{BlockingCacheCtrl, CacheController, CacheStats};
use crate::cache_soc::mem_msg::{MemReqMsg, MemRespMsg};
use crate::cache_soc::memory::MemoryDevice;
use crate::cache_soc::port::{InPort, OutPort, port};
use crate::error::{CacheError, CacheResult};

pub type ClockCycle = u64;

/// default number of cycles a single transaction may take before the harness gives up
pub const DEFAULT_MAX_STALL_CYCLES: u64 = 10_000;

/// A requester, the cache and its backing memory, all on one clock
///
/// ```text
///             cachereq            memreq
/// requester ----------> cache ----------> memory
///           <----------       <----------
///             cacheresp           memresp
/// ```
/// Every arrow is a bounded(1) channel, so each link behaves like a single register slice.
/// One call to `step` is one clock cycle for everything on the board.
pub struct CacheSoc<C: CacheController = BlockingCacheCtrl> {
    cache: BlockingCache<C>,
    memory: Box<dyn MemoryDevice + Send>,
    cachereq_in: InPort<MemReqMsg>,
    cacheresp_out: OutPort<MemRespMsg>,
    memreq_out: OutPort<MemReqMsg>,
    memresp_in: InPort<MemRespMsg>,
    /// requester side of the cache ports
    requester: OutPort<MemReqMsg>,
    responses: InPort<MemRespMsg>,
    clock_cycle: ClockCycle,
    max_stall_cycles: u64,
}

impl<C: CacheController> CacheSoc<C> {
    /// `memreq_out`/`memresp_in` are the cache's ends of the ports whose other ends `memory` owns
    pub fn new(
        cache: BlockingCache<C>,
        memory: Box<dyn MemoryDevice + Send>,
        memreq_out: OutPort<MemReqMsg>,
        memresp_in: InPort<MemRespMsg>,
    ) -> Self {
        let (requester, cachereq_in) = port("cachereq");
        let (cacheresp_out, responses) = port("cacheresp");
        Self {
            cache,
            memory,
            cachereq_in,
            cacheresp_out,
            memreq_out,
            memresp_in,
            requester,
            responses,
            clock_cycle: 0,
            max_stall_cycles: DEFAULT_MAX_STALL_CYCLES,
        }
    }

    pub fn set_max_stall_cycles(&mut self, cycles: u64) {
        self.max_stall_cycles = cycles;
    }

    pub fn cache(&self) -> &BlockingCache<C> {
        &self.cache
    }

    pub fn memory(&self) -> &(dyn MemoryDevice + Send) {
        self.memory.as_ref()
    }

    pub fn memory_mut(&mut self) -> &mut (dyn MemoryDevice + Send) {
        self.memory.as_mut()
    }

    pub fn clock_cycle(&self) -> ClockCycle {
        self.clock_cycle
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// advance the whole system by one clock cycle
    pub fn step(&mut self) -> CacheResult<()> {
        let cacheresp_rdy = self.cacheresp_out.rdy();
        let memreq_rdy = self.memreq_out.rdy();
        let cachereq = self.cachereq_in.peek()?.copied();
        let memresp = self.memresp_in.peek()?.copied();

        let fired = self.cache.cycle(CacheIo {
            cachereq: cachereq.as_ref(),
            memresp: memresp.as_ref(),
            cacheresp_rdy,
            memreq_rdy,
        });

        if fired.cachereq_fire {
            self.cachereq_in.take()?;
        }
        if fired.memresp_fire {
            self.memresp_in.take()?;
        }
        if let Some(memreq) = fired.memreq {
            self.memreq_out.send(memreq)?;
        }
        if let Some(cacheresp) = fired.cacheresp {
            self.cacheresp_out.send(cacheresp)?;
        }

        self.memory.tick()?;

        tracing::trace!(
            "{:>6}: {:<28} {} {:<28} | {:<28} {}",
            self.clock_cycle,
            cachereq.filter(|_| fired.cachereq_fire).map(|m| m.to_string()).unwrap_or_default(),
            self.cache.line_trace(),
            fired.cacheresp.map(|m| m.to_string()).unwrap_or_default(),
            fired.memreq.map(|m| m.to_string()).unwrap_or_default(),
            memresp.filter(|_| fired.memresp_fire).map(|m| m.to_string()).unwrap_or_default(),
        );

        self.clock_cycle += 1;
        Ok(())
    }

    /// Send one request and clock the system until its response comes back
    pub fn transact(&mut self, request: MemReqMsg) -> CacheResult<MemRespMsg> {
        let start = self.clock_cycle;
        while !self.requester.rdy() {
            self.stall_check(start)?;
            self.step()?;
        }
        self.requester.send(request)?;

        loop {
            if let Some(response) = self.responses.take()? {
                tracing::debug!(
                    "{} -> {} in {} cycles",
                    request,
                    response,
                    self.clock_cycle - start
                );
                return Ok(response);
            }
            self.stall_check(start)?;
            self.step()?;
        }
    }

    /// run a list of requests back to back, collecting the responses in order
    pub fn run(&mut self, requests: &[MemReqMsg]) -> CacheResult<Vec<MemRespMsg>> {
        let start = self.clock_cycle;
        let responses = requests
            .iter()
            .map(|request| self.transact(*request))
            .collect::<CacheResult<Vec<_>>>()?;
        tracing::info!(
            "Served {} requests in {} cycles",
            responses.len(),
            self.clock_cycle - start
        );
        Ok(responses)
    }

    fn stall_check(&self, start: ClockCycle) -> CacheResult<()> {
        let cycles = self.clock_cycle - start;
        if cycles >= self.max_stall_cycles {
            return Err(CacheError::SimulationStalled { cycles });
        }
        Ok(())
    }
}
