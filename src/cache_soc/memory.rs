use std::collections::VecDeque;

use ahash::AHashMap;

use crate::cache_soc::mem_msg::{Address, LINE_NBYTES, Line, MemReqMsg, MemReqType, MemRespMsg};
use crate::cache_soc::port::{InPort, OutPort};
use crate::error::CacheResult;

/// The memory behind the cache, it deals only in full lines
/// Each device owns its request/response ports and gets clocked by the system once per cycle
pub trait MemoryDevice {
    /// one clock cycle: accept a request if there is one, send back whatever response is due
    fn tick(&mut self) -> CacheResult<()>;

    /// init portion of memory with specific data, bypassing the ports
    fn init_mem(&mut self, address: Address, data: &[u8]);

    /// backdoor read of the line holding `address`
    fn read_line(&self, address: Address) -> Line;

    /// number of requests served so far
    fn num_requests(&self) -> u64;
}

#[inline]
fn block_align(address: Address) -> Address {
    address & !(LINE_NBYTES - 1)
}

/// Sparse memory of lines that answers every request exactly once after a fixed latency
/// Lines nobody wrote read back as zero
pub struct TestMemory {
    lines: AHashMap<Address, Line>,
    latency: u64,
    req_port: InPort<MemReqMsg>,
    resp_port: OutPort<MemRespMsg>,
    /// responses waiting for their latency to pass, with the cycle they become valid
    in_flight: VecDeque<(u64, MemRespMsg)>,
    cycle: u64,
    num_requests: u64,
}

impl TestMemory {
    pub fn new(latency: u64, req_port: InPort<MemReqMsg>, resp_port: OutPort<MemRespMsg>) -> Self {
        Self {
            lines: AHashMap::new(),
            latency,
            req_port,
            resp_port,
            in_flight: VecDeque::new(),
            cycle: 0,
            num_requests: 0,
        }
    }

    fn handle_request(&mut self, request: MemReqMsg) -> MemRespMsg {
        let address = block_align(request.addr);
        match request.type_ {
            MemReqType::Read => {
                let data = self.read_line(address);
                tracing::trace!("memory read {:08x} -> {:032x}", address, data);
                MemRespMsg::new(MemReqType::Read, request.opaque, false, 0, data)
            }
            MemReqType::Write => {
                // the cache only ever writes back full lines
                assert!(request.len == 0, "Memory only takes full line writes!");
                tracing::trace!("memory write {:08x} <- {:032x}", address, request.data);
                self.lines.insert(address, request.data);
                MemRespMsg::new(MemReqType::Write, request.opaque, false, 0, 0)
            }
            other => panic!("The test memory does not handle {:?} requests!", other),
        }
    }
}

impl MemoryDevice for TestMemory {
    fn tick(&mut self) -> CacheResult<()> {
        if let Some(request) = self.req_port.take()? {
            self.num_requests += 1;
            let response = self.handle_request(request);
            self.in_flight.push_back((self.cycle + self.latency, response));
        }

        if let Some((due, _)) = self.in_flight.front() {
            if *due <= self.cycle && self.resp_port.rdy() {
                if let Some((_, response)) = self.in_flight.pop_front() {
                    self.resp_port.send(response)?;
                }
            }
        }

        self.cycle += 1;
        Ok(())
    }

    fn init_mem(&mut self, address: Address, data: &[u8]) {
        for (i, byte) in data.iter().enumerate() {
            // the address space wraps, like the address bus does
            let current = address.wrapping_add(i as Address);
            let line = self.lines.entry(block_align(current)).or_insert(0);
            let shamt = (current % LINE_NBYTES) * 8;
            *line = (*line & !(0xFFu128 << shamt)) | ((*byte as Line) << shamt);
        }
    }

    fn read_line(&self, address: Address) -> Line {
        self.lines.get(&block_align(address)).copied().unwrap_or(0)
    }

    fn num_requests(&self) -> u64 {
        self.num_requests
    }
}
