use crate::blocking_cache::address::Index;
use crate::blocking_cache::byte_lane::byte_enable;
use crate::blocking_cache::config::CacheGeometry;
use crate::blocking_cache::dpath::{ControlVector, DpathStatus, Way};
use crate::cache_soc::bits::WayMask;
use crate::cache_soc::mem_msg::{LINE_NBYTES, MemReqType};

/// handshake inputs the controller sees each cycle
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct CtrlIn {
    pub cachereq_val: bool,
    pub cacheresp_rdy: bool,
    pub memreq_rdy: bool,
    pub memresp_val: bool,
}

/// control vector for the datapath plus the handshake outputs
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct CtrlOut {
    pub ctrl: ControlVector,
    pub cachereq_rdy: bool,
    pub cacheresp_val: bool,
    pub memreq_val: bool,
    pub memresp_rdy: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub accesses: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub refills: u64,
}

/// Anything that can sequence the datapath
/// `step` is called once per cycle with the datapath status; it returns the signals for this cycle
/// and moves its own state to the next cycle, assuming any val/rdy pair that are both high fired
pub trait CacheController {
    fn step(&mut self, status: &DpathStatus, io: &CtrlIn) -> CtrlOut;

    /// short name of the current state for line traces
    fn state_name(&self) -> &'static str;

    fn stats(&self) -> CacheStats;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlState {
    Idle,
    TagCheck,
    InitDataAccess,
    ReadDataAccess,
    WriteDataAccess,
    EvictRequest,
    EvictWait,
    RefillRequest,
    RefillWait,
    RefillUpdate,
    Wait,
}

/// Reference controller for the blocking cache: write-back, write-allocate
/// Valid and dirty bits and the replacement order live here, the datapath knows nothing about them
#[derive(Debug)]
pub struct BlockingCacheCtrl {
    geometry: CacheGeometry,
    state: CtrlState,
    valid: Vec<WayMask>,
    dirty: Vec<WayMask>,
    /// per set, least recently used way first
    lru: Vec<Vec<Way>>,
    /// way the current access works on
    way: Way,
    hit: bool,
    stats: CacheStats,
}

impl BlockingCacheCtrl {
    pub fn new(geometry: CacheGeometry) -> Self {
        Self {
            state: CtrlState::Idle,
            valid: vec![WayMask::NONE; geometry.nsets],
            dirty: vec![WayMask::NONE; geometry.nsets],
            lru: (0..geometry.nsets).map(|_| (0..geometry.num_ways).collect()).collect(),
            way: 0,
            hit: false,
            stats: CacheStats::default(),
            geometry,
        }
    }

    pub fn state(&self) -> CtrlState {
        self.state
    }

    pub fn is_valid(&self, index: Index, way: Way) -> bool {
        self.valid[index].get(way)
    }

    pub fn is_dirty(&self, index: Index, way: Way) -> bool {
        self.dirty[index].get(way)
    }

    /// invalid ways go first, otherwise the least recently used one
    fn victim(&self, index: Index) -> Way {
        (0..self.geometry.num_ways)
            .find(|way| !self.valid[index].get(*way))
            .unwrap_or(self.lru[index][0])
    }

    fn touch(&mut self, index: Index, way: Way) {
        let order = &mut self.lru[index];
        order.retain(|w| *w != way);
        order.push(way);
    }

    fn tag_check(&mut self, status: &DpathStatus, io: &CtrlIn, index: Index, out: &mut CtrlOut) -> CtrlState {
        self.stats.accesses += 1;
        let hits = WayMask(status.tag_match.0 & self.valid[index].0);
        self.hit = hits.any();

        if status.cachereq_type.is_amo() {
            tracing::warn!(
                "{:?} to {:08x} is not supported by this cache, answering without data",
                status.cachereq_type,
                status.cachereq_addr
            );
            self.hit = false;
            self.stats.misses += 1;
            return CtrlState::Wait;
        }

        if let Some(way) = hits.first() {
            self.stats.hits += 1;
            self.way = way;
            self.touch(index, way);
            tracing::debug!("hit {:08x} in way {}", status.cachereq_addr, way);
            match status.cachereq_type {
                MemReqType::Init => return CtrlState::InitDataAccess,
                MemReqType::Write => return CtrlState::WriteDataAccess,
                _ => {}
            }
            // read hit: the data arrays were read with the tags, respond straight away
            out.ctrl.way_sel_current = way;
            out.ctrl.skip_read_data_reg = true;
            out.ctrl.cacheresp_hit = true;
            out.cacheresp_val = true;
            return if io.cacheresp_rdy { CtrlState::Idle } else { CtrlState::Wait };
        }

        self.stats.misses += 1;
        let victim = self.victim(index);
        self.way = victim;
        out.ctrl.way_sel = victim;
        out.ctrl.way_sel_current = victim;
        if self.valid[index].get(victim) && self.dirty[index].get(victim) {
            tracing::debug!("miss {:08x}, evicting way {}", status.cachereq_addr, victim);
            self.stats.evictions += 1;
            out.ctrl.read_tag_reg_en = true;
            out.ctrl.read_data_reg_en = true;
            CtrlState::EvictRequest
        } else {
            tracing::debug!("miss {:08x}, filling way {}", status.cachereq_addr, victim);
            Self::after_evict(status)
        }
    }

    /// where a miss goes once the victim is clean
    /// an init covering the whole line overwrites it without reading memory, everything else refills first
    fn after_evict(status: &DpathStatus) -> CtrlState {
        let offset = (status.cachereq_addr & (LINE_NBYTES - 1)) as u8;
        if status.cachereq_type == MemReqType::Init && byte_enable(offset, status.cachereq_len) == 0xFFFF {
            CtrlState::InitDataAccess
        } else {
            CtrlState::RefillRequest
        }
    }
}

impl CacheController for BlockingCacheCtrl {
    fn step(&mut self, status: &DpathStatus, io: &CtrlIn) -> CtrlOut {
        let splitter = self.geometry.splitter;
        let index = splitter.index(status.cachereq_addr);

        let mut out = CtrlOut::default();
        out.ctrl.read_byte_sel = splitter.offset(status.cachereq_addr);
        out.ctrl.way_sel = self.way;
        out.ctrl.way_sel_current = self.way;
        out.ctrl.cacheresp_type = status.cachereq_type;

        let next = match self.state {
            CtrlState::Idle => {
                out.cachereq_rdy = true;
                if io.cachereq_val {
                    out.ctrl.cachereq_en = true;
                    out.ctrl.tag_array_ren = WayMask::all(self.geometry.num_ways);
                    out.ctrl.data_array_ren = true;
                    CtrlState::TagCheck
                } else {
                    CtrlState::Idle
                }
            }

            CtrlState::TagCheck => self.tag_check(status, io, index, &mut out),

            CtrlState::InitDataAccess => {
                out.ctrl.tag_array_wen = WayMask::only(self.way);
                out.ctrl.data_array_wen = true;
                out.ctrl.data_array_wben = byte_enable(out.ctrl.read_byte_sel, status.cachereq_len);
                self.valid[index].set(self.way, true);
                self.dirty[index].set(self.way, true);
                self.touch(index, self.way);
                CtrlState::Wait
            }

            CtrlState::ReadDataAccess => {
                out.ctrl.data_array_ren = true;
                CtrlState::Wait
            }

            CtrlState::WriteDataAccess => {
                out.ctrl.data_array_wen = true;
                out.ctrl.data_array_wben = byte_enable(out.ctrl.read_byte_sel, status.cachereq_len);
                self.dirty[index].set(self.way, true);
                CtrlState::Wait
            }

            CtrlState::EvictRequest => {
                out.memreq_val = true;
                out.ctrl.memreq_type = MemReqType::Write;
                if io.memreq_rdy { CtrlState::EvictWait } else { CtrlState::EvictRequest }
            }

            CtrlState::EvictWait => {
                out.memresp_rdy = true;
                if io.memresp_val { Self::after_evict(status) } else { CtrlState::EvictWait }
            }

            CtrlState::RefillRequest => {
                out.memreq_val = true;
                out.ctrl.memreq_type = MemReqType::Read;
                if io.memreq_rdy { CtrlState::RefillWait } else { CtrlState::RefillRequest }
            }

            CtrlState::RefillWait => {
                out.memresp_rdy = true;
                if io.memresp_val {
                    out.ctrl.memresp_en = true;
                    CtrlState::RefillUpdate
                } else {
                    CtrlState::RefillWait
                }
            }

            CtrlState::RefillUpdate => {
                out.ctrl.is_refill = true;
                out.ctrl.tag_array_wen = WayMask::only(self.way);
                out.ctrl.data_array_wen = true;
                out.ctrl.data_array_wben = 0xFFFF;
                self.stats.refills += 1;
                self.valid[index].set(self.way, true);
                self.dirty[index].set(self.way, false);
                self.touch(index, self.way);
                match status.cachereq_type {
                    MemReqType::Write => CtrlState::WriteDataAccess,
                    MemReqType::Init => CtrlState::InitDataAccess,
                    _ => CtrlState::ReadDataAccess,
                }
            }

            CtrlState::Wait => {
                out.cacheresp_val = true;
                out.ctrl.cacheresp_hit = self.hit;
                out.ctrl.skip_read_data_reg = true;
                if io.cacheresp_rdy { CtrlState::Idle } else { CtrlState::Wait }
            }
        };

        if next != self.state {
            tracing::trace!("ctrl {:?} -> {:?}", self.state, next);
        }
        self.state = next;
        out
    }

    fn state_name(&self) -> &'static str {
        match self.state {
            CtrlState::Idle => "I ",
            CtrlState::TagCheck => "TC",
            CtrlState::InitDataAccess => "IN",
            CtrlState::ReadDataAccess => "RD",
            CtrlState::WriteDataAccess => "WD",
            CtrlState::EvictRequest => "EP",
            CtrlState::EvictWait => "EW",
            CtrlState::RefillRequest => "RR",
            CtrlState::RefillWait => "RW",
            CtrlState::RefillUpdate => "RU",
            CtrlState::Wait => "W ",
        }
    }

    fn stats(&self) -> CacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocking_cache::config::CacheConfig;

    fn ctrl() -> BlockingCacheCtrl {
        BlockingCacheCtrl::new(CacheConfig::default().geometry().unwrap())
    }

    fn status(type_: MemReqType, addr: u32, tag_match: WayMask) -> DpathStatus {
        DpathStatus {
            tag_match,
            cachereq_type: type_,
            cachereq_addr: addr,
            cachereq_len: 4,
        }
    }

    fn all_ready() -> CtrlIn {
        CtrlIn {
            cachereq_val: true,
            cacheresp_rdy: true,
            memreq_rdy: true,
            memresp_val: true,
        }
    }

    #[test]
    fn idle_captures_and_looks_up() {
        let mut ctrl = ctrl();
        let out = ctrl.step(&DpathStatus::default(), &CtrlIn::default());
        assert!(out.cachereq_rdy);
        assert!(!out.ctrl.cachereq_en);
        assert_eq!(ctrl.state(), CtrlState::Idle);

        let out = ctrl.step(&DpathStatus::default(), &all_ready());
        assert!(out.ctrl.cachereq_en);
        assert_eq!(out.ctrl.tag_array_ren, WayMask(0b11));
        assert!(out.ctrl.data_array_ren);
        assert_eq!(ctrl.state(), CtrlState::TagCheck);
    }

    #[test]
    fn tag_match_on_invalid_way_is_a_miss() {
        let mut ctrl = ctrl();
        ctrl.step(&DpathStatus::default(), &all_ready());
        // reset tags are zero, so address 0 matches both ways but nothing is valid yet
        let out = ctrl.step(&status(MemReqType::Read, 0x0000_0004, WayMask(0b11)), &all_ready());
        assert!(!out.cacheresp_val);
        assert_eq!(ctrl.state(), CtrlState::RefillRequest);
        assert_eq!(ctrl.stats().misses, 1);
        assert_eq!(out.ctrl.way_sel, 0);
    }

    #[test]
    fn miss_refill_sequence() {
        let mut ctrl = ctrl();
        let req = status(MemReqType::Read, 0x0000_1034, WayMask::NONE);
        ctrl.step(&req, &all_ready());
        ctrl.step(&req, &all_ready());
        assert_eq!(ctrl.state(), CtrlState::RefillRequest);

        let out = ctrl.step(&req, &all_ready());
        assert!(out.memreq_val);
        assert_eq!(out.ctrl.memreq_type, MemReqType::Read);
        assert_eq!(ctrl.state(), CtrlState::RefillWait);

        let waiting = CtrlIn { memresp_val: false, ..all_ready() };
        let out = ctrl.step(&req, &waiting);
        assert!(!out.ctrl.memresp_en);
        assert_eq!(ctrl.state(), CtrlState::RefillWait);

        let out = ctrl.step(&req, &all_ready());
        assert!(out.ctrl.memresp_en);
        assert_eq!(ctrl.state(), CtrlState::RefillUpdate);

        let out = ctrl.step(&req, &all_ready());
        assert!(out.ctrl.is_refill);
        assert!(out.ctrl.data_array_wen);
        assert_eq!(out.ctrl.tag_array_wen, WayMask::only(0));
        assert_eq!(out.ctrl.data_array_wben, 0xFFFF);
        assert!(ctrl.is_valid(0x03, 0));
        assert!(!ctrl.is_dirty(0x03, 0));
        assert_eq!(ctrl.state(), CtrlState::ReadDataAccess);

        ctrl.step(&req, &all_ready());
        let out = ctrl.step(&req, &all_ready());
        assert!(out.cacheresp_val);
        assert!(!out.ctrl.cacheresp_hit);
        assert_eq!(out.ctrl.read_byte_sel, 4);
        assert_eq!(ctrl.state(), CtrlState::Idle);
        assert_eq!(ctrl.stats().refills, 1);
    }

    #[test]
    fn read_hit_responds_from_tag_check() {
        let mut ctrl = ctrl();
        ctrl.valid[0x03].set(1, true);
        ctrl.step(&DpathStatus::default(), &all_ready());
        let out = ctrl.step(&status(MemReqType::Read, 0x0000_1034, WayMask::only(1)), &all_ready());
        assert!(out.cacheresp_val);
        assert!(out.ctrl.cacheresp_hit);
        assert!(out.ctrl.skip_read_data_reg);
        assert_eq!(out.ctrl.way_sel_current, 1);
        assert_eq!(ctrl.state(), CtrlState::Idle);
        assert_eq!(ctrl.stats().hits, 1);

        // requester not ready: hold the response in the wait state
        ctrl.step(&DpathStatus::default(), &all_ready());
        let stalled = CtrlIn { cacheresp_rdy: false, ..all_ready() };
        ctrl.step(&status(MemReqType::Read, 0x0000_1034, WayMask::only(1)), &stalled);
        assert_eq!(ctrl.state(), CtrlState::Wait);
        let out = ctrl.step(&status(MemReqType::Read, 0x0000_1034, WayMask::only(1)), &all_ready());
        assert!(out.cacheresp_val);
        assert_eq!(out.ctrl.way_sel_current, 1);
        assert_eq!(ctrl.state(), CtrlState::Idle);
    }

    #[test]
    fn dirty_victim_is_evicted_first() {
        let mut ctrl = ctrl();
        for way in 0..2 {
            ctrl.valid[0x03].set(way, true);
        }
        ctrl.dirty[0x03].set(0, true);
        // way 1 was used last, so way 0 is the victim
        ctrl.touch(0x03, 1);

        let req = status(MemReqType::Write, 0x0000_5034, WayMask::NONE);
        ctrl.step(&req, &all_ready());
        let out = ctrl.step(&req, &all_ready());
        assert!(out.ctrl.read_tag_reg_en);
        assert!(out.ctrl.read_data_reg_en);
        assert_eq!(out.ctrl.way_sel_current, 0);
        assert_eq!(ctrl.state(), CtrlState::EvictRequest);

        let out = ctrl.step(&req, &all_ready());
        assert!(out.memreq_val);
        assert_eq!(out.ctrl.memreq_type, MemReqType::Write);
        ctrl.step(&req, &all_ready());
        assert_eq!(ctrl.state(), CtrlState::RefillRequest);
        assert_eq!(ctrl.stats().evictions, 1);
    }

    #[test]
    fn init_miss_writes_back_a_dirty_victim() {
        let mut ctrl = ctrl();
        for way in 0..2 {
            ctrl.valid[0x03].set(way, true);
            ctrl.dirty[0x03].set(way, true);
        }

        let full = DpathStatus {
            cachereq_len: 0,
            ..status(MemReqType::Init, 0x0000_3030, WayMask::NONE)
        };
        ctrl.step(&full, &all_ready());
        let out = ctrl.step(&full, &all_ready());
        assert!(out.ctrl.read_tag_reg_en && out.ctrl.read_data_reg_en);
        assert_eq!(ctrl.state(), CtrlState::EvictRequest);
        ctrl.step(&full, &all_ready());
        ctrl.step(&full, &all_ready());
        // the whole line gets overwritten, memory is not read
        assert_eq!(ctrl.state(), CtrlState::InitDataAccess);
        assert_eq!(ctrl.stats().misses, 1);
        assert_eq!(ctrl.stats().evictions, 1);
    }

    #[test]
    fn partial_init_miss_refills_first() {
        let mut ctrl = ctrl();
        let req = status(MemReqType::Init, 0x0000_3034, WayMask::NONE);
        ctrl.step(&req, &all_ready());
        ctrl.step(&req, &all_ready());
        assert_eq!(ctrl.state(), CtrlState::RefillRequest);
        for _ in 0..3 {
            ctrl.step(&req, &all_ready());
        }
        assert_eq!(ctrl.state(), CtrlState::InitDataAccess);
        let out = ctrl.step(&req, &all_ready());
        assert_eq!(out.ctrl.data_array_wben, 0x00F0);
        assert!(ctrl.is_valid(0x03, 0) && ctrl.is_dirty(0x03, 0));

        let stats = ctrl.stats();
        assert_eq!(stats.accesses, stats.hits + stats.misses);
    }

    #[test]
    fn lru_victim() {
        let mut ctrl = ctrl();
        assert_eq!(ctrl.victim(7), 0);
        ctrl.valid[7].set(0, true);
        assert_eq!(ctrl.victim(7), 1);
        ctrl.valid[7].set(1, true);
        ctrl.touch(7, 0);
        assert_eq!(ctrl.victim(7), 1);
        ctrl.touch(7, 1);
        assert_eq!(ctrl.victim(7), 0);
    }

    #[test]
    fn amo_is_answered_without_array_access() {
        let mut ctrl = ctrl();
        let req = status(MemReqType::AmoAdd, 0x0000_1034, WayMask::NONE);
        ctrl.step(&req, &all_ready());
        let out = ctrl.step(&req, &all_ready());
        assert!(!out.ctrl.data_array_wen && !out.memreq_val);
        let out = ctrl.step(&req, &all_ready());
        assert!(out.cacheresp_val);
        assert!(!out.ctrl.cacheresp_hit);
        assert_eq!(out.ctrl.cacheresp_type, MemReqType::AmoAdd);
        assert_eq!(ctrl.stats().misses, ctrl.stats().accesses);
    }
}
