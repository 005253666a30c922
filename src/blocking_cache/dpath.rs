use crate::blocking_cache::address::{Index, Tag};
use crate::blocking_cache::byte_lane::{align_high, extract};
use crate::blocking_cache::config::CacheGeometry;
use crate::blocking_cache::request_bank::RequestRegisterBank;
use crate::cache_soc::bits::WayMask;
use crate::cache_soc::mem_msg::{
    Address, DATA_NBITS, Line, MemReqMsg, MemReqType, MemRespMsg,
};
use crate::cache_soc::register::{RegEnRst, mux};
use crate::cache_soc::sram::{Sram, SramPort};

pub type Way = usize;

/// tag arrays are one 32 bit word wide, whatever the tag width
const TAG_ARRAY_NBITS: u32 = 32;

/// Everything the controller drives into the datapath for one cycle
/// The datapath never derives any of these on its own
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ControlVector {
    pub cachereq_en: bool,
    pub memresp_en: bool,
    pub is_refill: bool,
    pub tag_array_wen: WayMask,
    pub tag_array_ren: WayMask,
    /// victim picked by the replacement logic, the datapath only uses `way_sel_current`
    pub way_sel: Way,
    pub way_sel_current: Way,
    pub data_array_wen: bool,
    pub data_array_ren: bool,
    /// byte enables for data array writes, one bit per byte of the line
    pub data_array_wben: u16,
    pub skip_read_data_reg: bool,
    pub read_data_reg_en: bool,
    pub read_tag_reg_en: bool,
    pub read_byte_sel: u8,
    pub memreq_type: MemReqType,
    pub cacheresp_type: MemReqType,
    pub cacheresp_hit: bool,
}

/// What the controller gets to look at, valid every cycle
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct DpathStatus {
    pub tag_match: WayMask,
    pub cachereq_type: MemReqType,
    pub cachereq_addr: Address,
    pub cachereq_len: u8,
}

/// Tag and data store of one way
#[derive(Debug)]
struct WayArrays {
    tag_array: Sram,
    data_array: Sram,
}

/// Datapath of the blocking wide access cache
///
/// The datapath has no sequencing of its own. Each cycle the controller reads `status()`,
/// decides on a `ControlVector`, the outgoing messages come out of `outputs()` and `tick()` is the clock edge.
#[derive(Debug)]
pub struct BlockingCacheDpath {
    geometry: CacheGeometry,
    cachereq: RequestRegisterBank,
    memresp_data_reg: RegEnRst<Line>,
    ways: Box<[WayArrays]>,
    read_data_reg: RegEnRst<Line>,
    read_tag_reg: RegEnRst<Tag>,
}

impl BlockingCacheDpath {
    pub fn new(geometry: CacheGeometry) -> Self {
        let ways = (0..geometry.num_ways)
            .map(|_| WayArrays {
                tag_array: Sram::new(TAG_ARRAY_NBITS, geometry.nsets),
                data_array: Sram::new(DATA_NBITS, geometry.nsets),
            })
            .collect::<Vec<_>>();

        Self {
            geometry,
            cachereq: RequestRegisterBank::new(geometry.opaque_nbits),
            memresp_data_reg: RegEnRst::new(0),
            ways: ways.into_boxed_slice(),
            read_data_reg: RegEnRst::new(0),
            read_tag_reg: RegEnRst::new(0),
        }
    }

    #[inline]
    pub fn geometry(&self) -> &CacheGeometry {
        &self.geometry
    }

    #[inline]
    pub fn num_ways(&self) -> usize {
        self.ways.len()
    }

    #[inline]
    fn cachereq_tag(&self) -> Tag {
        self.geometry.splitter.tag(self.cachereq.addr())
    }

    #[inline]
    fn cachereq_idx(&self) -> Index {
        self.geometry.splitter.index(self.cachereq.addr())
    }

    /// tag field of a way's tag array read out
    #[inline]
    fn tag_read_out(&self, way: Way) -> Tag {
        self.ways[way].tag_array.out() as Tag & self.geometry.splitter.tag_mask()
    }

    fn data_read_mux(&self, way_sel_current: Way) -> Line {
        assert!(way_sel_current < self.ways.len());
        self.ways[way_sel_current].data_array.out()
    }

    fn way_sel_mux(&self, way_sel_current: Way) -> Tag {
        assert!(way_sel_current < self.ways.len());
        self.tag_read_out(way_sel_current)
    }

    /// pending write data moved to its byte lane
    fn aligned_cache_data(&self, read_byte_sel: u8) -> Line {
        align_high(self.cachereq.data(), read_byte_sel)
    }

    /// value written into the selected data array
    fn refill_mux(&self, ctrl: &ControlVector) -> Line {
        mux(
            ctrl.is_refill as usize,
            &[self.aligned_cache_data(ctrl.read_byte_sel), self.memresp_data_reg.out()],
        )
    }

    /// tag for the outgoing memory request: the request's own tag for a refill, the latched victim tag for an evict
    fn memreq_tag_mux(&self, memreq_type: MemReqType) -> Tag {
        mux(memreq_type.bit0() as usize, &[self.cachereq_tag(), self.read_tag_reg.out()])
    }

    fn read_data(&self, ctrl: &ControlVector) -> Line {
        mux(
            ctrl.skip_read_data_reg as usize,
            &[self.read_data_reg.out(), self.data_read_mux(ctrl.way_sel_current)],
        )
    }

    /// tag comparators, one per way
    pub fn tag_match(&self) -> WayMask {
        let tag = self.cachereq_tag();
        let mut matches = WayMask::NONE;
        for way in 0..self.ways.len() {
            matches.set(way, tag == self.tag_read_out(way));
        }
        matches
    }

    pub fn status(&self) -> DpathStatus {
        DpathStatus {
            tag_match: self.tag_match(),
            cachereq_type: self.cachereq.type_(),
            cachereq_addr: self.cachereq.addr(),
            cachereq_len: self.cachereq.len(),
        }
    }

    /// response to the requester, meaningful when the controller asserts its valid
    pub fn cacheresp_msg(&self, ctrl: &ControlVector) -> MemRespMsg {
        let data = if ctrl.cacheresp_type == MemReqType::Read {
            extract(self.read_data(ctrl), ctrl.read_byte_sel, self.cachereq.len())
        } else {
            0
        };
        MemRespMsg::new(
            ctrl.cacheresp_type,
            self.cachereq.opaque(),
            ctrl.cacheresp_hit,
            self.cachereq.len(),
            data,
        )
    }

    /// request to memory, meaningful when the controller asserts its valid
    /// there is only ever one memory request in flight, so the opaque field stays zero
    pub fn memreq_msg(&self, ctrl: &ControlVector) -> MemReqMsg {
        let addr = self
            .geometry
            .splitter
            .block_addr(self.memreq_tag_mux(ctrl.memreq_type), self.cachereq_idx());
        MemReqMsg {
            type_: ctrl.memreq_type,
            opaque: 0,
            addr,
            len: 0,
            data: self.read_data_reg.out(),
        }
    }

    pub fn outputs(&self, ctrl: &ControlVector) -> (MemRespMsg, MemReqMsg) {
        (self.cacheresp_msg(ctrl), self.memreq_msg(ctrl))
    }

    /// Clock edge
    /// `cachereq_msg` and `memresp_msg` are whatever sits on the input ports, they are only sampled under their enables
    pub fn tick(&mut self, ctrl: &ControlVector, cachereq_msg: &MemReqMsg, memresp_msg: &MemRespMsg) {
        let cur_idx = self.geometry.splitter.current_index(
            ctrl.cachereq_en,
            cachereq_msg.addr,
            self.cachereq.addr(),
        );

        // everything sampled at this edge is computed from the values before it
        let tag_in = self.cachereq_tag() as Line;
        let data_in = self.refill_mux(ctrl);
        let read_data_in = self.data_read_mux(ctrl.way_sel_current);
        let read_tag_in = self.way_sel_mux(ctrl.way_sel_current);

        for (way, arrays) in self.ways.iter_mut().enumerate() {
            let tag_wen = ctrl.tag_array_wen.get(way);
            let tag_port = SramPort {
                ce: tag_wen || ctrl.tag_array_ren.get(way),
                we: tag_wen,
                addr: cur_idx,
                wmask: arrays.tag_array.full_wmask(),
                in_: tag_in,
            };
            arrays.tag_array.tick(&tag_port);

            let data_wen = ctrl.data_array_wen && ctrl.way_sel_current == way;
            let data_port = SramPort {
                ce: data_wen || ctrl.data_array_ren,
                we: data_wen,
                addr: cur_idx,
                wmask: ctrl.data_array_wben,
                in_: data_in,
            };
            arrays.data_array.tick(&data_port);
        }

        self.read_data_reg.tick(ctrl.read_data_reg_en, read_data_in);
        self.read_tag_reg.tick(ctrl.read_tag_reg_en, read_tag_in);
        self.memresp_data_reg.tick(ctrl.memresp_en, memresp_msg.data);
        self.cachereq.tick(ctrl.cachereq_en, cachereq_msg);
    }

    /// backdoor look at a stored line, for debugging and tests
    pub fn peek_line(&self, way: Way, index: Index) -> Line {
        self.ways[way].data_array.peek(index)
    }

    pub fn peek_tag(&self, way: Way, index: Index) -> Tag {
        self.ways[way].tag_array.peek(index) as Tag
    }

    pub fn held_request(&self) -> MemReqMsg {
        self.cachereq.held()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocking_cache::byte_lane::byte_enable;
    use crate::blocking_cache::config::CacheConfig;

    fn dpath() -> BlockingCacheDpath {
        BlockingCacheDpath::new(CacheConfig::default().geometry().unwrap())
    }

    fn idle() -> ControlVector {
        ControlVector::default()
    }

    /// capture `req` and read every tag and data array at its index
    fn lookup(dpath: &mut BlockingCacheDpath, req: &MemReqMsg) {
        let ctrl = ControlVector {
            cachereq_en: true,
            tag_array_ren: WayMask::all(2),
            data_array_ren: true,
            ..idle()
        };
        dpath.tick(&ctrl, req, &MemRespMsg::default());
    }

    /// write tag and a full line into `way` for the request currently held
    fn fill(dpath: &mut BlockingCacheDpath, way: Way, line: Line) {
        // memory response first lands in the holding register
        let capture = ControlVector {
            memresp_en: true,
            ..idle()
        };
        let memresp = MemRespMsg::new(MemReqType::Read, 0, false, 0, line);
        dpath.tick(&capture, &MemReqMsg::default(), &memresp);

        let refill = ControlVector {
            is_refill: true,
            tag_array_wen: WayMask::only(way),
            data_array_wen: true,
            data_array_wben: 0xFFFF,
            way_sel_current: way,
            ..idle()
        };
        assert_eq!(dpath.refill_mux(&refill), line);
        dpath.tick(&refill, &MemReqMsg::default(), &MemRespMsg::default());
    }

    #[test]
    fn tag_match_per_way() {
        let mut dpath = dpath();
        let index = 0x03;
        // way 0 holds the tag of 0x1030, way 1 the tag of 0x2030, same index
        lookup(&mut dpath, &MemReqMsg::read(0, 0x1030, 0));
        fill(&mut dpath, 0, 0xAAAA);
        lookup(&mut dpath, &MemReqMsg::read(0, 0x2030, 0));
        fill(&mut dpath, 1, 0xBBBB);
        assert_eq!(dpath.peek_tag(0, index), 0x1);
        assert_eq!(dpath.peek_tag(1, index), 0x2);

        lookup(&mut dpath, &MemReqMsg::read(0, 0x1034, 4));
        let status = dpath.status();
        assert!(status.tag_match.get(0));
        assert!(!status.tag_match.get(1));
        assert_eq!(status.cachereq_addr, 0x1034);
        assert_eq!(status.cachereq_len, 4);

        // the comparators do not care which way is current
        for way_sel_current in 0..2 {
            let ctrl = ControlVector { way_sel_current, ..idle() };
            dpath.tick(&ctrl, &MemReqMsg::default(), &MemRespMsg::default());
            assert_eq!(dpath.tag_match(), WayMask::only(0));
        }
    }

    #[test]
    fn lookup_uses_incoming_index_in_capture_cycle() {
        let mut dpath = dpath();
        lookup(&mut dpath, &MemReqMsg::read(0, 0x0000_1050, 0));
        fill(&mut dpath, 0, 0x5555);
        lookup(&mut dpath, &MemReqMsg::read(0, 0x0000_1030, 0));
        fill(&mut dpath, 0, 0x3333);

        // register holds index 3, a new request at index 5 gets captured and looked up in one cycle
        assert_eq!(dpath.held_request().addr, 0x1030);
        lookup(&mut dpath, &MemReqMsg::read(0, 0x0000_1050, 0));
        let ctrl = ControlVector {
            skip_read_data_reg: true,
            way_sel_current: 0,
            cacheresp_type: MemReqType::Read,
            ..idle()
        };
        assert_eq!(dpath.cacheresp_msg(&ctrl).data, 0x5555);
        assert!(dpath.tag_match().get(0));
    }

    #[test]
    fn example_read_of_four_bytes() {
        let mut dpath = dpath();
        let line: Line = 0xFFEE_DDCC_BBAA_9988_7766_5544_3322_1100;
        lookup(&mut dpath, &MemReqMsg::read(0, 0x0000_1030, 0));
        fill(&mut dpath, 1, line);

        lookup(&mut dpath, &MemReqMsg::read(0x7, 0x0000_1034, 4));
        assert_eq!(dpath.status().tag_match, WayMask::only(1));
        let ctrl = ControlVector {
            skip_read_data_reg: true,
            way_sel_current: 1,
            read_byte_sel: 4,
            cacheresp_type: MemReqType::Read,
            cacheresp_hit: true,
            ..idle()
        };
        let resp = dpath.cacheresp_msg(&ctrl);
        assert_eq!(resp.data, 0x7766_5544);
        assert_eq!(resp.len, 4);
        assert_eq!(resp.opaque, 0x7);
        assert!(resp.hit());

        // through the read data register instead
        let latch = ControlVector {
            read_data_reg_en: true,
            way_sel_current: 1,
            ..idle()
        };
        dpath.tick(&latch, &MemReqMsg::default(), &MemRespMsg::default());
        let ctrl = ControlVector {
            skip_read_data_reg: false,
            way_sel_current: 0,
            ..ctrl
        };
        assert_eq!(dpath.cacheresp_msg(&ctrl).data, 0x7766_5544);
    }

    #[test]
    fn write_lands_in_its_lane_of_the_current_way_only() {
        let mut dpath = dpath();
        lookup(&mut dpath, &MemReqMsg::read(0, 0x1030, 0));
        fill(&mut dpath, 0, 0);
        fill(&mut dpath, 1, 0);

        let req = MemReqMsg::write(0, 0x1036, 2, 0xBEEF);
        lookup(&mut dpath, &req);
        let write = ControlVector {
            data_array_wen: true,
            data_array_wben: byte_enable(6, 2),
            way_sel_current: 1,
            read_byte_sel: 6,
            ..idle()
        };
        dpath.tick(&write, &MemReqMsg::default(), &MemRespMsg::default());
        assert_eq!(dpath.peek_line(1, 3), 0xBEEF << 48);
        assert_eq!(dpath.peek_line(0, 3), 0);

        let resp = dpath.cacheresp_msg(&ControlVector {
            cacheresp_type: MemReqType::Write,
            cacheresp_hit: true,
            ..idle()
        });
        assert_eq!(resp.data, 0);
        assert_eq!(resp.type_, MemReqType::Write);
    }

    #[test]
    fn memory_request_addresses() {
        let mut dpath = dpath();
        lookup(&mut dpath, &MemReqMsg::read(0, 0x0000_1030, 0));
        fill(&mut dpath, 1, 0x1234);

        // a different tag at the same index misses and has to evict way 1
        lookup(&mut dpath, &MemReqMsg::read(0x9, 0x0000_5038, 4));
        assert_eq!(dpath.tag_match(), WayMask::NONE);
        let latch = ControlVector {
            read_tag_reg_en: true,
            read_data_reg_en: true,
            way_sel_current: 1,
            ..idle()
        };
        dpath.tick(&latch, &MemReqMsg::default(), &MemRespMsg::default());

        let evict = dpath.memreq_msg(&ControlVector {
            memreq_type: MemReqType::Write,
            ..idle()
        });
        assert_eq!(evict.addr, 0x0000_1030);
        assert_eq!(evict.data, 0x1234);
        assert_eq!(evict.opaque, 0);
        assert_eq!(evict.len, 0);

        let refill = dpath.memreq_msg(&ControlVector {
            memreq_type: MemReqType::Read,
            ..idle()
        });
        assert_eq!(refill.addr, 0x0000_5030);
        assert_eq!(refill.addr & 0xF, 0);
    }
}
