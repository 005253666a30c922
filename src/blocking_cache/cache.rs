use crate::blocking_cache::config::CacheGeometry;
use crate::blocking_cache::ctrl::{BlockingCacheCtrl, CacheController, CacheStats, CtrlIn, CtrlOut};
use crate::blocking_cache::dpath::BlockingCacheDpath;
use crate::cache_soc::mem_msg::{MemReqMsg, MemRespMsg};

/// What sits on the cache's four ports at the start of a cycle
#[derive(Debug, Default, Clone, Copy)]
pub struct CacheIo<'a> {
    pub cachereq: Option<&'a MemReqMsg>,
    pub memresp: Option<&'a MemRespMsg>,
    pub cacheresp_rdy: bool,
    pub memreq_rdy: bool,
}

/// Which handshakes fired in a cycle, and the messages that went out
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CacheCycle {
    pub cachereq_fire: bool,
    pub memresp_fire: bool,
    pub cacheresp: Option<MemRespMsg>,
    pub memreq: Option<MemReqMsg>,
}

/// A controller and the datapath, clocked together
pub struct BlockingCache<C: CacheController = BlockingCacheCtrl> {
    ctrl: C,
    dpath: BlockingCacheDpath,
    last: CtrlOut,
}

impl BlockingCache<BlockingCacheCtrl> {
    pub fn new(geometry: CacheGeometry) -> Self {
        Self::with_controller(geometry, BlockingCacheCtrl::new(geometry))
    }
}

impl<C: CacheController> BlockingCache<C> {
    pub fn with_controller(geometry: CacheGeometry, ctrl: C) -> Self {
        Self {
            ctrl,
            dpath: BlockingCacheDpath::new(geometry),
            last: CtrlOut::default(),
        }
    }

    pub fn ctrl(&self) -> &C {
        &self.ctrl
    }

    pub fn dpath(&self) -> &BlockingCacheDpath {
        &self.dpath
    }

    pub fn stats(&self) -> CacheStats {
        self.ctrl.stats()
    }

    /// One clock cycle: status -> controller -> outgoing messages -> clock edge
    pub fn cycle(&mut self, io: CacheIo<'_>) -> CacheCycle {
        let status = self.dpath.status();
        let ctrl_in = CtrlIn {
            cachereq_val: io.cachereq.is_some(),
            cacheresp_rdy: io.cacheresp_rdy,
            memreq_rdy: io.memreq_rdy,
            memresp_val: io.memresp.is_some(),
        };
        let out = self.ctrl.step(&status, &ctrl_in);
        let (cacheresp, memreq) = self.dpath.outputs(&out.ctrl);

        let fired = CacheCycle {
            cachereq_fire: out.cachereq_rdy && ctrl_in.cachereq_val,
            memresp_fire: out.memresp_rdy && ctrl_in.memresp_val,
            cacheresp: (out.cacheresp_val && ctrl_in.cacheresp_rdy).then_some(cacheresp),
            memreq: (out.memreq_val && ctrl_in.memreq_rdy).then_some(memreq),
        };

        let idle_req = MemReqMsg::default();
        let idle_resp = MemRespMsg::default();
        self.dpath.tick(
            &out.ctrl,
            io.cachereq.unwrap_or(&idle_req),
            io.memresp.unwrap_or(&idle_resp),
        );
        self.last = out;
        fired
    }

    /// ports and controller state of the last cycle
    pub fn line_trace(&self) -> String {
        format!(
            "{}{}({}){}{}",
            if self.last.cachereq_rdy { "." } else { "#" },
            if self.last.memreq_val { "m" } else { " " },
            self.ctrl.state_name(),
            if self.last.memresp_rdy { "." } else { " " },
            if self.last.cacheresp_val { "r" } else { " " },
        )
    }
}
