use crate::cache_soc::bits::mask;
use crate::cache_soc::mem_msg::{Address, Line, MemReqMsg, MemReqType};
use crate::cache_soc::register::RegEnRst;

/// Holding registers for the request currently being served
/// All fields capture together on `cachereq_en` and hold otherwise.
/// Capturing again before the response went out loses the old request, the controller must not do that.
#[derive(Debug)]
pub struct RequestRegisterBank {
    /// opaque bits beyond the configured width are dropped on capture
    opaque_mask: u8,
    type_reg: RegEnRst<MemReqType>,
    addr_reg: RegEnRst<Address>,
    opaque_reg: RegEnRst<u8>,
    data_reg: RegEnRst<Line>,
    len_reg: RegEnRst<u8>,
}

impl RequestRegisterBank {
    pub fn new(opaque_nbits: u32) -> Self {
        assert!(opaque_nbits <= u8::BITS);
        Self {
            opaque_mask: mask(opaque_nbits) as u8,
            type_reg: RegEnRst::default(),
            addr_reg: RegEnRst::new(0),
            opaque_reg: RegEnRst::new(0),
            data_reg: RegEnRst::new(0),
            len_reg: RegEnRst::new(0),
        }
    }

    /// clock edge
    pub fn tick(&mut self, cachereq_en: bool, msg: &MemReqMsg) {
        self.type_reg.tick(cachereq_en, msg.type_);
        self.addr_reg.tick(cachereq_en, msg.addr);
        self.opaque_reg.tick(cachereq_en, msg.opaque & self.opaque_mask);
        self.data_reg.tick(cachereq_en, msg.data);
        self.len_reg.tick(cachereq_en, msg.len);
    }

    #[inline]
    pub fn type_(&self) -> MemReqType {
        self.type_reg.out()
    }

    #[inline]
    pub fn addr(&self) -> Address {
        self.addr_reg.out()
    }

    #[inline]
    pub fn opaque(&self) -> u8 {
        self.opaque_reg.out()
    }

    #[inline]
    pub fn data(&self) -> Line {
        self.data_reg.out()
    }

    #[inline]
    pub fn len(&self) -> u8 {
        self.len_reg.out()
    }

    /// the held request as a message again
    pub fn held(&self) -> MemReqMsg {
        MemReqMsg {
            type_: self.type_(),
            opaque: self.opaque(),
            addr: self.addr(),
            len: self.len(),
            data: self.data(),
        }
    }
}
