use std::fmt::{self, Display};

use crate::cache_soc::bits::mask;

pub type Address = u32;

/// a full cache line, also the container for request/response data
pub type Line = u128;

/// field widths of the memory messages
pub const TYPE_NBITS: u32 = 4;
pub const OPAQUE_NBITS: u32 = 8;
pub const ADDR_NBITS: u32 = 32;
pub const LEN_NBITS: u32 = 5;
pub const DATA_NBITS: u32 = 128;

/// bytes in a line, a length of 0 in a message stands for this
pub const LINE_NBYTES: u32 = DATA_NBITS / 8;

const _: () = {
    assert!(ADDR_NBITS == Address::BITS);
    assert!(DATA_NBITS == Line::BITS);
    assert!(OPAQUE_NBITS == u8::BITS);
    assert!((MemReqType::AmoXor as u32) < (1 << TYPE_NBITS));
    assert!(LINE_NBYTES < (1 << LEN_NBITS));
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MemReqType {
    #[default]
    Read = 0,
    Write = 1,
    Init = 2,
    AmoAdd = 3,
    AmoAnd = 4,
    AmoOr = 5,
    AmoSwap = 6,
    AmoMin = 7,
    AmoMinu = 8,
    AmoMax = 9,
    AmoMaxu = 10,
    AmoXor = 11,
}

impl MemReqType {
    /// the low bit of the encoding, used to steer the memory request tag mux
    #[inline]
    pub fn bit0(self) -> bool {
        (self as u8) & 0x1 != 0
    }

    pub fn is_amo(self) -> bool {
        (self as u8) >= MemReqType::AmoAdd as u8
    }

    fn mnemonic(self) -> &'static str {
        match self {
            MemReqType::Read => "rd",
            MemReqType::Write => "wr",
            MemReqType::Init => "in",
            MemReqType::AmoAdd => "ad",
            MemReqType::AmoAnd => "an",
            MemReqType::AmoOr => "or",
            MemReqType::AmoSwap => "sw",
            MemReqType::AmoMin => "mi",
            MemReqType::AmoMinu => "mu",
            MemReqType::AmoMax => "mx",
            MemReqType::AmoMaxu => "xu",
            MemReqType::AmoXor => "xo",
        }
    }
}

impl TryFrom<u8> for MemReqType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => MemReqType::Read,
            1 => MemReqType::Write,
            2 => MemReqType::Init,
            3 => MemReqType::AmoAdd,
            4 => MemReqType::AmoAnd,
            5 => MemReqType::AmoOr,
            6 => MemReqType::AmoSwap,
            7 => MemReqType::AmoMin,
            8 => MemReqType::AmoMinu,
            9 => MemReqType::AmoMax,
            10 => MemReqType::AmoMaxu,
            11 => MemReqType::AmoXor,
            other => return Err(other),
        })
    }
}

/// Request message, used both for requester -> cache and cache -> memory
/// only the low `len` bytes of `data` carry meaning, a `len` of 0 is a full line
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemReqMsg {
    pub type_: MemReqType,
    pub opaque: u8,
    pub addr: Address,
    pub len: u8,
    pub data: Line,
}

impl MemReqMsg {
    pub fn new(type_: MemReqType, opaque: u8, addr: Address, len: u8, data: Line) -> Self {
        assert!(
            (len as u32) <= LINE_NBYTES,
            "request length {len} does not fit into a {LINE_NBYTES} byte line"
        );
        Self {
            type_,
            opaque,
            addr,
            len,
            data,
        }
    }

    pub fn read(opaque: u8, addr: Address, len: u8) -> Self {
        Self::new(MemReqType::Read, opaque, addr, len, 0)
    }

    pub fn write(opaque: u8, addr: Address, len: u8, data: Line) -> Self {
        Self::new(MemReqType::Write, opaque, addr, len, data)
    }

    pub fn init(opaque: u8, addr: Address, len: u8, data: Line) -> Self {
        Self::new(MemReqType::Init, opaque, addr, len, data)
    }
}

/// Response message, used both for cache -> requester and memory -> cache
/// `test` is a 2 bit field, bit 0 carries the hit flag and bit 1 is reserved and always zero
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemRespMsg {
    pub type_: MemReqType,
    pub opaque: u8,
    pub test: u8,
    pub len: u8,
    pub data: Line,
}

impl MemRespMsg {
    pub fn new(type_: MemReqType, opaque: u8, hit: bool, len: u8, data: Line) -> Self {
        Self {
            type_,
            opaque,
            test: hit as u8,
            len,
            data,
        }
    }

    #[inline]
    pub fn hit(&self) -> bool {
        self.test & 0x1 != 0
    }
}

fn data_hex(data: Line, len: u8) -> String {
    let nbytes = if len == 0 { LINE_NBYTES } else { len as u32 };
    format!("{:0width$x}", data & mask(nbytes * 8), width = (nbytes * 2) as usize)
}

impl Display for MemReqMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = match self.type_ {
            MemReqType::Read => String::new(),
            _ => data_hex(self.data, self.len),
        };
        write!(
            f,
            "{}:{:02x}:{:08x}:{:x}:{}",
            self.type_.mnemonic(),
            self.opaque,
            self.addr,
            self.len,
            data
        )
    }
}

impl Display for MemRespMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = match self.type_ {
            MemReqType::Read => data_hex(self.data, self.len),
            _ => String::new(),
        };
        write!(
            f,
            "{}:{:02x}:{:x}:{:x}:{}",
            self.type_.mnemonic(),
            self.opaque,
            self.test,
            self.len,
            data
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_encoding() {
        assert_eq!(MemReqType::try_from(1u8), Ok(MemReqType::Write));
        assert_eq!(MemReqType::try_from(12u8), Err(12));
        assert!(!MemReqType::Read.bit0());
        assert!(MemReqType::Write.bit0());
        assert!(MemReqType::AmoXor.is_amo());
        assert!(!MemReqType::Init.is_amo());
    }

    #[test]
    fn hit_is_bit_zero_of_test() {
        let resp = MemRespMsg::new(MemReqType::Read, 3, true, 4, 0);
        assert_eq!(resp.test, 0b01);
        assert!(resp.hit());
        let resp = MemRespMsg::new(MemReqType::Read, 3, false, 4, 0);
        assert_eq!(resp.test, 0b00);
        assert!(!resp.hit());
    }

    #[test]
    fn display() {
        let req = MemReqMsg::read(0x2a, 0x1034, 4);
        assert_eq!(req.to_string(), "rd:2a:00001034:4:");
        let req = MemReqMsg::write(0, 0x1000, 2, 0xABCD_1234);
        assert_eq!(req.to_string(), "wr:00:00001000:2:1234");
        let resp = MemRespMsg::new(MemReqType::Read, 1, true, 1, 0xEF);
        assert_eq!(resp.to_string(), "rd:01:1:1:ef");
    }

    #[test]
    #[should_panic]
    fn rejects_length_beyond_a_line() {
        MemReqMsg::read(0, 0, 17);
    }
}
