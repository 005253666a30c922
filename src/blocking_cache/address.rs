use crate::cache_soc::bits::{mask, slice};
use crate::cache_soc::mem_msg::{Address, LINE_NBYTES};

pub type Tag = u32;
pub type Index = usize;

/// byte within a 16 byte line
pub const OFFSET_NBITS: u32 = 4;

/// Splits a request address into tag, index and block offset
///
/// ```text
///  addr_nbits-1        4+idw  4+idw-1        4  3      0
/// +-----------------------+-----------------+--------+
/// |          tag          |      index      | offset |
/// +-----------------------+-----------------+--------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressSplitter {
    addr_nbits: u32,
    idw: u32,
}

impl AddressSplitter {
    pub fn new(addr_nbits: u32, idw: u32) -> Self {
        assert!(OFFSET_NBITS + idw < addr_nbits && addr_nbits <= 32);
        Self { addr_nbits, idw }
    }

    #[inline]
    pub fn idw(&self) -> u32 {
        self.idw
    }

    #[inline]
    pub fn tag_nbits(&self) -> u32 {
        self.addr_nbits - OFFSET_NBITS - self.idw
    }

    #[inline]
    pub fn tag_mask(&self) -> Tag {
        mask(self.tag_nbits()) as Tag
    }

    #[inline]
    pub fn tag(&self, addr: Address) -> Tag {
        slice(addr as u128, OFFSET_NBITS + self.idw, self.addr_nbits) as Tag
    }

    #[inline]
    pub fn index(&self, addr: Address) -> Index {
        slice(addr as u128, OFFSET_NBITS, OFFSET_NBITS + self.idw) as Index
    }

    #[inline]
    pub fn offset(&self, addr: Address) -> u8 {
        slice(addr as u128, 0, OFFSET_NBITS) as u8
    }

    /// index to use for the array lookup this cycle
    /// a request being captured right now has not reached the address register yet, so its index is
    /// taken straight from the incoming message instead of the stale register
    #[inline]
    pub fn current_index(&self, cachereq_en: bool, incoming: Address, held: Address) -> Index {
        if cachereq_en { self.index(incoming) } else { self.index(held) }
    }

    /// block aligned address of the line with this tag and index
    pub fn block_addr(&self, tag: Tag, index: Index) -> Address {
        let tag = (tag & self.tag_mask()) as u128;
        let index = (index as u128) & mask(self.idw);
        ((tag << (OFFSET_NBITS + self.idw)) | (index << OFFSET_NBITS)) as Address
    }

    /// tag ++ index ++ offset
    pub fn concat(&self, tag: Tag, index: Index, offset: u8) -> Address {
        self.block_addr(tag, index) | (offset as Address & (LINE_NBYTES - 1))
    }
}
