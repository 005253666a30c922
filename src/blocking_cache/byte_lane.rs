//! Byte lane alignment between full lines and sub-line requests
//!
//! Storage is always a whole line, requests are 1 to 16 bytes at any byte offset.
//! Reads shift the line down and mask off everything past the request length,
//! writes shift the request data up to its lane and merge it in under a byte enable.

use crate::cache_soc::bits::{mask, shl, shr};
use crate::cache_soc::mem_msg::{LINE_NBYTES, Line};

/// a length of 0 stands for the full line
#[inline]
pub fn effective_len(len: u8) -> u32 {
    if len == 0 { LINE_NBYTES } else { len as u32 }
}

/// move the byte at `offset` down to byte 0
#[inline]
pub fn align_low(line: Line, offset: u8) -> Line {
    shr(line, offset as u32 * 8)
}

/// move byte 0 up to `offset`
#[inline]
pub fn align_high(data: Line, offset: u8) -> Line {
    shl(data, offset as u32 * 8)
}

/// keep only the low `len_bytes` bytes
#[inline]
pub fn mask_to(value: Line, len_bytes: u32) -> Line {
    let omask = shl(!0, len_bytes * 8);
    value & !omask
}

/// the requested sub-range of a line, right aligned with zeroes above it
#[inline]
pub fn extract(line: Line, offset: u8, len: u8) -> Line {
    mask_to(align_low(line, offset), effective_len(len))
}

/// byte enables for a write of `len` bytes at `offset`, bytes past the end of the line are dropped
pub fn byte_enable(offset: u8, len: u8) -> u16 {
    let lanes = mask(effective_len(len));
    (shl(lanes, offset as u32) & mask(LINE_NBYTES)) as u16
}

/// take the enabled bytes from `new`, the rest from `old`
pub fn merge(old: Line, new: Line, wben: u16) -> Line {
    let mut bits: Line = 0;
    for byte in 0..LINE_NBYTES {
        if wben & (1 << byte) != 0 {
            bits |= 0xFF << (byte * 8);
        }
    }
    (old & !bits) | (new & bits)
}

/// write `len` bytes of `data` into `line` at `offset`
pub fn write(line: Line, offset: u8, len: u8, data: Line) -> Line {
    merge(line, align_high(data, offset), byte_enable(offset, len))
}
