/// Helpers for the bit slicing that the hardware models do on plain integers

/// ceil(log2(n)), with clog2(0) == clog2(1) == 0
pub const fn clog2(n: usize) -> u32 {
    if n <= 1 { 0 } else { usize::BITS - (n - 1).leading_zeros() }
}

/// mask with the low `nbits` bits set
#[inline]
pub const fn mask(nbits: u32) -> u128 {
    if nbits >= u128::BITS { u128::MAX } else { (1u128 << nbits) - 1 }
}

/// value[lo:hi], the verilog-ish half open slice
#[inline]
pub fn slice(value: u128, lo: u32, hi: u32) -> u128 {
    assert!(lo <= hi && hi <= u128::BITS);
    value.checked_shr(lo).unwrap_or(0) & mask(hi - lo)
}

/// logical shifts where shifting a full width or more gives zero, like a real shifter
#[inline]
pub fn shl(value: u128, shamt: u32) -> u128 {
    value.checked_shl(shamt).unwrap_or(0)
}

#[inline]
pub fn shr(value: u128, shamt: u32) -> u128 {
    value.checked_shr(shamt).unwrap_or(0)
}

/// One bit per way, used for every per-way signal
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WayMask(pub u32);

impl WayMask {
    pub const NONE: WayMask = WayMask(0);

    pub fn all(num_ways: usize) -> Self {
        assert!(num_ways <= 32);
        WayMask(mask(num_ways as u32) as u32)
    }

    pub fn only(way: usize) -> Self {
        assert!(way < 32);
        WayMask(1 << way)
    }

    #[inline]
    pub fn get(self, way: usize) -> bool {
        way < 32 && self.0 & (1 << way) != 0
    }

    #[inline]
    pub fn set(&mut self, way: usize, v: bool) {
        assert!(way < 32);
        self.0 &= !(1 << way);
        self.0 |= (v as u32) << way;
    }

    pub fn any(self) -> bool {
        self.0 != 0
    }

    /// lowest set way, if any
    pub fn first(self) -> Option<usize> {
        if self.0 == 0 { None } else { Some(self.0.trailing_zeros() as usize) }
    }
}
