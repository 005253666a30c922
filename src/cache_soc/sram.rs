use crate::cache_soc::bits::mask;
use crate::cache_soc::mem_msg::Line;

/// The signals going into one single ported sram for a given cycle
#[derive(Debug, Default, Clone, Copy)]
pub struct SramPort {
    /// chip enable, nothing is sampled without it
    pub ce: bool,
    pub we: bool,
    pub addr: usize,
    /// one bit per byte of the word
    pub wmask: u16,
    pub in_: Line,
}

/// Single ported synchronous sram
/// A read is issued with `ce` and the read out is latched at the clock edge, so it shows up the cycle after
/// The read out is always the content of the slot from before a write in the same cycle
/// Without `ce` the read out just holds whatever was read last
#[derive(Debug)]
pub struct Sram {
    num_bits: u32,
    data: Box<[Line]>,
    out: Line,
}

impl Sram {
    pub fn new(num_bits: u32, num_words: usize) -> Self {
        assert!(num_bits > 0 && num_bits <= Line::BITS && num_bits % 8 == 0);
        assert!(num_words > 0);
        Self {
            num_bits,
            data: vec![0 as Line; num_words].into_boxed_slice(),
            out: 0,
        }
    }

    #[inline]
    pub fn num_words(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn num_bytes(&self) -> usize {
        (self.num_bits / 8) as usize
    }

    /// mask with every byte of a word enabled
    pub fn full_wmask(&self) -> u16 {
        mask(self.num_bits / 8) as u16
    }

    #[inline]
    pub fn out(&self) -> Line {
        self.out
    }

    /// clock edge
    pub fn tick(&mut self, port: &SramPort) {
        if !port.ce {
            return;
        }
        assert!(
            port.addr < self.data.len(),
            "sram address {} out of bounds for {} words",
            port.addr,
            self.data.len()
        );
        let old = self.data[port.addr];
        self.out = old;
        if port.we {
            let mut new = old;
            for byte in 0..self.num_bytes() {
                if port.wmask & (1 << byte) != 0 {
                    let lane = 0xFFu128 << (byte * 8);
                    new = (new & !lane) | (port.in_ & lane);
                }
            }
            self.data[port.addr] = new & mask(self.num_bits);
        }
    }

    /// backdoor access to the storage, for debugging and tests
    pub fn peek(&self, addr: usize) -> Line {
        self.data[addr]
    }
}
