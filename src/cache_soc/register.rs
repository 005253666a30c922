/// RegEnRst models a flip-flop bank with an enable and a reset value, like RegEnRst in a verilog lib
/// The output is what was sampled at the last clock edge where `en` was high
/// Nothing changes between edges, so any combinational logic reading `out` within a cycle sees a stable value
#[derive(Debug, Clone)]
pub struct RegEnRst<T: Copy> {
    out: T,
    reset_value: T,
}

impl<T: Copy> RegEnRst<T> {
    pub fn new(reset_value: T) -> Self {
        Self {
            out: reset_value,
            reset_value,
        }
    }

    #[inline]
    pub fn out(&self) -> T {
        self.out
    }

    /// clock edge
    #[inline]
    pub fn tick(&mut self, en: bool, in_: T) {
        if en {
            self.out = in_;
        }
    }

    pub fn reset(&mut self) {
        self.out = self.reset_value;
    }
}

impl<T: Copy + Default> Default for RegEnRst<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// n-input mux, `sel` must be in range
#[inline]
pub fn mux<T: Copy>(sel: usize, in_: &[T]) -> T {
    assert!(sel < in_.len(), "mux select {sel} out of range for {} ports", in_.len());
    in_[sel]
}
