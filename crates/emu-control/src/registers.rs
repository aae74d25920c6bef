//! Z80 register file as seen by loaders.

/// One bank of the eight general-purpose registers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterSet {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
}

impl RegisterSet {
    /// Every pair set to `hi:lo`.
    #[must_use]
    pub const fn filled(hi: u8, lo: u8) -> Self {
        Self {
            a: hi,
            f: lo,
            b: hi,
            c: lo,
            d: hi,
            e: lo,
            h: hi,
            l: lo,
        }
    }

    #[must_use]
    pub const fn af(&self) -> u16 {
        u16::from_be_bytes([self.a, self.f])
    }

    #[must_use]
    pub const fn bc(&self) -> u16 {
        u16::from_be_bytes([self.b, self.c])
    }

    #[must_use]
    pub const fn de(&self) -> u16 {
        u16::from_be_bytes([self.d, self.e])
    }

    #[must_use]
    pub const fn hl(&self) -> u16 {
        u16::from_be_bytes([self.h, self.l])
    }
}

/// CPU state a loader may seed before handing control to the machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    pub main: RegisterSet,
    /// The shadow bank swapped in by `EX AF,AF'` and `EXX`.
    pub alt: RegisterSet,
    pub ix: u16,
    pub iy: u16,
    pub sp: u16,
    pub pc: u16,
    pub i: u8,
    pub r: u8,
    pub iff1: bool,
    pub iff2: bool,
    pub im: u8,
}

impl Registers {
    /// Seed AF, BC, DE and HL in both banks with `hi` in the high half and
    /// `lo` in the low half.
    pub fn fill_pairs(&mut self, hi: u8, lo: u8) {
        self.main = RegisterSet::filled(hi, lo);
        self.alt = RegisterSet::filled(hi, lo);
    }
}
