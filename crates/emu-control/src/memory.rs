//! Physical memory of a 128K-class Spectrum.
//!
//! Four 16K ROM pages and eight 16K RAM pages, mapped into the CPU's view
//! through the $7FFD paging latch:
//!
//! - $0000-$3FFF: selected ROM page
//! - $4000-$7FFF: always RAM page 5
//! - $8000-$BFFF: always RAM page 2
//! - $C000-$FFFF: RAM page 0-7 (bits 0-2 of $7FFD)
//!
//! Loaders write to physical pages directly through [`Memory::page_mut`],
//! bypassing the latch.

/// Size of one physical page.
pub const PAGE_SIZE: usize = 0x4000;

const ROM_PAGES: usize = 4;
const RAM_PAGES: usize = 8;

/// A physical 16K page. Indices are masked to the installed page count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Rom(u8),
    Ram(u8),
}

/// ROM images a 128K machine with a disk interface carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RomBank {
    /// 128K editor and menu.
    Menu128 = 0,
    /// 48K BASIC.
    Basic48 = 1,
    /// Service / test ROM.
    Service = 2,
    /// TR-DOS.
    Dos = 3,
}

impl RomBank {
    /// The physical page this bank lives in.
    #[must_use]
    pub const fn page(self) -> Page {
        Page::Rom(self as u8)
    }

    const fn from_index(index: usize) -> Self {
        match index & 3 {
            0 => Self::Menu128,
            1 => Self::Basic48,
            2 => Self::Service,
            _ => Self::Dos,
        }
    }
}

/// Banked memory: ROM pages, RAM pages and the $7FFD latch.
pub struct Memory {
    rom: [Box<[u8; PAGE_SIZE]>; ROM_PAGES],
    ram: [Box<[u8; PAGE_SIZE]>; RAM_PAGES],
    rom_bank: RomBank,
    /// $7FFD register value.
    bank_reg: u8,
    /// Once bit 5 is set, further writes to $7FFD are ignored until reset.
    locked: bool,
    /// 48K mode: BASIC ROM at reset and the latch permanently locked.
    mode_48k: bool,
}

impl Memory {
    /// Blank memory: every ROM and RAM page zeroed, 128K menu ROM selected.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rom: std::array::from_fn(|_| Box::new([0u8; PAGE_SIZE])),
            ram: std::array::from_fn(|_| Box::new([0u8; PAGE_SIZE])),
            rom_bank: RomBank::Menu128,
            bank_reg: 0,
            locked: false,
            mode_48k: false,
        }
    }

    /// Install a ROM image. Short images are zero-padded, long ones truncated.
    pub fn load_rom(&mut self, bank: RomBank, data: &[u8]) {
        let page = self.page_mut(bank.page());
        let len = data.len().min(PAGE_SIZE);
        page[..len].copy_from_slice(&data[..len]);
        page[len..].fill(0);
    }

    /// Read-only access to a physical page.
    #[must_use]
    pub fn page(&self, page: Page) -> &[u8; PAGE_SIZE] {
        match page {
            Page::Rom(n) => &self.rom[usize::from(n) % ROM_PAGES],
            Page::Ram(n) => &self.ram[usize::from(n) % RAM_PAGES],
        }
    }

    /// Mutable access to a physical page (ROM pages included).
    pub fn page_mut(&mut self, page: Page) -> &mut [u8; PAGE_SIZE] {
        match page {
            Page::Rom(n) => &mut self.rom[usize::from(n) % ROM_PAGES],
            Page::Ram(n) => &mut self.ram[usize::from(n) % RAM_PAGES],
        }
    }

    /// Map a ROM page at $0000, regardless of the latch.
    pub fn select_rom(&mut self, bank: RomBank) {
        self.rom_bank = bank;
    }

    #[must_use]
    pub fn rom_bank(&self) -> RomBank {
        self.rom_bank
    }

    /// RAM page mapped at $C000 (0-7).
    fn page_bank(&self) -> usize {
        usize::from(self.bank_reg & 0x07)
    }

    #[must_use]
    pub fn read(&self, addr: u16) -> u8 {
        let a = usize::from(addr);
        match a {
            0x0000..0x4000 => self.rom[self.rom_bank as usize][a],
            0x4000..0x8000 => self.ram[5][a - 0x4000],
            0x8000..0xC000 => self.ram[2][a - 0x8000],
            _ => self.ram[self.page_bank()][a - 0xC000],
        }
    }

    /// Write through the current mapping. ROM writes are ignored.
    pub fn write(&mut self, addr: u16, val: u8) {
        let a = usize::from(addr);
        match a {
            0x0000..0x4000 => {}
            0x4000..0x8000 => self.ram[5][a - 0x4000] = val,
            0x8000..0xC000 => self.ram[2][a - 0x8000] = val,
            _ => {
                let bank = self.page_bank();
                self.ram[bank][a - 0xC000] = val;
            }
        }
    }

    /// Write the $7FFD latch. Bit 4 flips between the 128K and 48K ROMs.
    pub fn write_bank_register(&mut self, value: u8) {
        if self.locked {
            return;
        }
        self.bank_reg = value;
        self.locked = value & 0x20 != 0;
        self.rom_bank = RomBank::from_index(usize::from((value >> 4) & 1));
    }

    #[must_use]
    pub fn bank_register(&self) -> u8 {
        self.bank_reg
    }

    pub fn set_mode_48k(&mut self, on: bool) {
        self.mode_48k = on;
    }

    #[must_use]
    pub fn mode_48k(&self) -> bool {
        self.mode_48k
    }

    /// Power-on state: RAM cleared, latch reset, default ROM for the mode.
    pub fn reset(&mut self) {
        for page in &mut self.ram {
            page.fill(0);
        }
        self.bank_reg = 0;
        if self.mode_48k {
            self.rom_bank = RomBank::Basic48;
            self.locked = true;
        } else {
            self.rom_bank = RomBank::Menu128;
            self.locked = false;
        }
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}
