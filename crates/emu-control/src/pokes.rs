//! Persistent memory patches.

use crate::memory::Memory;

/// Address → byte overrides, in the order they were first applied.
///
/// Re-poking an address replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchOverlay {
    patches: Vec<(u16, u8)>,
}

impl PatchOverlay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, addr: u16, value: u8) {
        match self.patches.iter_mut().find(|(a, _)| *a == addr) {
            Some(patch) => patch.1 = value,
            None => self.patches.push((addr, value)),
        }
    }

    #[must_use]
    pub fn get(&self, addr: u16) -> Option<u8> {
        self.patches
            .iter()
            .find(|&&(a, _)| a == addr)
            .map(|&(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, u8)> + '_ {
        self.patches.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.patches.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Write every patch through the current memory mapping.
    pub fn apply(&self, memory: &mut Memory) {
        for &(addr, value) in &self.patches {
            memory.write(addr, value);
        }
    }
}
