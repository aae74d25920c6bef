//! File-type registry.
//!
//! Each record ties an extension tag to optional open and store functions.
//! Several tags share one function (`trd`, `scl` and `fdi` all go to the
//! disk controller); the function receives the matched tag.

use std::path::Path;

use log::warn;

use crate::control::Control;
use crate::error::FileError;
use crate::machine::Machine;

/// Open `data` as a file of kind `tag`.
pub type OpenFn<M> = fn(&mut Control<M>, &'static str, &[u8]) -> Result<(), FileError>;

/// Save machine state to `path` as a file of kind `tag`.
pub type StoreFn<M> = fn(&mut Control<M>, &'static str, &Path) -> Result<(), FileError>;

/// One registered format.
pub struct FileType<M> {
    pub tag: &'static str,
    pub open: Option<OpenFn<M>>,
    pub store: Option<StoreFn<M>>,
}

// Function pointers are Copy whatever `M` is; a derive would demand `M: Copy`.
impl<M> Clone for FileType<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for FileType<M> {}

impl<M> std::fmt::Debug for FileType<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileType")
            .field("tag", &self.tag)
            .field("open", &self.open.is_some())
            .field("store", &self.store.is_some())
            .finish()
    }
}

impl<M> FileType<M> {
    #[must_use]
    pub const fn can_open(&self) -> bool {
        self.open.is_some()
    }

    #[must_use]
    pub const fn can_store(&self) -> bool {
        self.store.is_some()
    }
}

impl<M: Machine> FileType<M> {
    pub fn open(&self, control: &mut Control<M>, data: &[u8]) -> Result<(), FileError> {
        let open = self.open.ok_or(FileError::CannotOpen(self.tag))?;
        open(control, self.tag, data)
    }

    pub fn store(&self, control: &mut Control<M>, path: &Path) -> Result<(), FileError> {
        let store = self.store.ok_or(FileError::CannotStore(self.tag))?;
        store(control, self.tag, path)
    }
}

/// Text after the last `.` in `name`. Path components are not stripped.
#[must_use]
pub fn extension(name: &str) -> Option<&str> {
    name.rsplit_once('.').map(|(_, ext)| ext)
}

/// Ordered registry; the first record with a matching tag wins.
pub struct FileTypes<M> {
    types: Vec<FileType<M>>,
}

impl<M> FileTypes<M> {
    #[must_use]
    pub fn new() -> Self {
        Self { types: Vec::new() }
    }

    /// Append a record. A duplicate tag is kept but never matched.
    pub fn register(&mut self, file_type: FileType<M>) {
        if self.find(file_type.tag).is_some() {
            warn!("file type {:?} registered twice", file_type.tag);
        }
        self.types.push(file_type);
    }

    /// Exact, case-sensitive tag lookup.
    #[must_use]
    pub fn find(&self, tag: &str) -> Option<FileType<M>> {
        self.types.iter().find(|t| t.tag == tag).copied()
    }

    /// Look up the handler for `name` by its extension.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<FileType<M>> {
        extension(name).and_then(|ext| self.find(ext))
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileType<M>> {
        self.types.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl<M> Default for FileTypes<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeMachine;

    fn open_ok(_: &mut Control<FakeMachine>, _: &'static str, _: &[u8]) -> Result<(), FileError> {
        Ok(())
    }

    fn record(tag: &'static str) -> FileType<FakeMachine> {
        FileType {
            tag,
            open: Some(open_ok),
            store: None,
        }
    }

    #[test]
    fn extension_is_after_last_dot() {
        assert_eq!(extension("game.tap"), Some("tap"));
        assert_eq!(extension("dir.d/game.tar.tzx"), Some("tzx"));
        assert_eq!(extension("README"), None);
        assert_eq!(extension("dir.d/README"), Some("d/README"));
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let mut types = FileTypes::new();
        types.register(record("tap"));
        assert!(types.find_by_name("GAME.TAP").is_none());
        assert!(types.find_by_name("game.tap").is_some());
    }

    #[test]
    fn first_registration_wins() {
        let mut types = FileTypes::new();
        types.register(record("sna"));
        types.register(FileType {
            tag: "sna",
            open: None,
            store: None,
        });
        assert_eq!(types.len(), 2);
        assert!(types.find("sna").is_some_and(|t| t.can_open()));
    }
}
