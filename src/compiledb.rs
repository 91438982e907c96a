//! Compilation database emission (spec section 4.5/4.6: `--generate-
//! compilation-database` writes `compile_commands.json` in the standard
//! clangd-consumable shape). This is the one place `serde_json` earns its
//! keep (section 2's ambient-stack note) - every other on-disk format in
//! this crate is bespoke.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{CrucibleError, Result};

#[derive(Debug, Clone, Serialize)]
pub struct CompilationDatabaseEntry {
    pub directory: PathBuf,
    pub file: PathBuf,
    pub arguments: Vec<String>,
    pub output: PathBuf,
}

/// Entries keep stable source-list-position ordering (spec section 4.4/5:
/// "compilation-database entries keep stable source-list-position
/// ordering via indexed collection rather than push order"), so callers
/// collect into a pre-sized `Vec` indexed by source position rather than
/// pushing from parallel compile threads.
#[derive(Debug, Default)]
pub struct CompilationDatabase {
    entries: Vec<CompilationDatabaseEntry>,
}

impl CompilationDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, index: usize, entry: CompilationDatabaseEntry) {
        if index >= self.entries.len() {
            self.entries.resize_with(index + 1, || CompilationDatabaseEntry {
                directory: PathBuf::new(),
                file: PathBuf::new(),
                arguments: Vec::new(),
                output: PathBuf::new(),
            });
        }
        self.entries[index] = entry;
    }

    pub fn extend(&mut self, other: CompilationDatabase) {
        self.entries.extend(other.entries);
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| CrucibleError::Internal(format!("failed to serialise compile_commands.json: {e}")))?;
        std::fs::write(path, json).map_err(|e| CrucibleError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_indexed_order_regardless_of_set_order() {
        let mut db = CompilationDatabase::new();
        db.set(
            2,
            CompilationDatabaseEntry {
                directory: PathBuf::from("/proj"),
                file: PathBuf::from("c.c"),
                arguments: vec!["cc".to_string()],
                output: PathBuf::from("c.o"),
            },
        );
        db.set(
            0,
            CompilationDatabaseEntry {
                directory: PathBuf::from("/proj"),
                file: PathBuf::from("a.c"),
                arguments: vec!["cc".to_string()],
                output: PathBuf::from("a.o"),
            },
        );

        assert_eq!(db.entries[0].file, PathBuf::from("a.c"));
        assert_eq!(db.entries[2].file, PathBuf::from("c.c"));
    }
}
