//! The `Context` value threaded through every public entry point (spec
//! section 9, "Global mutable state" redesign note): replaces the
//! source's ambient module-wide globals (allocators, paths, verbose flag,
//! backend selection) with an explicit value passed from `main` down
//! through bootstrap, the driver, the backend and the scanner.

use std::path::PathBuf;

use crate::backend::CompilerBackend;

pub struct Context {
    pub verbose: bool,
    pub force_rebuild: bool,
    /// The resolved, canonicalised path to the input file given on the
    /// command line (a `.c`/`.cpp` description source or a cached
    /// `.build_info` file).
    pub input_file: PathBuf,
    /// Advisory flag set when a Visual Studio project invokes the
    /// orchestrator back (spec section 6); adjusts path resolution to be
    /// relative to the solution directory rather than the shell's cwd.
    pub visual_studio_build: bool,
    pub backend: Box<dyn CompilerBackend>,
}

impl Context {
    pub fn description_dir(&self) -> PathBuf {
        self.input_file
            .parent()
            .map(std::path::Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
