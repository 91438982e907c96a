//! Compiler Backend Interface (spec section 4.4).
//!
//! One [`CompilerBackend`] per toolchain family. Every method is a thin,
//! side-effecting wrapper around [`crate::process::run`] plus argv
//! construction - the interesting logic is "what flags does this
//! toolchain want", not control flow, so the trait stays small and
//! object-safe (`Box<dyn CompilerBackend>` is how `driver.rs` holds one).

mod clang;
mod gcc;
mod msvc;

pub use clang::ClangBackend;
pub use gcc::GccBackend;
pub use msvc::MsvcBackend;

use std::path::{Path, PathBuf};

use crate::config::{BinaryType, BuildConfig, BuilderOptions};
use crate::error::Result;

/// The on-disk artefact shape a `BinaryType` maps to for a given backend -
/// distinct backends use different file extensions for the same logical
/// type (`.exe`/`` for executables, `.dll`/`.so`/`.dylib` for dynamic
/// libraries, `.lib`/`.a` for static ones).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Archetype {
    pub binary_extension: &'static str,
    pub object_extension: &'static str,
}

pub struct CompileResult {
    pub object_path: PathBuf,
    pub exit_code: i32,
    pub argv: Vec<String>,
    /// Populated only by backends that emit a `.d` file (Clang/GCC); MSVC
    /// reports include dependencies via `/showIncludes` parsing instead
    /// (section 4.4: "each backend harvests includes its own native way").
    pub dependency_file: Option<PathBuf>,
}

pub struct LinkResult {
    pub output_path: PathBuf,
    pub exit_code: i32,
    pub argv: Vec<String>,
}

/// Object-safe per spec section 4.4 ("safe to invoke from multiple
/// threads"); implementations carry no interior mutability, so `&self`
/// methods are naturally `Send + Sync`.
pub trait CompilerBackend: Send + Sync {
    fn init(&self) -> Result<()> {
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    /// Compiles a single translation unit into an object file.
    fn compile_one(
        &self,
        config: &BuildConfig,
        source: &Path,
        object_out: &Path,
        description_dir: &Path,
    ) -> Result<CompileResult>;

    /// Links (or archives, for static libraries) a config's object files
    /// into its final binary artefact.
    fn link_intermediates(
        &self,
        config: &BuildConfig,
        objects: &[PathBuf],
        output: &Path,
        description_dir: &Path,
    ) -> Result<LinkResult>;

    fn archetype_for(&self, binary_type: BinaryType) -> Archetype;

    /// Parses whatever per-TU dependency artefact this backend produced
    /// (a `.d` file for Clang/GCC) into the list of headers that TU
    /// transitively included, for build-info tracking.
    fn collect_include_dependencies(&self, dependency_file: &Path) -> Result<Vec<PathBuf>>;

    fn compiler_path(&self) -> &str;
    fn compiler_version(&self) -> &str;
}

/// Shared object-file naming: `stem.ext` inside `object_dir`, keyed by the
/// source file's own path so sibling directories with same-named files
/// don't collide (mirrors the source's flattened, hashed object naming
/// intent without needing a hash - the relative path is already unique).
pub fn object_path_for(object_dir: &Path, source: &Path, description_dir: &Path, ext: &str) -> PathBuf {
    let relative = source.strip_prefix(description_dir).unwrap_or(source);
    let mut flattened = relative.to_string_lossy().replace(['/', '\\'], "_");
    flattened.push('.');
    flattened.push_str(ext);
    object_dir.join(flattened)
}

/// `unescape_spaces` + tokeniser shared by Clang/GCC `.d`-file parsing
/// (section 4.4: "byte-for-byte" port of `ReadDependencyFile`).
pub(crate) fn parse_makefile_deps(contents: &str) -> Vec<PathBuf> {
    let Some(colon) = contents.find(':') else {
        return Vec::new();
    };

    let body = &contents[colon + 1..];
    let joined = body.replace("\\\n", " ").replace("\\\r\n", " ");

    let mut deps = Vec::new();
    let mut current = String::new();
    let mut chars = joined.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&' ') => {
                current.push(' ');
                chars.next();
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    deps.push(PathBuf::from(std::mem::take(&mut current)));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        deps.push(PathBuf::from(current));
    }

    // First token is the object file's own name, not a dependency.
    if !deps.is_empty() {
        deps.remove(0);
    }
    deps
}

/// Picks the real-build backend from the user's `BuilderOptions` (spec
/// section 4.4's MSVC-only carve-out: `compiler_path` of `"cl"`/`"cl.exe"`
/// selects MSVC and triggers vendor discovery; a path containing `gcc`/
/// `g++` selects GCC; anything else, including the unset default, is
/// Clang). Infallible - mismatches are warnings, never a hard failure,
/// per spec section 4.4's "does not fail" wording.
pub fn select(options: &BuilderOptions) -> Box<dyn CompilerBackend> {
    let path = options.compiler_path.clone().unwrap_or_else(|| "clang".to_string());
    let version = options.compiler_version.clone().unwrap_or_default();

    let lowered = path.to_ascii_lowercase();

    if lowered == "cl" || lowered == "cl.exe" {
        let resolved = msvc::discover_installation(&version);
        return Box::new(MsvcBackend::new(resolved, version));
    }

    if lowered.contains("gcc") || lowered.contains("g++") {
        return Box::new(GccBackend::new(path, version));
    }

    Box::new(ClangBackend::new(path, version))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_makefile_dependency_line() {
        let deps = parse_makefile_deps("main.o: main.c main.h util.h\n");
        let names: Vec<String> = deps.iter().map(|p| p.to_string_lossy().into_owned()).collect();
        assert_eq!(names, vec!["main.c", "main.h", "util.h"]);
    }

    #[test]
    fn parses_line_continuations_and_escaped_spaces() {
        let deps = parse_makefile_deps("main.o: main.c \\\n  path\\ with\\ space.h\n");
        let names: Vec<String> = deps.iter().map(|p| p.to_string_lossy().into_owned()).collect();
        assert_eq!(names, vec!["main.c", "path with space.h"]);
    }
}
