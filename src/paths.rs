//! Platform Services: path algebra (spec section 2, component 1).
//!
//! Canonicalisation and relative-path computation the rest of the engine
//! treats as an external collaborator contract; kept thin and built on
//! `std::path` plus `path-clean`-style normalisation done by hand, since the
//! only operations actually needed are "make absolute" and "make relative
//! to a root", both of which `std::path::Path` already covers without
//! pulling in a platform abstraction crate the pack doesn't reach for
//! anywhere outside of AerynOS's workspace-wide `path-clean` dependency.

use std::path::{Path, PathBuf};

/// Resolves `path` to an absolute path rooted at `base` if it is relative.
pub fn resolve_relative_to(base: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

/// Best-effort canonicalisation: falls back to the joined-but-uncanonical
/// path if the target doesn't exist yet (e.g. an object file about to be
/// written), matching the scanner's need to compare include targets even
/// when an intervening path component hasn't been created.
pub fn canonicalise(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| normalise(path))
}

/// Lexical `..`/`.` normalisation without touching the filesystem.
pub fn normalise(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            std::path::Component::CurDir => {}
            other => out.push(other),
        }
    }
    out
}

/// Makes `path` relative to `base`, used when writing tracked-file paths
/// into the build-info cache (spec section 4.3: "tracked paths are
/// relative to the description's directory so the file is portable").
pub fn make_relative(base: &Path, path: &Path) -> PathBuf {
    let base = normalise(base);
    let path = normalise(path);

    let mut base_iter = base.components();
    let mut path_iter = path.components();

    loop {
        match (base_iter.clone().next(), path_iter.clone().next()) {
            (Some(b), Some(p)) if b == p => {
                base_iter.next();
                path_iter.next();
            }
            _ => break,
        }
    }

    let mut result = PathBuf::new();
    for _ in base_iter {
        result.push("..");
    }
    for component in path_iter {
        result.push(component);
    }

    if result.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        result
    }
}

/// The directory containing the orchestrator's own executable, used so
/// `#include <builder.h>` resolves without user intervention (spec section
/// 4.1, "Defaults").
pub fn app_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Platform C-runtime libraries injected to keep the description module
/// binary-compatible with the orchestrator's own build (spec section 4.1).
pub fn platform_crt_libs() -> &'static [&'static str] {
    if cfg!(target_os = "windows") {
        &["msvcrt"]
    } else if cfg!(target_os = "macos") {
        &["System"]
    } else {
        &["c", "m", "pthread", "dl"]
    }
}

/// The shared-library extension for the host platform, used both for the
/// description-module DLL and for `BinaryType::DynamicLibrary` targets.
pub fn dynamic_library_extension() -> &'static str {
    if cfg!(target_os = "windows") {
        "dll"
    } else if cfg!(target_os = "macos") {
        "dylib"
    } else {
        "so"
    }
}

pub fn executable_extension() -> &'static str {
    if cfg!(target_os = "windows") { "exe" } else { "" }
}

pub fn static_library_extension() -> &'static str {
    if cfg!(target_os = "windows") { "lib" } else { "a" }
}

/// Recursively deletes the *contents* of `folder` (used by `--nuke`); the
/// folder itself is left in place, matching the original's `NukeFolder`.
pub fn nuke_folder_contents(folder: &Path) -> std::io::Result<()> {
    if !folder.exists() {
        return Ok(());
    }

    for entry in std::fs::read_dir(folder)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            std::fs::remove_dir_all(&path)?;
        } else {
            std::fs::remove_file(&path)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_relative_strips_common_prefix() {
        let base = Path::new("/home/user/project");
        let path = Path::new("/home/user/project/src/main.c");
        assert_eq!(make_relative(base, path), PathBuf::from("src/main.c"));
    }

    #[test]
    fn make_relative_climbs_out_when_needed() {
        let base = Path::new("/home/user/project/build");
        let path = Path::new("/home/user/project/src/main.c");
        assert_eq!(make_relative(base, path), PathBuf::from("../src/main.c"));
    }

    #[test]
    fn normalise_collapses_parent_dirs() {
        let p = Path::new("a/b/../c/./d");
        assert_eq!(normalise(p), PathBuf::from("a/c/d"));
    }
}
