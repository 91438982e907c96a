//! Include Scanner (spec section 4.2).
//!
//! Ground truth: `original_source/src/builder.cpp::GetAllIncludedFiles`
//! (lines 751-891) and `BuildConfig_GetAllSourceFiles`. The scanner does
//! not parse conditionals; it tracks every `#include` lexically visible,
//! which is a deliberate over-approximation (spec section 8, law 5:
//! "Scanner safety" - extra tracked files only cause extra rebuilds, never
//! missed ones).

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::config::BuildConfig;
use crate::paths;

/// Expands a single source specification (a literal file, or a directory
/// with a trailing wildcard component) into concrete files, relative to
/// `description_dir`.
pub fn expand_source_spec(description_dir: &Path, spec: &str) -> Vec<PathBuf> {
    let full_pattern = paths::resolve_relative_to(description_dir, spec);

    if !spec.contains('*') {
        return vec![full_pattern];
    }

    let pattern_str = full_pattern.to_string_lossy().into_owned();
    match glob::glob(&pattern_str) {
        Ok(paths) => paths.filter_map(std::result::Result::ok).collect(),
        Err(_) => Vec::new(),
    }
}

/// `BuildConfig_GetAllSourceFiles`: the concrete file list for every
/// source specification in `config`.
pub fn all_source_files(config: &BuildConfig, description_dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for spec in &config.source_files {
        files.extend(expand_source_spec(description_dir, spec));
    }
    files
}

/// One tracked include, resolved to an absolute path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TrackedFile(pub PathBuf);

/// Unescapes backslash-escaped spaces in an include target, as the
/// original scanner does when pulling a filename out of `"..."`/`<...>`.
fn unescape_spaces(s: &str) -> String {
    s.replace("\\ ", " ")
}

/// Scans `config`'s transitive source set for `#include` directives,
/// producing the over-approximated tracked-file set (spec section 4.2).
/// Unreadable files are logged (verbose only) and skipped - the compiler
/// will report the real error later.
pub fn scan(config: &BuildConfig, description_dir: &Path, verbose: bool) -> BTreeSet<TrackedFile> {
    let mut worklist: Vec<PathBuf> = all_source_files(config, description_dir);
    let mut seen: BTreeSet<PathBuf> = worklist.iter().cloned().collect();
    let mut tracked = BTreeSet::new();

    let mut index = 0;
    while index < worklist.len() {
        let file = worklist[index].clone();
        index += 1;

        let Ok(contents) = std::fs::read_to_string(&file) else {
            if verbose {
                log::warn!(
                    "couldn't read \"{}\" - can't resolve includes for this file",
                    file.display()
                );
            }
            continue;
        };

        tracked.insert(TrackedFile(file.clone()));

        let file_dir = file.parent().map(Path::to_path_buf).unwrap_or_default();

        for include in find_includes(&contents) {
            let resolved = match include {
                Include::Quoted(target) => {
                    let joined = file_dir.join(unescape_spaces(&target));
                    Some(paths::canonicalise(&joined))
                }
                Include::Angled(target) => {
                    resolve_angle_include(&unescape_spaces(&target), config, description_dir)
                }
            };

            let Some(resolved) = resolved else {
                continue;
            };

            if seen.insert(resolved.clone()) {
                worklist.push(resolved);
            }
        }
    }

    tracked
}

enum Include {
    Quoted(String),
    Angled(String),
}

/// Lexically scans `contents` for `#include` directives, skipping `//`
/// line comments before the directive, tolerating CRLF and arbitrary
/// leading whitespace.
fn find_includes(contents: &str) -> Vec<Include> {
    let mut includes = Vec::new();

    for raw_line in contents.lines() {
        let line = raw_line.trim_start();

        // A leading line comment means this isn't a directive at all, as
        // the original scanner treats it, so `// #include "foo.h"` isn't
        // tracked.
        if line.starts_with("//") {
            continue;
        }

        let Some(rest) = line.strip_prefix("#include") else {
            continue;
        };
        let rest = rest.trim_start();

        if let Some(rest) = rest.strip_prefix('"') {
            if let Some(end) = rest.find('"') {
                includes.push(Include::Quoted(rest[..end].to_string()));
            }
        } else if let Some(rest) = rest.strip_prefix('<') {
            if let Some(end) = rest.find('>') {
                includes.push(Include::Angled(rest[..end].to_string()));
            }
        }
    }

    includes
}

/// Angle-bracket resolution: search each `additional_includes` entry in
/// order, first hit wins. A miss is not tracked (logged verbose-only by
/// the caller's caller via the `None` return).
fn resolve_angle_include(
    target: &str,
    config: &BuildConfig,
    description_dir: &Path,
) -> Option<PathBuf> {
    for include_dir in &config.additional_includes {
        let dir = paths::resolve_relative_to(description_dir, include_dir);
        let candidate = dir.join(target);
        if candidate.is_file() {
            return Some(paths::canonicalise(&candidate));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn tracks_quoted_includes_transitively() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "main.c", "#include \"a.h\"\nint main(){return 0;}\n");
        write_file(dir.path(), "a.h", "#include \"b.h\"\n");
        write_file(dir.path(), "b.h", "// nothing here\n");

        let config = BuildConfig {
            source_files: vec!["main.c".to_string()],
            ..Default::default()
        };

        let tracked = scan(&config, dir.path(), false);
        let names: BTreeSet<String> = tracked
            .iter()
            .map(|t| t.0.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert!(names.contains("main.c"));
        assert!(names.contains("a.h"));
        assert!(names.contains("b.h"));
    }

    #[test]
    fn skips_commented_out_includes() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "main.c",
            "// #include \"present.h\"\nint main(){return 0;}\n",
        );
        write_file(dir.path(), "present.h", "\n");

        let config = BuildConfig {
            source_files: vec!["main.c".to_string()],
            ..Default::default()
        };

        let tracked = scan(&config, dir.path(), false);
        assert_eq!(tracked.len(), 1); // only main.c itself, present.h is commented out
    }

    #[test]
    fn angle_include_searches_additional_include_dirs_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "main.c", "#include <lib.h>\n");
        write_file(dir.path(), "first/lib.h", "// first wins\n");
        write_file(dir.path(), "second/lib.h", "// should not be picked\n");

        let config = BuildConfig {
            source_files: vec!["main.c".to_string()],
            additional_includes: vec!["first".to_string(), "second".to_string()],
            ..Default::default()
        };

        let tracked = scan(&config, dir.path(), false);
        let found_first = tracked
            .iter()
            .any(|t| t.0.ends_with("first/lib.h") || t.0.to_string_lossy().contains("first"));
        assert!(found_first);
    }

    #[test]
    fn unresolvable_angle_include_is_not_tracked() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "main.c", "#include <nonexistent.h>\n");

        let config = BuildConfig {
            source_files: vec!["main.c".to_string()],
            ..Default::default()
        };

        let tracked = scan(&config, dir.path(), false);
        assert_eq!(tracked.len(), 1);
    }
}
