//! Build Driver (spec section 4.5).
//!
//! Drives the eight-step algorithm for a selected set of configs: merge
//! defaults, resolve paths, expand sources, decide skip-vs-rebuild,
//! compile, link, optionally record compilation-database entries, and
//! rewrite the build-info file once every selected config has succeeded.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use libloading::Symbol;
use rayon::prelude::*;

use crate::backend::CompilerBackend;
use crate::buildinfo::{BuildInfo, ConfigRecord, TrackedFile as StoredTrackedFile};
use crate::compiledb::{CompilationDatabase, CompilationDatabaseEntry};
use crate::config::{BinaryType, BuildConfig, ConfigGraph};
use crate::context::Context;
use crate::error::{CrucibleError, Result};
use crate::module_host::HookFn;
use crate::{paths, scanner};

/// Outcome of driving one config: whether a rebuild happened, and the
/// tracked-file set to persist in the new build-info (recomputed on a
/// rebuild; carried over unchanged on a skip).
pub struct ConfigOutcome {
    pub config: BuildConfig,
    pub config_hash: u32,
    pub tracked_files: Vec<StoredTrackedFile>,
    pub skipped: bool,
}

/// Step 0, ahead of the eight-step algorithm proper: picks which configs
/// this run builds (spec section 4.5: "the closure of the named config,
/// or the sole config if only one exists") and returns them in dependency
/// order paired with their structural hash, ready for [`build_selection`].
///
/// Builds the full [`ConfigGraph`] over every top-level config first so
/// `ConfigError::DuplicateName` (spec section 4.1) is caught regardless of
/// which one was selected, then filters the flattened, already-ordered
/// pool down to the selected config's transitive closure.
pub fn select_configs(configs: &[BuildConfig], requested: Option<&str>) -> Result<Vec<(BuildConfig, u32)>> {
    if configs.is_empty() {
        return Err(CrucibleError::Validation(
            "the description's set_builder_options populated zero configs".to_string(),
        ));
    }

    let mut graph = ConfigGraph::new();
    for top in configs {
        graph.add_with_deps(top, configs)?;
    }
    graph.check_unique_names()?;

    let selected_name = match requested {
        Some(name) => name,
        None if configs.len() == 1 => configs[0].name.as_str(),
        None => {
            return Err(CrucibleError::Validation(
                "more than one config is available; pick one with --config=<name>".to_string(),
            ))
        }
    };

    if !configs.iter().any(|c| c.name == selected_name) {
        return Err(CrucibleError::Validation(format!(
            "no config named \"{selected_name}\" exists"
        )));
    }

    let closure = closure_names(selected_name, configs)?;

    Ok(graph
        .flattened()
        .into_iter()
        .filter(|&id| closure.contains(&graph.get(id).name))
        .map(|id| (graph.get(id).clone(), graph.hash_of(id)))
        .collect())
}

/// Transitive set of config names `name` depends on, including itself,
/// walked directly over the raw (pre-graph) config list so selection
/// doesn't need the graph's merge-by-hash bookkeeping.
fn closure_names(name: &str, available: &[BuildConfig]) -> Result<std::collections::HashSet<String>> {
    let mut visited = std::collections::HashSet::new();
    let mut stack = vec![name.to_string()];

    while let Some(current) = stack.pop() {
        if !visited.insert(current.clone()) {
            continue;
        }
        let config = available.iter().find(|c| c.name == current).ok_or_else(|| {
            CrucibleError::Validation(format!(
                "config \"{current}\" depends on a name that doesn't resolve"
            ))
        })?;
        stack.extend(config.depends_on.iter().cloned());
    }

    Ok(visited)
}

fn write_time(path: &Path) -> Option<u64> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
}

/// Step 4: skip iff the binary exists, the stored config hash matches the
/// current one, and every tracked file's write-time is unchanged. Spec
/// section 9 explicitly recommends strengthening the skip check with the
/// config hash in addition to the source's file-time-only heuristic; this
/// is that strengthening.
fn should_skip(
    binary_path: &Path,
    force_rebuild: bool,
    current_hash: u32,
    previous: Option<&ConfigRecord>,
    description_dir: &Path,
) -> bool {
    if force_rebuild || !binary_path.exists() {
        return false;
    }

    let Some(previous) = previous else {
        return false;
    };

    if previous.config_hash != current_hash {
        return false;
    }

    previous.tracked_files.iter().all(|tracked| {
        let absolute = paths::resolve_relative_to(description_dir, &tracked.relative_path.to_string_lossy());
        write_time(&absolute) == Some(tracked.last_write_time)
    })
}

/// Builds a config and all of its TUs, recording one compilation-database
/// entry per TU at its original source-list position (spec section 4.4/5:
/// stable ordering regardless of parallel completion order).
fn build_one_with_db(
    ctx: &Context,
    config: &BuildConfig,
    config_hash: u32,
    previous: Option<&ConfigRecord>,
    record_db: bool,
) -> Result<(ConfigOutcome, CompilationDatabase)> {
    let description_dir = ctx.description_dir();
    let app_dir = paths::app_dir();

    let mut merged = config.clone();
    merged.add_builtin_defaults(&app_dir);

    let archetype = ctx.backend.archetype_for(merged.binary_type);
    let binary_path = paths::resolve_relative_to(
        &description_dir,
        &merged.binary_path(archetype.binary_extension).to_string_lossy(),
    );

    let mut db = CompilationDatabase::new();

    if should_skip(&binary_path, ctx.force_rebuild, config_hash, previous, &description_dir) {
        log::info!("Skipped \"{}\" (up to date)", merged.name);
        return Ok((
            ConfigOutcome {
                config_hash,
                tracked_files: previous.map(|p| p.tracked_files.clone()).unwrap_or_default(),
                config: merged,
                skipped: true,
            },
            db,
        ));
    }

    let sources = scanner::all_source_files(&merged, &description_dir);
    if sources.is_empty() {
        return Err(CrucibleError::Validation(format!(
            "config \"{}\" has no source files after expansion",
            merged.name
        )));
    }

    if let Some(parent) = binary_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CrucibleError::io(parent, e))?;
    }

    log::info!("Building \"{}\"", merged.name);
    if is_mixed_language_static_library(&merged, &description_dir) {
        log::debug!(
            "\"{}\" mixes C and C++ sources; each TU compiles with its own inferred standard",
            merged.name
        );
    }

    let object_dir = binary_path.parent().unwrap_or(&description_dir).to_path_buf();

    let indexed_results: Vec<Result<(PathBuf, crate::backend::CompileResult)>> = sources
        .par_iter()
        .map(|source| {
            let object_out = crate::backend::object_path_for(
                &object_dir,
                source,
                &description_dir,
                archetype.object_extension,
            );
            let result = ctx.backend.compile_one(&merged, source, &object_out, &description_dir)?;
            Ok((source.clone(), result))
        })
        .collect();

    let mut objects = Vec::with_capacity(indexed_results.len());
    let mut dependency_files = Vec::new();

    for (index, result) in indexed_results.into_iter().enumerate() {
        let (source, compile_result) = result?;
        objects.push(compile_result.object_path.clone());
        if let Some(dep_file) = &compile_result.dependency_file {
            dependency_files.push(dep_file.clone());
        }
        if record_db {
            db.set(
                index,
                CompilationDatabaseEntry {
                    directory: description_dir.clone(),
                    file: source,
                    arguments: {
                        let mut argv = vec![ctx.backend.compiler_path().to_string()];
                        argv.extend(compile_result.argv.clone());
                        argv
                    },
                    output: compile_result.object_path,
                },
            );
        }
    }

    ctx.backend
        .link_intermediates(&merged, &objects, &binary_path, &description_dir)?;

    let mut tracked: Vec<StoredTrackedFile> = scanner::scan(&merged, &description_dir, ctx.verbose)
        .into_iter()
        .map(|t| StoredTrackedFile {
            relative_path: paths::make_relative(&description_dir, &t.0),
            last_write_time: write_time(&t.0).unwrap_or(0),
        })
        .collect();

    for dep_file in &dependency_files {
        if let Ok(extra) = ctx.backend.collect_include_dependencies(dep_file) {
            for path in extra {
                let absolute = if path.is_absolute() { path } else { description_dir.join(&path) };
                tracked.push(StoredTrackedFile {
                    relative_path: paths::make_relative(&description_dir, &absolute),
                    last_write_time: write_time(&absolute).unwrap_or(0),
                });
            }
        }
    }
    tracked.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    tracked.dedup_by(|a, b| a.relative_path == b.relative_path);

    Ok((
        ConfigOutcome { config: merged, config_hash, tracked_files: tracked, skipped: false },
        db,
    ))
}

/// Runs the driver over `selection` (already flattened: dependencies
/// before dependents, per spec section 4.1's pre-order), invoking
/// `on_pre_build`/`on_post_build` once each around the whole run, and
/// rewriting the build-info file only if every selected config succeeds.
#[allow(clippy::too_many_arguments)]
pub fn build_selection(
    ctx: &Context,
    selection: &[(BuildConfig, u32)],
    previous: &BuildInfo,
    build_source_file: &Path,
    dll_path: &Path,
    build_info_path: &Path,
    record_compilation_database: bool,
    pre_build_hook: Option<Symbol<'_, HookFn>>,
    post_build_hook: Option<Symbol<'_, HookFn>>,
) -> Result<()> {
    if let Some(hook) = &pre_build_hook {
        // SAFETY: resolved from a loaded description module per spec
        // section 4.6; the module guarantees a no-argument, no-return C
        // function behind this symbol.
        unsafe { hook() };
    }

    let mut outcomes = Vec::with_capacity(selection.len());
    let mut compiledb = CompilationDatabase::new();

    for (config, hash) in selection {
        let previous_record = previous.configs.iter().find(|r| r.config.name == config.name);
        let (outcome, db) = build_one_with_db(ctx, config, *hash, previous_record, record_compilation_database)?;
        compiledb.extend(db);
        outcomes.push(outcome);
    }

    if let Some(hook) = &post_build_hook {
        // SAFETY: see above.
        unsafe { hook() };
    }

    if record_compilation_database {
        let path = ctx.description_dir().join("compile_commands.json");
        compiledb.write(&path)?;
    }

    let description_dir = ctx.description_dir();
    let new_info = BuildInfo {
        build_source_file: paths::make_relative(&description_dir, build_source_file),
        dll_path: paths::make_relative(&description_dir, dll_path),
        configs: outcomes
            .into_iter()
            .map(|o| ConfigRecord {
                name_hash: crate::buildinfo::compute_name_hash(&o.config.name),
                config_hash: o.config_hash,
                config: o.config,
                tracked_files: o.tracked_files,
            })
            .collect(),
    };
    new_info.write(build_info_path)
}

/// True when `config`'s sources mix `.c` and other-extension (C++) TUs,
/// the static-library invariant in spec section 3 that drives per-TU
/// language inference rather than a single config-wide standard.
pub fn is_mixed_language_static_library(config: &BuildConfig, description_dir: &Path) -> bool {
    if config.binary_type != BinaryType::StaticLibrary {
        return false;
    }
    let sources = scanner::all_source_files(config, description_dir);
    let mut saw_c = false;
    let mut saw_cpp = false;
    for source in &sources {
        match source.extension().and_then(|e| e.to_str()) {
            Some("c") => saw_c = true,
            Some("cpp") | Some("cc") | Some("cxx") => saw_cpp = true,
            _ => {}
        }
    }
    saw_c && saw_cpp
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config(name: &str, deps: &[&str]) -> BuildConfig {
        BuildConfig {
            name: name.to_string(),
            depends_on: deps.iter().map(|s| s.to_string()).collect(),
            source_files: vec![format!("{name}.c")],
            ..Default::default()
        }
    }

    #[test]
    fn single_config_needs_no_flag() {
        let selection = select_configs(&[config("only", &[])], None).unwrap();
        assert_eq!(selection.len(), 1);
        assert_eq!(selection[0].0.name, "only");
    }

    #[test]
    fn ambiguous_selection_without_flag_is_an_error() {
        let configs = [config("debug", &[]), config("release", &[])];
        assert!(select_configs(&configs, None).is_err());
    }

    #[test]
    fn selection_includes_transitive_dependency_closure_only() {
        let configs = [config("library", &[]), config("program", &["library"]), config("unrelated", &[])];
        let selection = select_configs(&configs, Some("program")).unwrap();
        let names: Vec<&str> = selection.iter().map(|(c, _)| c.name.as_str()).collect();
        assert_eq!(names, vec!["library", "program"]);
    }

    #[test]
    fn unknown_config_name_is_an_error() {
        let configs = [config("debug", &[])];
        assert!(select_configs(&configs, Some("missing")).is_err());
    }

    #[test]
    fn skip_requires_matching_hash_and_binary_present() {
        let record = ConfigRecord {
            config: BuildConfig { name: "a".into(), ..Default::default() },
            name_hash: 0,
            config_hash: 0,
            tracked_files: vec![],
        };

        let dir = tempfile::tempdir().unwrap();
        let binary = dir.path().join("out");
        std::fs::write(&binary, b"x").unwrap();

        assert!(!should_skip(&binary, false, 42, Some(&record), dir.path()));
        assert!(should_skip(&binary, false, 0, Some(&record), dir.path()));
        assert!(!should_skip(&binary, true, 0, Some(&record), dir.path()));
        assert!(!should_skip(&PathBuf::from("/nonexistent"), false, 0, Some(&record), dir.path()));
    }

    #[test]
    fn skip_fails_when_tracked_file_timestamp_changed() {
        let dir = tempfile::tempdir().unwrap();
        let tracked_path = dir.path().join("main.c");
        std::fs::write(&tracked_path, b"int main(){return 0;}").unwrap();
        let stale_time = write_time(&tracked_path).unwrap() + 1;

        let record = ConfigRecord {
            config: BuildConfig { name: "a".into(), ..Default::default() },
            name_hash: 0,
            config_hash: 7,
            tracked_files: vec![StoredTrackedFile {
                relative_path: PathBuf::from("main.c"),
                last_write_time: stale_time,
            }],
        };

        let binary = dir.path().join("out");
        std::fs::write(&binary, b"x").unwrap();

        assert!(!should_skip(&binary, false, 7, Some(&record), dir.path()));
    }
}
