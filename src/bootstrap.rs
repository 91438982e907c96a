//! Bootstrap (spec section 4.6): the two-phase startup that turns the
//! user's input file into a loaded description module plus the
//! `BuilderOptions` it populated.
//!
//! Ground truth: `original_source/src/builder.cpp::main` (lines
//! 2020-2560). Extension-based dispatch (`.c`/`.cpp` -> from-source run,
//! `.build_info` -> cached-module run), `.builder/` cache folder, the
//! `BUILDER_DOING_USER_CONFIG_BUILD` marker define.

use std::path::{Path, PathBuf};

use crate::abi::CBuilderOptions;
use crate::backend::{ClangBackend, CompilerBackend};
use crate::buildinfo::BuildInfo;
use crate::config::{BinaryType, BuildConfig, BuilderOptions, LanguageVersion, OptimizationLevel};
use crate::error::{CrucibleError, Result};
use crate::module_host::{DescriptionModule, SetBuilderOptionsFn};
use crate::paths;

pub const CACHE_DIR_NAME: &str = ".builder";
const USER_CONFIG_BUILD_DEFINE: &str = "BUILDER_DOING_USER_CONFIG_BUILD";
const BUILDER_HEADER: &str = include_str!("../include/builder.h");

/// Which of the two bootstrap paths an input file takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// `.c`/`.cpp`/`.cc`/`.cxx`: compile the description module fresh (or
    /// reuse it if the cached module is newer than the source).
    FromSource,
    /// `.build_info`: load the cached module directly and read configs
    /// from the persisted cache, used by the Visual Studio path so the
    /// IDE doesn't have to recompile the description on every invocation.
    FromBuildInfo,
}

pub fn classify_input(path: &Path) -> Result<InputKind> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("c" | "cpp" | "cc" | "cxx") => Ok(InputKind::FromSource),
        Some("build_info") => Ok(InputKind::FromBuildInfo),
        _ => Err(CrucibleError::Usage(format!(
            "unrecognised input \"{}\": expected a .c, .cpp or .build_info file",
            path.display()
        ))),
    }
}

/// Everything bootstrap hands back to `main` once the description module
/// has loaded and (if mandatory) called `set_builder_options`.
pub struct Bootstrap {
    pub options: BuilderOptions,
    /// Kept alive for the remainder of the run: dropping it unloads the
    /// module (spec section 5, scoped acquisition).
    pub module: DescriptionModule,
    pub dll_path: PathBuf,
    pub build_source_file: PathBuf,
    pub cache_dir: PathBuf,
}

/// Materialises the embedded `builder.h` next to the orchestrator's own
/// executable so `#include <builder.h>` resolves without user
/// intervention (spec section 4.1's "Defaults": the app directory is
/// injected as an include path for every config, including the
/// description module's own synthesised one). Self-healing rather than a
/// separate install step, since this port ships the header embedded in
/// the binary.
fn materialise_shared_header() -> Result<()> {
    let app_dir = paths::app_dir();
    let dest = app_dir.join("builder.h");

    let up_to_date = std::fs::read_to_string(&dest)
        .map(|existing| existing == BUILDER_HEADER)
        .unwrap_or(false);
    if up_to_date {
        return Ok(());
    }

    std::fs::create_dir_all(&app_dir).map_err(|e| CrucibleError::io(&app_dir, e))?;
    std::fs::write(&dest, BUILDER_HEADER).map_err(|e| CrucibleError::io(&dest, e))
}

/// Synthesises the internal config that builds the user's description
/// file into a dynamically loadable module (spec section 4.6): sole
/// source the input file, kind `DynamicLibrary`, binary folder the hidden
/// `.builder/` cache dir, optimisation/debug matching the orchestrator's
/// own build for ABI compatibility across the module boundary.
fn synthesize_description_config(input_file: &Path, cache_dir: &Path) -> BuildConfig {
    let description_dir = input_file.parent().unwrap_or_else(|| Path::new("."));
    let stem = input_file.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "build".to_string());
    let relative_source = paths::make_relative(description_dir, input_file);

    BuildConfig {
        name: format!("{stem}_description"),
        source_files: vec![relative_source.to_string_lossy().into_owned()],
        defines: vec![USER_CONFIG_BUILD_DEFINE.to_string()],
        binary_name: stem,
        binary_folder: paths::make_relative(description_dir, cache_dir).to_string_lossy().into_owned(),
        binary_type: BinaryType::DynamicLibrary,
        // Debug, unoptimised: matches a plain debug build of the
        // orchestrator itself, which is what ABI parity across the
        // module boundary actually requires (spec section 6).
        optimization_level: OptimizationLevel::O0,
        language_version: if matches!(input_file.extension().and_then(|e| e.to_str()), Some("c")) {
            LanguageVersion::C17
        } else {
            LanguageVersion::Cpp17
        },
        ..Default::default()
    }
}

/// The backend bootstrap itself always uses to compile the description
/// module, independent of whatever backend the user's `BuilderOptions`
/// later selects for the real project build (the two phases are allowed
/// to use different toolchains; the source's bundled-Clang-first-run
/// default is the analogue here).
fn bootstrap_backend() -> ClangBackend {
    ClangBackend::new(
        std::env::var("CRUCIBLE_CLANG").unwrap_or_else(|_| "clang".to_string()),
        String::new(),
    )
}

/// Compiles (if needed) and loads the description module, then calls
/// `set_builder_options` unless `options_optional` is set (a pure VS
/// generation run per spec section 4.6 never needs it - but this port
/// always builds it anyway, since there is no separate "skip the callback
/// but still need the configs" path once a `.build_info` already has
/// them cached; see `from_build_info`).
pub fn from_source(input_file: &Path, verbose: bool) -> Result<Bootstrap> {
    materialise_shared_header()?;

    let input_file = input_file
        .canonicalize()
        .map_err(|e| CrucibleError::io(input_file, e))?;
    let description_dir = input_file.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
    let cache_dir = description_dir.join(CACHE_DIR_NAME);
    std::fs::create_dir_all(&cache_dir).map_err(|e| CrucibleError::io(&cache_dir, e))?;

    let backend = bootstrap_backend();
    let mut config = synthesize_description_config(&input_file, &cache_dir);
    config.add_builtin_defaults(&paths::app_dir());

    let archetype = backend.archetype_for(config.binary_type);
    let dll_path = cache_dir.join(format!("{}.{}", config.binary_name, archetype.binary_extension));

    let needs_compile = !dll_path.exists()
        || source_is_newer(&input_file, &dll_path);

    if needs_compile {
        if verbose {
            log::debug!("Compiling description module from \"{}\"", input_file.display());
        }
        let object_path = crate::backend::object_path_for(&cache_dir, &input_file, &description_dir, archetype.object_extension);
        backend.compile_one(&config, &input_file, &object_path, &description_dir)?;
        backend.link_intermediates(&config, &[object_path], &dll_path, &description_dir)?;
    } else if verbose {
        log::debug!("Reusing cached description module \"{}\"", dll_path.display());
    }

    let module = DescriptionModule::load(&dll_path)?;
    let options = call_set_builder_options(&module)?;

    Ok(Bootstrap { options, module, dll_path, build_source_file: input_file, cache_dir })
}

/// Loads the module referenced by an existing `.build_info` file without
/// recompiling the description source, used by the Visual Studio path
/// (spec section 4.6: "skip the compile step unless the cached module is
/// missing or stale").
pub fn from_build_info(build_info_path: &Path, verbose: bool) -> Result<Bootstrap> {
    materialise_shared_header()?;

    let build_info_path = build_info_path
        .canonicalize()
        .map_err(|e| CrucibleError::io(build_info_path, e))?;
    let description_dir = build_info_path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();

    let previous = BuildInfo::read(&build_info_path)?;
    previous.resolve_dependencies()?;

    let build_source_file = paths::resolve_relative_to(&description_dir, &previous.build_source_file.to_string_lossy());
    let dll_path = paths::resolve_relative_to(&description_dir, &previous.dll_path.to_string_lossy());

    if !dll_path.exists() || source_is_newer(&build_source_file, &dll_path) {
        if verbose {
            log::debug!("Cached module stale or missing; recompiling description");
        }
        return from_source(&build_source_file, verbose);
    }

    let module = DescriptionModule::load(&dll_path)?;
    let options = call_set_builder_options(&module)?;
    let cache_dir = dll_path.parent().unwrap_or(&description_dir).to_path_buf();

    Ok(Bootstrap { options, module, dll_path, build_source_file, cache_dir })
}

fn source_is_newer(source: &Path, artefact: &Path) -> bool {
    let source_time = std::fs::metadata(source).and_then(|m| m.modified()).ok();
    let artefact_time = std::fs::metadata(artefact).and_then(|m| m.modified()).ok();
    match (source_time, artefact_time) {
        (Some(s), Some(a)) => s > a,
        _ => true,
    }
}

/// Calls the mandatory `set_builder_options` symbol with a zeroed
/// `CBuilderOptions`, then converts the populated C struct into the
/// idiomatic [`BuilderOptions`] (spec section 4.6, section 6's "User
/// callback ABI").
fn call_set_builder_options(module: &DescriptionModule) -> Result<BuilderOptions> {
    let symbol = module.set_builder_options_symbol()?;
    let mut raw = CBuilderOptions::default();

    // SAFETY: `raw` is a freshly zeroed, owned, stack-local value; the
    // module's `set_builder_options` is documented (builder.h) to only
    // write into it for the duration of the call, and every pointer it
    // stores (strings, arrays) must remain valid until the host is done
    // reading - guaranteed because the module isn't unloaded until
    // `Bootstrap::module` is dropped at the end of the run.
    let func: SetBuilderOptionsFn = *symbol;
    unsafe { func(&mut raw) };

    // SAFETY: `raw` was just populated by the call above.
    Ok(unsafe { raw.to_builder_options() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_extensions() {
        assert_eq!(classify_input(Path::new("build.cpp")).unwrap(), InputKind::FromSource);
        assert_eq!(classify_input(Path::new("build.c")).unwrap(), InputKind::FromSource);
        assert_eq!(classify_input(Path::new("project.build_info")).unwrap(), InputKind::FromBuildInfo);
        assert!(classify_input(Path::new("project.txt")).is_err());
    }

    #[test]
    fn synthesized_config_carries_the_marker_define() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("build.cpp");
        std::fs::write(&input, "").unwrap();
        let cache_dir = dir.path().join(".builder");

        let config = synthesize_description_config(&input, &cache_dir);
        assert!(config.defines.contains(&USER_CONFIG_BUILD_DEFINE.to_string()));
        assert_eq!(config.binary_type, BinaryType::DynamicLibrary);
        assert_eq!(config.optimization_level, OptimizationLevel::O0);
    }
}
