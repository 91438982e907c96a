//! Entry point (spec section 6's CLI surface, section 4.5's eight-step
//! build driver, section 4.6's two-phase bootstrap, section 4.7's Visual
//! Studio path). Ties together every component the rest of the crate
//! exposes; deliberately thin, in the teacher's own `main.rs` style
//! (`examples/clstatham-jfb/src/main.rs`: parse, init logging, dispatch).

use std::path::Path;
use std::process::ExitCode;

use buildinfo::{BuildInfo, ConfigRecord};
use config::{BuildConfig, BuilderOptions};
use context::Context;
use error::{CrucibleError, Result};

pub mod abi;
pub mod backend;
pub mod bootstrap;
pub mod buildinfo;
pub mod cli;
pub mod compiledb;
pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod guid;
pub mod log;
pub mod module_host;
pub mod paths;
pub mod process;
pub mod scanner;
pub mod vstudio;

fn main() -> ExitCode {
    let args = match cli::Args::parse_and_validate() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(exit_byte(e.exit_code()));
        }
    };

    if let Err(e) = self::log::init(args.verbose) {
        eprintln!("failed to initialise logging: {e}");
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ::log::error!("{e}");
            ExitCode::from(exit_byte(e.exit_code()))
        }
    }
}

/// Process exit codes are a single byte on every platform this crate
/// targets; a compiler's own exit code (spec section 7) is passed through
/// verbatim modulo that truncation, same as a shell would do with `$?`.
fn exit_byte(code: i32) -> u8 {
    code.rem_euclid(256) as u8
}

fn run(args: &cli::Args) -> Result<()> {
    if let Some(folder) = &args.nuke {
        paths::nuke_folder_contents(folder).map_err(|e| CrucibleError::io(folder, e))?;
        return Ok(());
    }

    // `cli::Args::parse_and_validate` already rejected a missing input
    // file unless `--nuke` stood alone, so this is always populated here.
    let input_file = args
        .input_file
        .as_ref()
        .expect("cli::Args::parse_and_validate requires an input file without --nuke");

    let kind = bootstrap::classify_input(input_file)?;
    let loaded = match kind {
        bootstrap::InputKind::FromSource => bootstrap::from_source(input_file, args.verbose)?,
        bootstrap::InputKind::FromBuildInfo => bootstrap::from_build_info(input_file, args.verbose)?,
    };

    let bootstrap::Bootstrap { options, module, dll_path, build_source_file, cache_dir } = loaded;

    let stem = build_source_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "build".to_string());
    let build_info_path = cache_dir.join(format!("{stem}.build_info"));

    // Pure Visual Studio generation never reaches the real build (spec
    // section 4.7's `vstudio` module doc comment): the generator runs,
    // a merged build-info is written alongside the solution so the IDE's
    // per-project invocations recognise the `.build_info`-driven path,
    // and `main` returns without compiling anything.
    if options.generate_solution {
        return generate_solution(args, &options, &build_source_file, &dll_path);
    }

    let backend = backend::select(&options);
    let ctx = Context {
        verbose: args.verbose,
        force_rebuild: options.force_rebuild,
        input_file: build_source_file.clone(),
        visual_studio_build: args.visual_studio_build,
        backend,
    };

    let previous = load_previous_build_info(&build_info_path, &build_source_file, &dll_path)?;

    let selection = driver::select_configs(&options.configs, args.config.as_deref())?;

    let pre_build_hook = module.hook_symbol("on_pre_build");
    let post_build_hook = module.hook_symbol("on_post_build");

    driver::build_selection(
        &ctx,
        &selection,
        &previous,
        &build_source_file,
        &dll_path,
        &build_info_path,
        options.generate_compilation_database,
        pre_build_hook,
        post_build_hook,
    )
}

/// Loads the cache from the previous run, or an empty one on a first run
/// (spec section 4.3: the store is re-hydrated at the start of every run,
/// but there may not be one yet).
fn load_previous_build_info(
    build_info_path: &Path,
    build_source_file: &Path,
    dll_path: &Path,
) -> Result<BuildInfo> {
    if !build_info_path.exists() {
        return Ok(BuildInfo {
            build_source_file: build_source_file.to_path_buf(),
            dll_path: dll_path.to_path_buf(),
            configs: Vec::new(),
        });
    }

    let info = BuildInfo::read(build_info_path)?;
    info.resolve_dependencies()?;
    Ok(info)
}

/// Runs the Visual Studio generator and writes the merged build-info file
/// the spec's section 4.7 describes ("the generator writes a build-info
/// file alongside the solution with the merged set of BuildConfigs").
fn generate_solution(
    args: &cli::Args,
    options: &BuilderOptions,
    build_source_file: &Path,
    dll_path: &Path,
) -> Result<()> {
    let backend = backend::select(options);
    let ctx = Context {
        verbose: args.verbose,
        force_rebuild: options.force_rebuild,
        input_file: build_source_file.to_path_buf(),
        visual_studio_build: args.visual_studio_build,
        backend,
    };

    vstudio::generate(&ctx, options)?;
    write_vs_build_info(&ctx, options, build_source_file, dll_path)
}

fn write_vs_build_info(
    ctx: &Context,
    options: &BuilderOptions,
    build_source_file: &Path,
    dll_path: &Path,
) -> Result<()> {
    let solution = options
        .solution
        .as_ref()
        .expect("vstudio::generate already validated a solution is present");

    let description_dir = ctx.description_dir();
    let app_dir = paths::app_dir();
    let vs_dir = if solution.path.is_empty() {
        description_dir.clone()
    } else {
        paths::resolve_relative_to(&description_dir, &solution.path)
    };

    let mut merged: Vec<BuildConfig> = Vec::new();
    for project in &solution.projects {
        for vs_config in &project.configs {
            let mut config = vs_config.options.clone();
            config.add_builtin_defaults(&app_dir);
            if !merged.iter().any(|c| c.name == config.name) {
                merged.push(config);
            }
        }
    }

    let records: Vec<ConfigRecord> = merged
        .iter()
        .map(|config| {
            let resolve = |name: &str| merged.iter().find(|c| c.name == name).cloned();
            let config_hash = config::config_hash(config, &resolve);
            ConfigRecord {
                name_hash: buildinfo::compute_name_hash(&config.name),
                config_hash,
                config: config.clone(),
                tracked_files: Vec::new(),
            }
        })
        .collect();

    let info = BuildInfo {
        build_source_file: paths::make_relative(&vs_dir, build_source_file),
        dll_path: paths::make_relative(&vs_dir, dll_path),
        configs: records,
    };

    let stem = build_source_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| solution.name.clone());
    info.write(&vs_dir.join(format!("{stem}.build_info")))
}
