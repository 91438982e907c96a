//! Visual Studio Generator (spec section 4.7).
//!
//! Ground truth: `original_source/src/visual_studio.cpp`'s
//! `GenerateVisualStudioSolution`, called from a from-source run right
//! after `set_builder_options` returns (`original_source/src/builder.cpp`,
//! the `options.generate_solution` branch). That branch never reaches the
//! real build: it flattens every project's configs into
//! `BuilderOptions::configs` for validation purposes only, runs this
//! generator, and returns. `main.rs` mirrors that early return; no
//! build-info is written on this path; a project's generated `.vcxproj`
//! shells back into the orchestrator binary itself (`NMakeBuildCommandLine`)
//! to do the real work once the user builds it from the IDE.
//!
//! Every on-disk path this module emits uses `/` regardless of host
//! platform - MSBuild accepts it, and it keeps generated files identical
//! whether Crucible itself runs on Linux or Windows (noted in DESIGN.md
//! as a deliberate deviation from the source's native `PATH_SEPARATOR`).

pub mod guid;

use std::path::{Path, PathBuf};

use jwalk::WalkDir;

use crate::config::{BinaryType, BuildConfig, BuilderOptions, VisualStudioProject, VisualStudioSolution};
use crate::context::Context;
use crate::error::{CrucibleError, Result};
use crate::guid::{CPP_PROJECT_TYPE_GUID, SOLUTION_FOLDER_TYPE_GUID};
use crate::paths;

/// Platform names Visual Studio ships built-in defaults for. Anything
/// outside this list still works, just without auto-populated fields like
/// the Windows SDK directories (source's validation warning).
const RECOGNISED_PLATFORM_NAMES: &[&str] = &["Win32", "x64", "linux-x64"];
const SOURCE_EXTENSIONS: &[&str] = &["c", "cpp", "cc", "cxx"];
const HEADER_EXTENSIONS: &[&str] = &["h", "hpp", "inl"];
const STALE_SUFFIXES: &[&str] = &[".sln", ".vcxproj", ".vcxproj.user", ".vcxproj.filters"];

/// Generates the `.sln` plus one `.vcxproj`/`.vcxproj.user`/
/// `.vcxproj.filters` triple per project described by
/// `options.solution`.
pub fn generate(ctx: &Context, options: &BuilderOptions) -> Result<()> {
    let solution = options.solution.as_ref().ok_or_else(|| {
        CrucibleError::Validation(
            "generate_solution was set but set_builder_options never populated a solution".to_string(),
        )
    })?;

    validate(solution)?;

    let description_dir = ctx.description_dir();
    let vs_dir = if solution.path.is_empty() {
        description_dir.clone()
    } else {
        paths::resolve_relative_to(&description_dir, &solution.path)
    };

    std::fs::create_dir_all(&vs_dir).map_err(|e| CrucibleError::io(&vs_dir, e))?;
    clean_stale_artefacts(&vs_dir, ctx.verbose)?;

    let table = guid::assign(&solution.projects);
    let path_from_solution_to_input = to_forward_slashes(&paths::make_relative(&vs_dir, &description_dir));

    for (index, project) in solution.projects.iter().enumerate() {
        log::info!("Generating {} ... ", project.name);

        let files = collect_project_files(&description_dir, project)?;
        let leaf_name = guid::project_leaf_name(&project.name);

        write_vcxproj(
            &vs_dir,
            leaf_name,
            solution,
            project,
            &table.project_guids[index],
            &files,
            &path_from_solution_to_input,
            &description_dir,
            ctx,
        )?;
        write_vcxproj_user(&vs_dir, leaf_name, solution, project, &description_dir)?;
        write_vcxproj_filters(&vs_dir, leaf_name, &files, &path_from_solution_to_input)?;

        log::info!("Done");
    }

    write_solution_file(&vs_dir, solution, &table)?;

    log::info!("");
    Ok(())
}

fn validate(solution: &VisualStudioSolution) -> Result<()> {
    if solution.name.is_empty() {
        return Err(CrucibleError::Validation("you never set the name of the solution".to_string()));
    }
    if solution.platforms.is_empty() {
        return Err(CrucibleError::Validation(
            "you must set at least one platform when generating a Visual Studio solution".to_string(),
        ));
    }
    if solution.projects.is_empty() {
        return Err(CrucibleError::Validation(
            "as well as a solution, you must generate at least one Visual Studio project to go with it".to_string(),
        ));
    }

    if !solution.platforms.iter().any(|p| RECOGNISED_PLATFORM_NAMES.contains(&p.as_str())) {
        log::warn!(
            "none of your platform names ({}) are any of the Visual Studio recognized defaults ({}); \
             the solution will still generate, but fields like the Windows SDK directory won't auto-populate",
            solution.platforms.join(", "),
            RECOGNISED_PLATFORM_NAMES.join(", "),
        );
    }

    for project in &solution.projects {
        if project.name.is_empty() {
            return Err(CrucibleError::Validation(
                "there is a Visual Studio project that doesn't have a name".to_string(),
            ));
        }
        if project.code_folders.is_empty() {
            return Err(CrucibleError::Validation(format!(
                "no code folders were provided for project \"{}\"; you need at least one",
                project.name
            )));
        }

        for config in &project.configs {
            if config.name.is_empty() {
                return Err(CrucibleError::Validation(format!(
                    "there is a config for project \"{}\" that doesn't have a name",
                    project.name
                )));
            }
            if config.options.name.is_empty() {
                return Err(CrucibleError::Validation(format!(
                    "there is a config for project \"{}\" that doesn't have a name set in its BuildConfig",
                    project.name
                )));
            }
            if config.options.binary_type == BinaryType::Executable && config.options.binary_folder.is_empty() {
                return Err(CrucibleError::Validation(format!(
                    "build config \"{}\" is an executable, but project \"{}\", config \"{}\" never specified an \
                     output directory; Visual Studio needs this to know where to run it from when debugging",
                    config.options.name, project.name, config.name
                )));
            }
        }
    }

    Ok(())
}

fn to_forward_slashes(path: &Path) -> String {
    let s = path.to_string_lossy().replace('\\', "/");
    if s.is_empty() {
        ".".to_string()
    } else {
        s
    }
}

fn clean_stale_artefacts(vs_dir: &Path, verbose: bool) -> Result<()> {
    let entries = match std::fs::read_dir(vs_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(CrucibleError::io(vs_dir, e)),
    };

    let mut dot_vs_folder: Option<PathBuf> = None;

    for entry in entries {
        let entry = entry.map_err(|e| CrucibleError::io(vs_dir, e))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();

        if path.is_dir() {
            if name == ".vs" {
                dot_vs_folder = Some(path);
            }
            continue;
        }

        if STALE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
            if verbose {
                log::info!("Deleting file \"{}\"", path.display());
            }
            if let Err(e) = std::fs::remove_file(&path) {
                log::warn!(
                    "failed to delete old Visual Studio file \"{}\" while deleting old Visual Studio files: {e}. \
                     You will have to delete this one yourself.",
                    path.display()
                );
            }
        }
    }

    if let Some(dot_vs) = dot_vs_folder {
        if let Err(e) = std::fs::remove_dir_all(&dot_vs) {
            log::warn!("failed to delete old \".vs\" folder \"{}\": {e}", dot_vs.display());
        }
    }

    Ok(())
}

/// One discovered file, classified and carrying its subfolder path
/// relative to the description directory (used for both `.vcxproj` item
/// grouping and `.vcxproj.filters` filter assignment).
struct ClassifiedFile {
    /// Path from the description directory to the file, `/`-separated.
    path_from_root: String,
    /// Directory portion of `path_from_root`, or empty if the file sits
    /// directly in the description directory.
    folder_in_filter: String,
}

struct ProjectFiles {
    source: Vec<ClassifiedFile>,
    header: Vec<ClassifiedFile>,
    other: Vec<ClassifiedFile>,
    /// Every unique folder path discovered, in first-seen order,
    /// including every parent of a nested path (`a`, `a/b`, `a/b/c`).
    filter_paths: Vec<String>,
}

fn add_unique_path(paths: &mut Vec<String>, path: &str) {
    if !paths.iter().any(|p| p == path) {
        paths.push(path.to_string());
    }
}

/// Walks every `code_folders` entry recursively, keeping files whose
/// extension is in `project.file_extensions` (falling back to
/// [`VisualStudioProject::DEFAULT_EXTENSIONS`] when the user left it
/// empty), and classifies each by extension.
fn collect_project_files(description_dir: &Path, project: &VisualStudioProject) -> Result<ProjectFiles> {
    let owned_defaults;
    let extensions: &[String] = if project.file_extensions.is_empty() {
        owned_defaults = VisualStudioProject::DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect::<Vec<_>>();
        &owned_defaults
    } else {
        project.effective_extensions()
    };

    let mut source = Vec::new();
    let mut header = Vec::new();
    let mut other = Vec::new();
    let mut filter_paths = Vec::new();

    for code_folder in &project.code_folders {
        let search_root = paths::resolve_relative_to(description_dir, code_folder);

        for entry in WalkDir::new(&search_root).into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_dir() {
                continue;
            }

            let path = entry.path();
            let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !extensions.iter().any(|e| e == extension) {
                continue;
            }

            let relative = paths::make_relative(description_dir, &path);
            let path_from_root = to_forward_slashes(&relative);

            let folder_in_filter = relative
                .parent()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .filter(|s| !s.is_empty() && s != ".")
                .unwrap_or_default();

            if !folder_in_filter.is_empty() {
                let mut accumulated = String::new();
                for component in folder_in_filter.split('/') {
                    if !accumulated.is_empty() {
                        accumulated.push('/');
                    }
                    accumulated.push_str(component);
                    add_unique_path(&mut filter_paths, &accumulated);
                }
            }

            let classified = ClassifiedFile { path_from_root, folder_in_filter };

            if SOURCE_EXTENSIONS.contains(&extension) {
                source.push(classified);
            } else if HEADER_EXTENSIONS.contains(&extension) {
                header.push(classified);
            } else {
                other.push(classified);
            }
        }
    }

    Ok(ProjectFiles { source, header, other, filter_paths })
}

fn binary_extension(binary_type: BinaryType) -> &'static str {
    match binary_type {
        BinaryType::Executable => "exe",
        BinaryType::DynamicLibrary => "dll",
        BinaryType::StaticLibrary => "lib",
    }
}

/// `binary_folder/binary_name[.ext]`, relative to the description
/// directory - mirrors the source's `BuildConfig_GetFullBinaryName`.
fn full_binary_name(config: &BuildConfig) -> String {
    let mut name = format!("{}/{}", config.binary_folder, config.binary_name);
    if !config.remove_file_extension {
        name.push('.');
        name.push_str(binary_extension(config.binary_type));
    }
    name
}

fn path_from_solution_to_binary_dir(vs_dir: &Path, description_dir: &Path, config: &BuildConfig) -> String {
    let binary_dir = paths::resolve_relative_to(description_dir, &config.binary_folder);
    to_forward_slashes(&paths::make_relative(vs_dir, &binary_dir))
}

fn path_from_solution_to_binary_file(vs_dir: &Path, description_dir: &Path, config: &BuildConfig) -> String {
    let full = paths::resolve_relative_to(description_dir, &full_binary_name(config));
    to_forward_slashes(&paths::make_relative(vs_dir, &full))
}

fn resolve_search_path(path_from_solution_to_input: &str, entry: &str) -> String {
    if Path::new(entry).is_absolute() {
        entry.to_string()
    } else {
        format!("{path_from_solution_to_input}/{entry}")
    }
}

#[allow(clippy::too_many_arguments)]
fn write_vcxproj(
    vs_dir: &Path,
    leaf_name: &str,
    solution: &VisualStudioSolution,
    project: &VisualStudioProject,
    project_guid: &str,
    files: &ProjectFiles,
    path_from_solution_to_input: &str,
    description_dir: &Path,
    ctx: &Context,
) -> Result<()> {
    let mut out = String::new();

    out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    out.push_str("<Project DefaultTargets=\"Build\" xmlns=\"http://schemas.microsoft.com/developer/msbuild/2003\">\n");

    out.push_str("\t<ItemGroup Label=\"ProjectConfigurations\">\n");
    for config in &project.configs {
        for platform in &solution.platforms {
            out.push_str(&format!("\t\t<ProjectConfiguration Include=\"{}|{}\">\n", config.name, platform));
            out.push_str(&format!("\t\t\t<Configuration>{}</Configuration>\n", config.name));
            out.push_str(&format!("\t\t\t<Platform>{platform}</Platform>\n"));
            out.push_str("\t\t</ProjectConfiguration>\n");
        }
    }
    out.push_str("\t</ItemGroup>\n");

    out.push_str("\t<PropertyGroup Label=\"Globals\">\n");
    out.push_str("\t\t<VCProjectVersion>17.0</VCProjectVersion>\n");
    out.push_str(&format!("\t\t<ProjectGuid>{project_guid}</ProjectGuid>\n"));
    out.push_str("\t\t<IgnoreWarnCompileDuplicatedFilename>true</IgnoreWarnCompileDuplicatedFilename>\n");
    out.push_str("\t\t<Keyword>Win32Proj</Keyword>\n");
    out.push_str("\t</PropertyGroup>\n");

    out.push_str("\t<Import Project=\"$(VCTargetsPath)\\Microsoft.Cpp.Default.props\" Condition=\"'$(OS)' == 'Windows_NT'\" />\n");

    for config in &project.configs {
        let out_dir = path_from_solution_to_binary_dir(vs_dir, description_dir, &config.options);
        for platform in &solution.platforms {
            out.push_str(&format!(
                "\t<PropertyGroup Condition=\"'$(Configuration)|$(Platform)'=='{}|{}'\" Label=\"Configuration\">\n",
                config.name, platform
            ));
            out.push_str("\t\t<ConfigurationType>Makefile</ConfigurationType>\n");
            out.push_str("\t\t<UseDebugLibraries>false</UseDebugLibraries>\n");
            out.push_str("\t\t<PlatformToolset>v143</PlatformToolset>\n");
            out.push_str(&format!("\t\t<OutDir>{out_dir}</OutDir>\n"));
            out.push_str(&format!("\t\t<IntDir>{}/intermediate</IntDir>\n", config.options.binary_folder));
            out.push_str("\t</PropertyGroup>\n");
        }
    }

    out.push_str("\t<Import Project=\"$(VCTargetsPath)\\Microsoft.Cpp.props\" Condition=\"'$(OS)' == 'Windows_NT'\" />\n");

    out.push_str("\t<ImportGroup Label=\"ExtensionSettings\">\n\t</ImportGroup>\n");

    for config in &project.configs {
        for platform in &solution.platforms {
            out.push_str(&format!(
                "\t<ImportGroup Label=\"PropertySheets\" Condition=\"'$(Configuration)|$(Platform)'=='{}|{}'\">\n",
                config.name, platform
            ));
            out.push_str(
                "\t\t<Import Project=\"$(UserRootDir)\\Microsoft.Cpp.$(Platform).user.props\" \
                 Condition=\"exists('$(UserRootDir)\\Microsoft.Cpp.$(Platform).user.props')\" \
                 Label=\"LocalAppDataPlatform\" />\n",
            );
            out.push_str("\t</ImportGroup>\n");
        }
    }

    out.push_str("\t<PropertyGroup Label=\"UserMacros\" />\n");

    let input_file_name = ctx.input_file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let input_file_relative = format!("{path_from_solution_to_input}/{input_file_name}");
    let app_path = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("crucible"));

    for config in &project.configs {
        for platform in &solution.platforms {
            out.push_str(&format!(
                "\t<PropertyGroup Condition=\"'$(Configuration)|$(Platform)'=='{}|{}'\">\n",
                config.name, platform
            ));

            out.push_str("\t\t<ExternalIncludePath>");
            for include in &config.options.additional_includes {
                out.push_str(&resolve_search_path(path_from_solution_to_input, include));
                out.push(';');
            }
            out.push_str("$(ExternalIncludePath)</ExternalIncludePath>\n");

            out.push_str("\t\t<LibraryPath>");
            for lib_path in &config.options.additional_lib_paths {
                out.push_str(&resolve_search_path(path_from_solution_to_input, lib_path));
                out.push(';');
            }
            out.push_str("$(LibraryPath)</LibraryPath>\n");

            out.push_str(&format!("\t\t<NMakeOutput>{}</NMakeOutput>\n", config.options.binary_folder));

            out.push_str(&format!(
                "\t\t<NMakeBuildCommandLine>\"{}\" {} --config={} --visual-studio-build</NMakeBuildCommandLine>\n",
                app_path.display(),
                input_file_relative,
                config.options.name,
            ));
            out.push_str(&format!(
                "\t\t<NMakeReBuildCommandLine>\"{}\" {} --config={} --visual-studio-build</NMakeReBuildCommandLine>\n",
                app_path.display(),
                input_file_relative,
                config.options.name,
            ));
            out.push_str(&format!(
                "\t\t<NMakeCleanCommandLine>\"{}\" --nuke {}</NMakeCleanCommandLine>\n",
                app_path.display(),
                config.options.binary_folder,
            ));

            out.push_str("\t\t<NMakePreprocessorDefinitions>");
            for define in &config.options.defines {
                out.push_str(define);
                out.push(';');
            }
            out.push_str("$(NMakePreprocessorDefinitions)</NMakePreprocessorDefinitions>\n");

            out.push_str("\t</PropertyGroup>\n");
        }
    }

    out.push_str("\t<ItemDefinitionGroup>\n\t</ItemDefinitionGroup>\n");

    write_file_item_group(&mut out, &files.source, "ClCompile", path_from_solution_to_input);
    write_file_item_group(&mut out, &files.header, "ClInclude", path_from_solution_to_input);
    write_file_item_group(&mut out, &files.other, "None", path_from_solution_to_input);

    out.push_str("\t<Import Project=\"$(VCTargetsPath)\\Microsoft.Cpp.targets\" Condition=\"'$(OS)' == 'Windows_NT'\" />\n");
    out.push_str("\t<ImportGroup Label=\"ExtensionTargets\">\n\t</ImportGroup>\n");
    out.push_str("</Project>\n");

    let path = vs_dir.join(format!("{leaf_name}.vcxproj"));
    std::fs::write(&path, out).map_err(|e| CrucibleError::io(&path, e))
}

fn write_file_item_group(out: &mut String, files: &[ClassifiedFile], tag: &str, path_from_solution_to_input: &str) {
    if files.is_empty() {
        return;
    }

    out.push_str("\t<ItemGroup>\n");
    for file in files {
        out.push_str(&format!(
            "\t\t<{tag} Include=\"{path_from_solution_to_input}/{}\" />\n",
            file.path_from_root
        ));
    }
    out.push_str("\t</ItemGroup>\n");
}

fn write_vcxproj_user(
    vs_dir: &Path,
    leaf_name: &str,
    solution: &VisualStudioSolution,
    project: &VisualStudioProject,
    description_dir: &Path,
) -> Result<()> {
    let mut out = String::new();

    out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    out.push_str("<Project ToolsVersion=\"Current\" xmlns=\"http://schemas.microsoft.com/developer/msbuild/2003\">\n");
    out.push_str("\t<PropertyGroup>\n\t\t<ShowAllFiles>false</ShowAllFiles>\n\t</PropertyGroup>\n");

    for config in &project.configs {
        let debugger_command = path_from_solution_to_binary_file(vs_dir, description_dir, &config.options);

        for platform in &solution.platforms {
            out.push_str(&format!(
                "\t<PropertyGroup Condition=\"'$(Configuration)|$(Platform)'=='{}|{}'\">\n",
                config.name, platform
            ));
            out.push_str("\t\t<DebuggerFlavor>WindowsLocalDebugger</DebuggerFlavor>\n");
            out.push_str("\t\t<LocalDebuggerDebuggerType>Auto</LocalDebuggerDebuggerType>\n");
            out.push_str("\t\t<LocalDebuggerAttach>false</LocalDebuggerAttach>\n");
            out.push_str(&format!("\t\t<LocalDebuggerCommand>{debugger_command}</LocalDebuggerCommand>\n"));
            out.push_str("\t\t<LocalDebuggerWorkingDirectory>$(SolutionDir)</LocalDebuggerWorkingDirectory>\n");

            if !config.debugger_arguments.is_empty() {
                out.push_str(&format!(
                    "\t\t<LocalDebuggerCommandArguments>{}</LocalDebuggerCommandArguments>\n",
                    config.debugger_arguments.join(" ")
                ));
            }

            out.push_str("\t</PropertyGroup>\n");
        }
    }

    out.push_str("</Project>\n");

    let path = vs_dir.join(format!("{leaf_name}.vcxproj.user"));
    std::fs::write(&path, out).map_err(|e| CrucibleError::io(&path, e))
}

fn write_vcxproj_filters(
    vs_dir: &Path,
    leaf_name: &str,
    files: &ProjectFiles,
    path_from_solution_to_input: &str,
) -> Result<()> {
    let mut out = String::new();

    out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    out.push_str("<Project ToolsVersion=\"4.0\" xmlns=\"http://schemas.microsoft.com/developer/msbuild/2003\">\n");

    out.push_str("\t<ItemGroup>\n");
    for filter_path in &files.filter_paths {
        out.push_str(&format!("\t\t<Filter Include=\"{filter_path}\">\n"));
        out.push_str(&format!("\t\t\t<UniqueIdentifier>{}</UniqueIdentifier>\n", crate::guid::new_guid()));
        out.push_str("\t\t</Filter>\n");
    }
    out.push_str("\t</ItemGroup>\n");

    write_filtered_file_group(&mut out, &files.source, "ClCompile", path_from_solution_to_input);
    write_filtered_file_group(&mut out, &files.header, "ClInclude", path_from_solution_to_input);
    write_filtered_file_group(&mut out, &files.other, "None", path_from_solution_to_input);

    out.push_str("</Project>\n");

    let path = vs_dir.join(format!("{leaf_name}.vcxproj.filters"));
    std::fs::write(&path, out).map_err(|e| CrucibleError::io(&path, e))
}

fn write_filtered_file_group(out: &mut String, files: &[ClassifiedFile], tag: &str, path_from_solution_to_input: &str) {
    if files.is_empty() {
        return;
    }

    out.push_str("\t<ItemGroup>\n");
    for file in files {
        let include = format!("{path_from_solution_to_input}/{}", file.path_from_root);
        if file.folder_in_filter.is_empty() {
            out.push_str(&format!("\t\t<{tag} Include=\"{include}\" />\n"));
        } else {
            out.push_str(&format!("\t\t<{tag} Include=\"{include}\">\n"));
            out.push_str(&format!("\t\t\t<Filter>{}</Filter>\n", file.folder_in_filter));
            out.push_str(&format!("\t\t</{tag}>\n"));
        }
    }
    out.push_str("\t</ItemGroup>\n");
}

fn write_solution_file(vs_dir: &Path, solution: &VisualStudioSolution, table: &guid::GuidTable) -> Result<()> {
    let mut out = String::new();

    out.push('\n');
    out.push_str("Microsoft Visual Studio Solution File, Format Version 12.00\n");
    out.push_str("# Visual Studio Version 17\n");
    out.push_str("VisualStudioVersion = 17.7.34202.233\n");
    out.push_str("MinimumVisualStudioVersion = 10.0.40219.1\n");

    for (index, project) in solution.projects.iter().enumerate() {
        let leaf_name = guid::project_leaf_name(&project.name);
        out.push_str(&format!(
            "Project(\"{}\") = \"{}\", \"{}.vcxproj\", \"{}\"\nEndProject\n",
            CPP_PROJECT_TYPE_GUID, leaf_name, leaf_name, table.project_guids[index]
        ));
    }

    for folder in &table.folders {
        out.push_str(&format!(
            "Project(\"{}\") = \"{}\", \"{}\", \"{}\"\nEndProject\n",
            SOLUTION_FOLDER_TYPE_GUID, folder.name, folder.name, folder.guid
        ));
    }

    out.push_str("Global\n");

    out.push_str("\tGlobalSection(SolutionConfigurationPlatforms) = preSolution\n");
    for project in &solution.projects {
        for config in &project.configs {
            for platform in &solution.platforms {
                out.push_str(&format!("\t\t{}|{platform} = {}|{platform}\n", config.name, config.name));
            }
        }
    }
    out.push_str("\tEndGlobalSection\n");

    out.push_str("\tGlobalSection(ProjectConfigurationPlatforms) = postSolution\n");
    for (index, project) in solution.projects.iter().enumerate() {
        let project_guid = &table.project_guids[index];
        for config in &project.configs {
            for platform in &solution.platforms {
                out.push_str(&format!(
                    "\t\t{project_guid}.{}|{platform}.ActiveCfg = {}|{platform}\n",
                    config.name, config.name
                ));
                out.push_str(&format!(
                    "\t\t{project_guid}.{}|{platform}.Build.0 = {}|{platform}\n",
                    config.name, config.name
                ));
            }
        }
    }
    out.push_str("\tEndGlobalSection\n");

    out.push_str("\tGlobalSection(SolutionProperties) = preSolution\n");
    out.push_str("\t\tHideSolutionNode = FALSE\n");
    out.push_str("\tEndGlobalSection\n");

    if !table.nesting.is_empty() {
        out.push_str("\tGlobalSection(NestedProjects) = preSolution\n");
        for (child, parent) in &table.nesting {
            out.push_str(&format!("\t\t{child} = {parent}\n"));
        }
        out.push_str("\tEndGlobalSection\n");
    }

    out.push_str("EndGlobal\n");

    let path = vs_dir.join(format!("{}.sln", solution.name));
    std::fs::write(&path, out).map_err(|e| CrucibleError::io(&path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VisualStudioConfig;

    fn solution_with_one_project() -> VisualStudioSolution {
        VisualStudioSolution {
            name: "game".to_string(),
            platforms: vec!["x64".to_string()],
            projects: vec![VisualStudioProject {
                name: "game".to_string(),
                code_folders: vec!["src".to_string()],
                file_extensions: vec![],
                configs: vec![VisualStudioConfig {
                    name: "Debug".to_string(),
                    options: BuildConfig {
                        name: "debug".to_string(),
                        binary_type: BinaryType::Executable,
                        binary_folder: "bin".to_string(),
                        binary_name: "game".to_string(),
                        ..Default::default()
                    },
                    debugger_arguments: vec![],
                }],
            }],
            path: String::new(),
        }
    }

    #[test]
    fn validate_rejects_missing_solution_name() {
        let mut solution = solution_with_one_project();
        solution.name.clear();
        assert!(validate(&solution).is_err());
    }

    #[test]
    fn validate_rejects_no_platforms() {
        let mut solution = solution_with_one_project();
        solution.platforms.clear();
        assert!(validate(&solution).is_err());
    }

    #[test]
    fn validate_rejects_no_projects() {
        let mut solution = solution_with_one_project();
        solution.projects.clear();
        assert!(validate(&solution).is_err());
    }

    #[test]
    fn validate_rejects_executable_config_with_no_binary_folder() {
        let mut solution = solution_with_one_project();
        solution.projects[0].configs[0].options.binary_folder.clear();
        assert!(validate(&solution).is_err());
    }

    #[test]
    fn validate_accepts_empty_file_extensions_as_fallback_to_defaults() {
        // config/mod.rs::VisualStudioProject::effective_extensions() treats
        // an empty list as "use DEFAULT_EXTENSIONS", not as a validation
        // failure - a deliberate divergence from the source, recorded in
        // DESIGN.md.
        let solution = solution_with_one_project();
        assert!(solution.projects[0].file_extensions.is_empty());
        assert!(validate(&solution).is_ok());
    }

    #[test]
    fn unique_path_accumulation_adds_every_parent() {
        let mut paths = Vec::new();
        for component in "a/b/c".split('/') {
            let mut accumulated = String::new();
            if let Some(last) = paths.last() {
                accumulated = format!("{last}/{component}");
            } else {
                accumulated = component.to_string();
            }
            add_unique_path(&mut paths, &accumulated);
        }
        assert_eq!(paths, vec!["a", "a/b", "a/b/c"]);
    }

    #[test]
    fn resolve_search_path_keeps_absolute_paths_untouched() {
        assert_eq!(resolve_search_path("../..", "/abs/include"), "/abs/include");
        assert_eq!(resolve_search_path("../..", "include"), "../../include");
    }

    #[test]
    fn full_binary_name_appends_extension_by_default() {
        let config = BuildConfig {
            binary_folder: "bin".to_string(),
            binary_name: "game".to_string(),
            binary_type: BinaryType::DynamicLibrary,
            ..Default::default()
        };
        assert_eq!(full_binary_name(&config), "bin/game.dll");
    }

    #[test]
    fn full_binary_name_honours_remove_file_extension() {
        let config = BuildConfig {
            binary_folder: "bin".to_string(),
            binary_name: "game".to_string(),
            binary_type: BinaryType::Executable,
            remove_file_extension: true,
            ..Default::default()
        };
        assert_eq!(full_binary_name(&config), "bin/game");
    }
}
