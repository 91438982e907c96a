//! Clang backend (spec section 4.4).
//!
//! Ground truth: `original_source/src/backend_clang.cpp`, read in full.
//! Flag syntax carried verbatim: `-std=`, `-O0..3`, `-g`, `-Werror`,
//! `-Weverything`, `-Wno-`, `-I`, `-L`, `-l`, `-D`, `-shared`, `-o`.

use std::path::{Path, PathBuf};

use crate::config::{BinaryType, BuildConfig, LanguageVersion, OptimizationLevel};
use crate::error::{CrucibleError, Result};
use crate::process::{self, Invocation};

use super::{object_path_for, parse_makefile_deps, Archetype, CompileResult, CompilerBackend, LinkResult};

pub struct ClangBackend {
    compiler_path: String,
    compiler_version: String,
}

impl ClangBackend {
    pub fn new(compiler_path: impl Into<String>, compiler_version: impl Into<String>) -> Self {
        Self {
            compiler_path: compiler_path.into(),
            compiler_version: compiler_version.into(),
        }
    }
}

/// `LanguageVersionToCompilerArg` in `backend_clang.cpp`.
pub(crate) fn language_version_arg(version: LanguageVersion) -> &'static str {
    match version {
        LanguageVersion::Unset | LanguageVersion::C11 => "-std=c11",
        LanguageVersion::C89 => "-std=c89",
        LanguageVersion::C99 => "-std=c99",
        LanguageVersion::C17 => "-std=c17",
        LanguageVersion::C23 => "-std=c23",
        LanguageVersion::Cpp11 => "-std=c++11",
        LanguageVersion::Cpp14 => "-std=c++14",
        LanguageVersion::Cpp17 => "-std=c++17",
        LanguageVersion::Cpp20 => "-std=c++20",
        LanguageVersion::Cpp23 => "-std=c++23",
    }
}

/// `OptimizationLevelToCompilerArg` in `backend_clang.cpp`.
pub(crate) fn optimization_arg(level: OptimizationLevel) -> &'static str {
    match level {
        OptimizationLevel::O0 => "-O0",
        OptimizationLevel::O1 => "-O1",
        OptimizationLevel::O2 => "-O2",
        OptimizationLevel::O3 => "-O3",
    }
}

pub(crate) fn warning_args(config: &BuildConfig) -> Vec<String> {
    let mut args = Vec::new();

    if config.warning_levels.is_empty() {
        args.push("-Wall".to_string());
        args.push("-Wextra".to_string());
    } else {
        for level in &config.warning_levels {
            args.push(format!("-W{level}"));
        }
    }

    if config.warnings_as_errors {
        args.push("-Werror".to_string());
    }

    for ignored in &config.ignore_warnings {
        args.push(format!("-Wno-{ignored}"));
    }

    args
}

pub(crate) fn common_compile_args(config: &BuildConfig, description_dir: &Path) -> Vec<String> {
    let mut args = Vec::new();

    for define in &config.defines {
        args.push(format!("-D{define}"));
    }
    for include in &config.additional_includes {
        let resolved = crate::paths::resolve_relative_to(description_dir, include);
        args.push(format!("-I{}", resolved.display()));
    }

    args.push(optimization_arg(config.optimization_level).to_string());
    if !config.remove_symbols {
        args.push("-g".to_string());
    }
    args.extend(warning_args(config));
    args.extend(config.additional_compiler_arguments.clone());

    args
}

impl CompilerBackend for ClangBackend {
    fn compile_one(
        &self,
        config: &BuildConfig,
        source: &Path,
        object_out: &Path,
        description_dir: &Path,
    ) -> Result<CompileResult> {
        let extension = source.extension().and_then(|e| e.to_str()).unwrap_or("");
        let language = LanguageVersion::for_source_extension(config.language_version, extension);

        let dependency_file = object_out.with_extension("d");

        let mut args = vec![
            language_version_arg(language).to_string(),
            "-c".to_string(),
            source.to_string_lossy().into_owned(),
            "-o".to_string(),
            object_out.to_string_lossy().into_owned(),
            "-MD".to_string(),
            "-MF".to_string(),
            dependency_file.to_string_lossy().into_owned(),
        ];
        args.extend(common_compile_args(config, description_dir));

        let output = process::run(&Invocation {
            program: &self.compiler_path,
            args: &args,
            working_dir: Some(description_dir),
        })?;

        if !output.success() {
            return Err(CrucibleError::Compile(output.exit_code));
        }

        Ok(CompileResult {
            object_path: object_out.to_path_buf(),
            exit_code: output.exit_code,
            argv: args,
            dependency_file: Some(dependency_file),
        })
    }

    fn link_intermediates(
        &self,
        config: &BuildConfig,
        objects: &[PathBuf],
        output: &Path,
        description_dir: &Path,
    ) -> Result<LinkResult> {
        if config.binary_type == BinaryType::StaticLibrary {
            let mut args = vec!["rcs".to_string(), output.to_string_lossy().into_owned()];
            args.extend(objects.iter().map(|o| o.to_string_lossy().into_owned()));

            let result = process::run(&Invocation {
                program: "ar",
                args: &args,
                working_dir: Some(description_dir),
            })?;

            if !result.success() {
                return Err(CrucibleError::Link(result.exit_code));
            }

            return Ok(LinkResult {
                output_path: output.to_path_buf(),
                exit_code: result.exit_code,
                argv: args,
            });
        }

        let mut args: Vec<String> = objects.iter().map(|o| o.to_string_lossy().into_owned()).collect();
        args.push("-o".to_string());
        args.push(output.to_string_lossy().into_owned());

        if config.binary_type == BinaryType::DynamicLibrary {
            args.push("-shared".to_string());
        }

        for lib_path in &config.additional_lib_paths {
            let resolved = crate::paths::resolve_relative_to(description_dir, lib_path);
            args.push(format!("-L{}", resolved.display()));
        }
        for lib in &config.additional_libs {
            args.push(format!("-l{lib}"));
        }

        let result = process::run(&Invocation {
            program: &self.compiler_path,
            args: &args,
            working_dir: Some(description_dir),
        })?;

        if !result.success() {
            return Err(CrucibleError::Link(result.exit_code));
        }

        Ok(LinkResult {
            output_path: output.to_path_buf(),
            exit_code: result.exit_code,
            argv: args,
        })
    }

    fn archetype_for(&self, binary_type: BinaryType) -> Archetype {
        match binary_type {
            BinaryType::Executable => Archetype {
                binary_extension: crate::paths::executable_extension(),
                object_extension: "o",
            },
            BinaryType::DynamicLibrary => Archetype {
                binary_extension: crate::paths::dynamic_library_extension(),
                object_extension: "o",
            },
            BinaryType::StaticLibrary => Archetype {
                binary_extension: crate::paths::static_library_extension(),
                object_extension: "o",
            },
        }
    }

    fn collect_include_dependencies(&self, dependency_file: &Path) -> Result<Vec<PathBuf>> {
        let contents = std::fs::read_to_string(dependency_file)
            .map_err(|e| CrucibleError::io(dependency_file, e))?;
        Ok(parse_makefile_deps(&contents))
    }

    fn compiler_path(&self) -> &str {
        &self.compiler_path
    }

    fn compiler_version(&self) -> &str {
        &self.compiler_version
    }
}

/// Computes the object file path `compile_one` would use for `source`,
/// exposed so `driver.rs` can decide on a path before invoking the backend.
pub fn object_path(object_dir: &Path, source: &Path, description_dir: &Path) -> PathBuf {
    object_path_for(object_dir, source, description_dir, "o")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_version_maps_unset_c_sources_to_c11() {
        assert_eq!(language_version_arg(LanguageVersion::Unset), "-std=c11");
        assert_eq!(language_version_arg(LanguageVersion::Cpp17), "-std=c++17");
    }

    #[test]
    fn default_warning_args_include_werror_when_requested() {
        let config = BuildConfig {
            warnings_as_errors: true,
            ignore_warnings: vec!["unused-parameter".to_string()],
            ..Default::default()
        };
        let args = warning_args(&config);
        assert!(args.contains(&"-Werror".to_string()));
        assert!(args.contains(&"-Wno-unused-parameter".to_string()));
    }

    #[test]
    fn remove_symbols_suppresses_debug_info_flag() {
        let kept = common_compile_args(&BuildConfig::default(), Path::new("."));
        assert!(kept.contains(&"-g".to_string()));

        let stripped_config = BuildConfig {
            remove_symbols: true,
            ..Default::default()
        };
        let stripped = common_compile_args(&stripped_config, Path::new("."));
        assert!(!stripped.contains(&"-g".to_string()));
    }
}
