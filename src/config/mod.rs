//! The [`BuildConfig`] record and the rest of the data model owned by a
//! loaded user description module (spec section 3).

mod graph;
mod hash;

pub use graph::{ConfigGraph, ConfigId};
pub use hash::config_hash;

use std::path::PathBuf;

/// Mirrors `include/builder.h`'s `LanguageVersion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LanguageVersion {
    #[default]
    Unset,
    C89,
    C99,
    C11,
    C17,
    C23,
    Cpp11,
    Cpp14,
    Cpp17,
    Cpp20,
    Cpp23,
}

impl LanguageVersion {
    /// Infers the language standard from a source file's extension, used
    /// when a static library config mixes C and C++ translation units
    /// (spec section 3 invariant).
    pub fn infer_from_extension(ext: &str, fallback: LanguageVersion) -> LanguageVersion {
        match ext {
            "c" => LanguageVersion::C11,
            "cpp" | "cc" | "cxx" => LanguageVersion::Cpp17,
            _ => fallback,
        }
    }

    pub fn is_cpp(&self) -> bool {
        matches!(
            self,
            LanguageVersion::Cpp11
                | LanguageVersion::Cpp14
                | LanguageVersion::Cpp17
                | LanguageVersion::Cpp20
                | LanguageVersion::Cpp23
        )
    }

    /// The standard a single TU should actually compile with: the config's
    /// chosen standard when its family (C vs C++) matches the source
    /// file's extension, otherwise the per-extension default. This is
    /// what makes the static-library mixed-C/C++ invariant in spec
    /// section 3 hold without forcing every TU in the config to share one
    /// language family.
    pub fn for_source_extension(config_version: LanguageVersion, extension: &str) -> LanguageVersion {
        let source_is_cpp = matches!(extension, "cpp" | "cc" | "cxx");
        let config_matches_family = if source_is_cpp {
            config_version.is_cpp()
        } else {
            !config_version.is_cpp() && config_version != LanguageVersion::Unset
        };

        if config_matches_family {
            config_version
        } else {
            LanguageVersion::infer_from_extension(extension, config_version)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinaryType {
    #[default]
    Executable,
    DynamicLibrary,
    StaticLibrary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptimizationLevel {
    #[default]
    O0,
    O1,
    O2,
    O3,
}

/// One buildable target. Dependencies are kept as names until the graph is
/// flattened (section 9's "Cyclic / recursive pointer graphs" note: no
/// owned recursive `Vec<BuildConfig>`, which is what the source does and
/// which aliases badly under reallocation).
#[derive(Debug, Clone, Default)]
pub struct BuildConfig {
    pub name: String,
    pub depends_on: Vec<String>,

    pub source_files: Vec<String>,
    pub defines: Vec<String>,
    pub additional_includes: Vec<String>,
    pub additional_lib_paths: Vec<String>,
    pub additional_libs: Vec<String>,
    pub warning_levels: Vec<String>,
    pub ignore_warnings: Vec<String>,
    pub additional_compiler_arguments: Vec<String>,

    pub binary_name: String,
    pub binary_folder: String,

    pub language_version: LanguageVersion,
    pub binary_type: BinaryType,
    pub optimization_level: OptimizationLevel,

    pub remove_symbols: bool,
    pub remove_file_extension: bool,
    pub warnings_as_errors: bool,
}

impl BuildConfig {
    /// Injects the built-in defaults described in spec section 4.1:
    /// the orchestrator's own directory as an include path, the platform
    /// C runtime libraries matching the orchestrator's own build (ABI
    /// parity across the description-module boundary), and a curated set
    /// of warning suppressions that keep `builder.h` quiet under loud
    /// warning modes.
    pub fn add_builtin_defaults(&mut self, app_dir: &std::path::Path) {
        let app_dir = app_dir.to_string_lossy().into_owned();
        if !self.additional_includes.contains(&app_dir) {
            self.additional_includes.push(app_dir);
        }

        for lib in crate::paths::platform_crt_libs() {
            if !self.additional_libs.iter().any(|l| l == lib) {
                self.additional_libs.push(lib.to_string());
            }
        }

        for warn in [
            "unused-parameter",
            "missing-field-initializers",
            "gnu-zero-variadic-macro-arguments",
        ] {
            let flag = warn.to_string();
            if !self.ignore_warnings.contains(&flag) {
                self.ignore_warnings.push(flag);
            }
        }
    }

    /// True when `remove_file_extension` is unset and the binary type is an
    /// on-disk artefact that carries a platform extension.
    pub fn binary_path(&self, binary_extension: &str) -> PathBuf {
        let mut name = self.binary_name.clone();
        if !self.remove_file_extension && !binary_extension.is_empty() {
            name.push('.');
            name.push_str(binary_extension);
        }
        PathBuf::from(&self.binary_folder).join(name)
    }
}

/// Top-level container populated by the user's `set_builder_options`.
#[derive(Debug, Clone, Default)]
pub struct BuilderOptions {
    pub compiler_path: Option<String>,
    pub compiler_version: Option<String>,
    pub configs: Vec<BuildConfig>,
    pub solution: Option<VisualStudioSolution>,
    pub force_rebuild: bool,
    pub generate_solution: bool,
    pub generate_compilation_database: bool,
}

#[derive(Debug, Clone)]
pub struct VisualStudioConfig {
    /// Not required to be unique - distinct from `options.name`.
    pub name: String,
    pub options: BuildConfig,
    pub debugger_arguments: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct VisualStudioProject {
    pub configs: Vec<VisualStudioConfig>,
    pub code_folders: Vec<String>,
    pub file_extensions: Vec<String>,
    pub name: String,
}

impl VisualStudioProject {
    pub const DEFAULT_EXTENSIONS: &'static [&'static str] =
        &["c", "cpp", "cc", "cxx", "h", "hpp", "inl"];

    pub fn effective_extensions(&self) -> &[String] {
        if self.file_extensions.is_empty() {
            // Caller falls back to `DEFAULT_EXTENSIONS`; kept as a borrowed
            // slice accessor so callers don't need to allocate.
            &[]
        } else {
            &self.file_extensions
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VisualStudioSolution {
    pub projects: Vec<VisualStudioProject>,
    pub platforms: Vec<String>,
    pub name: String,
    pub path: String,
}
