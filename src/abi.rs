//! The C ABI the description module is compiled against (spec section 6,
//! "User callback ABI"). `include/builder.h` is the C-side mirror of the
//! types in this file; the two must stay field-for-field identical.
//!
//! The original tool's header describes these as C++ `std::vector`/
//! `std::string` members, which is not a portable ABI across compilers or
//! standard-library versions - it only works in the source because the
//! same bundled Clang always compiles both sides. A host written in Rust
//! can't assume a C++ ABI for its plugin boundary, so this port narrows
//! the shared header to a plain-C layout (counted arrays of `const char*`,
//! fixed-width enums) and reconstructs the idiomatic [`crate::config`]
//! types from it after the call returns. This is the one deliberate
//! translation decision in the ABI surface; recorded in `DESIGN.md`.

use std::ffi::CStr;
use std::os::raw::c_char;

use crate::config::{
    BinaryType, BuildConfig, BuilderOptions, LanguageVersion, OptimizationLevel,
    VisualStudioConfig, VisualStudioProject, VisualStudioSolution,
};

#[repr(C)]
pub struct CStringArray {
    pub items: *const *const c_char,
    pub count: usize,
}

impl CStringArray {
    /// # Safety
    /// `items` must point to `count` valid, NUL-terminated C strings, or
    /// `count` must be `0`.
    unsafe fn to_vec(&self) -> Vec<String> {
        if self.items.is_null() || self.count == 0 {
            return Vec::new();
        }
        (0..self.count)
            .map(|i| unsafe {
                let ptr = *self.items.add(i);
                c_str_to_string(ptr)
            })
            .collect()
    }
}

/// # Safety
/// `ptr` must be a valid, NUL-terminated C string, or null.
unsafe fn c_str_to_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

#[repr(C)]
#[derive(Clone, Copy)]
pub enum CLanguageVersion {
    Unset = 0,
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

impl From<CLanguageVersion> for LanguageVersion {
    fn from(v: CLanguageVersion) -> Self {
        match v {
            CLanguageVersion::Unset => LanguageVersion::Unset,
            CLanguageVersion::C89 => LanguageVersion::C89,
            CLanguageVersion::C99 => LanguageVersion::C99,
            CLanguageVersion::C11 => LanguageVersion::C11,
            CLanguageVersion::C17 => LanguageVersion::C17,
            CLanguageVersion::C23 => LanguageVersion::C23,
            CLanguageVersion::Cpp11 => LanguageVersion::Cpp11,
            CLanguageVersion::Cpp14 => LanguageVersion::Cpp14,
            CLanguageVersion::Cpp17 => LanguageVersion::Cpp17,
            CLanguageVersion::Cpp20 => LanguageVersion::Cpp20,
            CLanguageVersion::Cpp23 => LanguageVersion::Cpp23,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
pub enum CBinaryType {
    Executable = 0,
    DynamicLibrary,
    StaticLibrary,
}

impl From<CBinaryType> for BinaryType {
    fn from(v: CBinaryType) -> Self {
        match v {
            CBinaryType::Executable => BinaryType::Executable,
            CBinaryType::DynamicLibrary => BinaryType::DynamicLibrary,
            CBinaryType::StaticLibrary => BinaryType::StaticLibrary,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
pub enum COptimizationLevel {
    O0 = 0,
    O1,
    O2,
    O3,
}

impl From<COptimizationLevel> for OptimizationLevel {
    fn from(v: COptimizationLevel) -> Self {
        match v {
            COptimizationLevel::O0 => OptimizationLevel::O0,
            COptimizationLevel::O1 => OptimizationLevel::O1,
            COptimizationLevel::O2 => OptimizationLevel::O2,
            COptimizationLevel::O3 => OptimizationLevel::O3,
        }
    }
}

/// Mirrors `builder.h`'s `BuildConfig`. `depends_on` is a `CStringArray`
/// of dependency *names*, not nested `BuildConfig`s - the source's
/// embedded-`std::vector<BuildConfig>` dependency list is exactly the
/// aliasing hazard spec section 9 calls out, and a C ABI can't express a
/// self-referential growable array safely anyway.
#[repr(C)]
pub struct CBuildConfig {
    pub depends_on: CStringArray,
    pub source_files: CStringArray,
    pub defines: CStringArray,
    pub additional_includes: CStringArray,
    pub additional_lib_paths: CStringArray,
    pub additional_libs: CStringArray,
    pub warning_levels: CStringArray,
    pub ignore_warnings: CStringArray,
    pub additional_compiler_arguments: CStringArray,
    pub binary_name: *const c_char,
    pub binary_folder: *const c_char,
    pub name: *const c_char,
    pub language_version: CLanguageVersion,
    pub binary_type: CBinaryType,
    pub optimization_level: COptimizationLevel,
    pub remove_symbols: bool,
    pub remove_file_extension: bool,
    pub warnings_as_errors: bool,
}

impl CBuildConfig {
    /// # Safety
    /// Every pointer field must be valid for the duration of the call, as
    /// guaranteed by the description module for the lifetime of the
    /// `set_builder_options` call (spec section 6).
    pub unsafe fn to_build_config(&self) -> BuildConfig {
        unsafe {
            BuildConfig {
                name: c_str_to_string(self.name),
                depends_on: self.depends_on.to_vec(),
                source_files: self.source_files.to_vec(),
                defines: self.defines.to_vec(),
                additional_includes: self.additional_includes.to_vec(),
                additional_lib_paths: self.additional_lib_paths.to_vec(),
                additional_libs: self.additional_libs.to_vec(),
                warning_levels: self.warning_levels.to_vec(),
                ignore_warnings: self.ignore_warnings.to_vec(),
                additional_compiler_arguments: self.additional_compiler_arguments.to_vec(),
                binary_name: c_str_to_string(self.binary_name),
                binary_folder: c_str_to_string(self.binary_folder),
                language_version: self.language_version.into(),
                binary_type: self.binary_type.into(),
                optimization_level: self.optimization_level.into(),
                remove_symbols: self.remove_symbols,
                remove_file_extension: self.remove_file_extension,
                warnings_as_errors: self.warnings_as_errors,
            }
        }
    }
}

#[repr(C)]
pub struct CBuildConfigArray {
    pub items: *const CBuildConfig,
    pub count: usize,
}

impl CBuildConfigArray {
    /// # Safety
    /// See [`CBuildConfig::to_build_config`].
    unsafe fn to_vec(&self) -> Vec<BuildConfig> {
        if self.items.is_null() || self.count == 0 {
            return Vec::new();
        }
        (0..self.count)
            .map(|i| unsafe { (*self.items.add(i)).to_build_config() })
            .collect()
    }
}

#[repr(C)]
pub struct CVisualStudioConfig {
    pub name: *const c_char,
    pub options: CBuildConfig,
    pub debugger_arguments: CStringArray,
}

#[repr(C)]
pub struct CVisualStudioConfigArray {
    pub items: *const CVisualStudioConfig,
    pub count: usize,
}

#[repr(C)]
pub struct CVisualStudioProject {
    pub configs: CVisualStudioConfigArray,
    pub code_folders: CStringArray,
    pub file_extensions: CStringArray,
    pub name: *const c_char,
}

#[repr(C)]
pub struct CVisualStudioProjectArray {
    pub items: *const CVisualStudioProject,
    pub count: usize,
}

#[repr(C)]
pub struct CVisualStudioSolution {
    pub projects: CVisualStudioProjectArray,
    pub platforms: CStringArray,
    pub name: *const c_char,
    pub path: *const c_char,
    /// Whether the user populated this at all - the source distinguishes
    /// "no solution requested" from "solution with zero fields set" via a
    /// sentinel, which a C ABI models more plainly as an explicit flag.
    pub present: bool,
}

#[repr(C)]
pub struct CBuilderOptions {
    pub compiler_path: *const c_char,
    pub compiler_version: *const c_char,
    pub configs: CBuildConfigArray,
    pub solution: CVisualStudioSolution,
    pub force_rebuild: bool,
    pub generate_solution: bool,
    pub generate_compilation_database: bool,
}

impl Default for CBuilderOptions {
    /// The struct `set_builder_options` receives a `*mut` to: zeroed
    /// arrays/pointers, `false` flags, matching the original's
    /// default-constructed `BuilderOptions` the callback is handed.
    fn default() -> Self {
        CBuilderOptions {
            compiler_path: std::ptr::null(),
            compiler_version: std::ptr::null(),
            configs: CBuildConfigArray { items: std::ptr::null(), count: 0 },
            solution: CVisualStudioSolution {
                projects: CVisualStudioProjectArray { items: std::ptr::null(), count: 0 },
                platforms: CStringArray { items: std::ptr::null(), count: 0 },
                name: std::ptr::null(),
                path: std::ptr::null(),
                present: false,
            },
            force_rebuild: false,
            generate_solution: false,
            generate_compilation_database: false,
        }
    }
}

impl CBuilderOptions {
    /// # Safety
    /// Must only be called after `set_builder_options` has populated
    /// `self`; every pointer the module set must still be valid (the
    /// module must not free its own strings until after this call, which
    /// is the documented contract of the callback - it returns, the host
    /// reads, then the module is unloaded).
    pub unsafe fn to_builder_options(&self) -> BuilderOptions {
        unsafe {
            let compiler_path = (!self.compiler_path.is_null())
                .then(|| c_str_to_string(self.compiler_path));
            let compiler_version = (!self.compiler_version.is_null())
                .then(|| c_str_to_string(self.compiler_version));

            let solution = self.solution.present.then(|| VisualStudioSolution {
                projects: self
                    .solution
                    .projects
                    .to_vec()
                    .into_iter()
                    .map(|p| unsafe { p.to_project() })
                    .collect(),
                platforms: self.solution.platforms.to_vec(),
                name: c_str_to_string(self.solution.name),
                path: c_str_to_string(self.solution.path),
            });

            BuilderOptions {
                compiler_path,
                compiler_version,
                configs: self.configs.to_vec(),
                solution,
                force_rebuild: self.force_rebuild,
                generate_solution: self.generate_solution,
                generate_compilation_database: self.generate_compilation_database,
            }
        }
    }
}

impl CVisualStudioProjectArray {
    unsafe fn to_vec(&self) -> Vec<CProjectHandle> {
        if self.items.is_null() || self.count == 0 {
            return Vec::new();
        }
        (0..self.count)
            .map(|i| CProjectHandle(unsafe { &*self.items.add(i) }))
            .collect()
    }
}

/// A thin wrapper so the `project.to_project()` call above reads
/// naturally despite going through a raw-pointer array.
struct CProjectHandle<'a>(&'a CVisualStudioProject);

impl CProjectHandle<'_> {
    unsafe fn to_project(&self) -> VisualStudioProject {
        unsafe {
            let configs = if self.0.configs.items.is_null() || self.0.configs.count == 0 {
                Vec::new()
            } else {
                (0..self.0.configs.count)
                    .map(|i| {
                        let c = &*self.0.configs.items.add(i);
                        VisualStudioConfig {
                            name: c_str_to_string(c.name),
                            options: c.options.to_build_config(),
                            debugger_arguments: c.debugger_arguments.to_vec(),
                        }
                    })
                    .collect()
            };

            VisualStudioProject {
                configs,
                code_folders: self.0.code_folders.to_vec(),
                file_extensions: self.0.file_extensions.to_vec(),
                name: c_str_to_string(self.0.name),
            }
        }
    }
}
