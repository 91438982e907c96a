//! Platform Services: loading a dynamic module and resolving a named C
//! symbol (spec section 1's external-collaborator contract; the *only*
//! true plugin boundary in the system, per section 6's "User callback
//! ABI"). Grounded in `libloading`, a real dependency of `cargo` itself
//! (`other_examples/manifests/rust-lang-cargo/Cargo.toml`) for exactly this
//! "load a build-script-compiled shared object, call a symbol by name"
//! need.

use std::path::Path;

use libloading::{Library, Symbol};

use crate::error::{CrucibleError, Result};

pub type SetBuilderOptionsFn = unsafe extern "C" fn(*mut crate::abi::CBuilderOptions);
pub type HookFn = unsafe extern "C" fn();

/// An RAII handle to the loaded description module. Dropping it unloads
/// the module - scoped acquisition with guaranteed release, per spec
/// section 5.
pub struct DescriptionModule {
    library: Library,
}

impl DescriptionModule {
    /// Loads the module compiled from the user's description source (or
    /// resumed from a previous build-info run). Symbol lookup for the
    /// mandatory `set_builder_options` is deferred to the caller, since a
    /// pure-VS-generation run never needs to call it (spec section 4.6).
    pub fn load(path: &Path) -> Result<Self> {
        // SAFETY: the description module is a native binary the
        // orchestrator itself just compiled (or previously compiled and
        // cached); spec section 1 explicitly accepts running it in-process
        // with full privileges (no sandboxing is in scope).
        let library = unsafe { Library::new(path) }.map_err(|e| {
            CrucibleError::Module(format!("failed to load module \"{}\": {e}", path.display()))
        })?;

        Ok(Self { library })
    }

    /// Looks up `set_builder_options`. Mandatory unless the run is purely
    /// for emitting a Visual Studio solution (spec section 4.6).
    pub fn set_builder_options_symbol(&self) -> Result<Symbol<'_, SetBuilderOptionsFn>> {
        unsafe { self.library.get(b"set_builder_options\0") }.map_err(|e| {
            CrucibleError::Module(format!(
                "module does not export the mandatory \"set_builder_options\" symbol: {e}"
            ))
        })
    }

    /// Optional hooks - a missing symbol is not an error (spec section
    /// 4.6: "Symbol lookup failure for optional hooks is not an error").
    pub fn hook_symbol(&self, name: &str) -> Option<Symbol<'_, HookFn>> {
        let mut bytes = name.as_bytes().to_vec();
        bytes.push(0);
        unsafe { self.library.get::<HookFn>(&bytes) }.ok()
    }
}
