//! Platform Services: 128-bit identifier generation (spec section 1),
//! used by the Visual Studio generator for project/folder GUIDs.
//!
//! Grounded in `uuid`, a real dependency across the pack's C/C++ build
//! tooling examples (e.g. `travbid-catapult`'s manifest) for exactly this
//! "mint an identifier" need.

use uuid::Uuid;

/// Generates a fresh GUID, rendered the way MSBuild project files expect:
/// uppercase, braced, hyphenated.
pub fn new_guid() -> String {
    format!("{{{}}}", Uuid::new_v4().to_string().to_uppercase())
}

/// The well-known MSBuild "solution folder" project-type GUID (spec
/// section 4.7). This is a fixed constant, not a generated value.
pub const SOLUTION_FOLDER_TYPE_GUID: &str = "{2150E333-8FDC-42A3-9474-1A3956D46DE8}";

/// The well-known MSBuild "C++ project" project-type GUID, used on the
/// `.sln`'s `Project(...)` line for every actual `.vcxproj` (as opposed to
/// a solution folder, which uses [`SOLUTION_FOLDER_TYPE_GUID`] instead).
pub const CPP_PROJECT_TYPE_GUID: &str = "{8BC9CEB8-8B4A-11D0-8D11-00A0C91BC942}";
