//! Project/solution-folder GUID bookkeeping for the Visual Studio generator
//! (spec section 4.7): a project name containing forward slashes nests it
//! under solution folders, one GUID per project and one per unique folder
//! *path* (not bare folder name - keying on the full path, rather than the
//! original's name-only hashmap, is what keeps two different folders that
//! happen to share a leaf name, e.g. `games/shooter` and `tools/shooter`,
//! from being merged into one; recorded as a deliberate fix in DESIGN.md).

use std::collections::HashMap;

use crate::config::VisualStudioProject;
use crate::guid::new_guid;

/// One minted solution folder: its GUID and the display name Visual
/// Studio should show in Solution Explorer (the path's leaf component).
pub struct FolderEntry {
    pub guid: String,
    pub name: String,
}

pub struct GuidTable {
    /// Parallel to the `projects` slice passed to [`assign`].
    pub project_guids: Vec<String>,
    /// Every unique folder path discovered, in first-seen order.
    pub folders: Vec<FolderEntry>,
    /// `(child_guid, parent_guid)` pairs for the `NestedProjects` global
    /// section: both folder-in-folder and project-in-folder edges.
    pub nesting: Vec<(String, String)>,
}

/// Splits `name` into (folder path, leaf name) on the last `/`.  `None`
/// when the project isn't nested at all.
fn split_project_name(name: &str) -> Option<(&str, &str)> {
    name.rfind('/').map(|idx| (&name[..idx], &name[idx + 1..]))
}

/// The project's own display/file-stem name, with any folder path
/// components stripped.
pub fn project_leaf_name(name: &str) -> &str {
    split_project_name(name).map(|(_, leaf)| leaf).unwrap_or(name)
}

/// Mints a GUID for every project plus one for every unique folder path
/// implied by a project name containing `/`, and records the nesting
/// edges needed for the `.sln`'s `GlobalSection(NestedProjects)` block.
pub fn assign(projects: &[VisualStudioProject]) -> GuidTable {
    let project_guids: Vec<String> = projects.iter().map(|_| new_guid()).collect();

    let mut folders = Vec::new();
    let mut folder_guid_by_path: HashMap<String, String> = HashMap::new();
    let mut nesting = Vec::new();

    for (index, project) in projects.iter().enumerate() {
        let Some((folder_path, _leaf)) = split_project_name(&project.name) else {
            continue;
        };

        let mut parent_guid: Option<String> = None;
        let mut accumulated = String::new();

        for component in folder_path.split('/').filter(|c| !c.is_empty()) {
            if !accumulated.is_empty() {
                accumulated.push('/');
            }
            accumulated.push_str(component);

            let is_new = !folder_guid_by_path.contains_key(&accumulated);
            let guid = folder_guid_by_path
                .entry(accumulated.clone())
                .or_insert_with(new_guid)
                .clone();

            if is_new {
                folders.push(FolderEntry { guid: guid.clone(), name: component.to_string() });
                if let Some(parent) = &parent_guid {
                    nesting.push((guid.clone(), parent.clone()));
                }
            }

            parent_guid = Some(guid);
        }

        if let Some(parent) = parent_guid {
            nesting.push((project_guids[index].clone(), parent));
        }
    }

    GuidTable { project_guids, folders, nesting }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(name: &str) -> VisualStudioProject {
        VisualStudioProject { name: name.to_string(), ..Default::default() }
    }

    #[test]
    fn unnested_project_gets_no_folder() {
        let table = assign(&[project("game")]);
        assert_eq!(table.project_guids.len(), 1);
        assert!(table.folders.is_empty());
        assert!(table.nesting.is_empty());
    }

    #[test]
    fn nested_project_gets_folder_chain() {
        let table = assign(&[project("games/shooter/client")]);
        assert_eq!(table.folders.len(), 2);
        assert_eq!(table.folders[0].name, "games");
        assert_eq!(table.folders[1].name, "shooter");
        // project nests under "shooter", "shooter" nests under "games"
        assert_eq!(table.nesting.len(), 2);
        assert_eq!(table.nesting[0], (table.folders[1].guid.clone(), table.folders[0].guid.clone()));
        assert_eq!(table.nesting[1], (table.project_guids[0].clone(), table.folders[1].guid.clone()));
    }

    #[test]
    fn same_leaf_name_in_different_parents_is_not_merged() {
        let table = assign(&[project("games/shooter"), project("tools/shooter")]);
        let shooter_folders: Vec<_> = table.folders.iter().filter(|f| f.name == "shooter").collect();
        assert_eq!(shooter_folders.len(), 2);
        assert_ne!(shooter_folders[0].guid, shooter_folders[1].guid);
    }

    #[test]
    fn leaf_name_strips_folder_path() {
        assert_eq!(project_leaf_name("games/shooter"), "shooter");
        assert_eq!(project_leaf_name("shooter"), "shooter");
    }
}
