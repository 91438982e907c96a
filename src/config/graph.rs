//! Dependency closure over [`super::BuildConfig`]s (spec section 4.1, "Config
//! Model" and section 9's "Cyclic / recursive pointer graphs" note).
//!
//! Dependencies are resolved by name against an owned pool rather than
//! copied recursively into each config, which is what the source does and
//! which the spec calls out as aliasing-prone once the backing vector
//! reallocates.

use super::{config_hash, BuildConfig};
use crate::error::{CrucibleError, Result};

/// Index into a [`ConfigGraph`]'s pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfigId(pub usize);

#[derive(Debug, Default)]
pub struct ConfigGraph {
    pool: Vec<BuildConfig>,
    hashes: Vec<u32>,
}

impl ConfigGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ConfigId) -> &BuildConfig {
        &self.pool[id.0]
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConfigId, &BuildConfig)> {
        self.pool.iter().enumerate().map(|(i, c)| (ConfigId(i), c))
    }

    pub fn find_by_name(&self, name: &str) -> Option<ConfigId> {
        self.pool.iter().position(|c| c.name == name).map(ConfigId)
    }

    fn resolve(&self, name: &str) -> Option<BuildConfig> {
        self.find_by_name(name).map(|id| self.pool[id.0].clone())
    }

    /// `add_unique`: appends `config` only if no existing entry shares its
    /// structural hash.
    pub fn add_unique(&mut self, config: BuildConfig) -> ConfigId {
        let hash = config_hash(&config, &|name| self.resolve(name));

        if let Some(pos) = self.hashes.iter().position(|&h| h == hash) {
            return ConfigId(pos);
        }

        self.pool.push(config);
        self.hashes.push(hash);
        ConfigId(self.pool.len() - 1)
    }

    /// `add_with_deps`: depth-first pre-order walk of `config`'s
    /// dependencies (which must already exist in `available`, addressed by
    /// name), followed by `config` itself, via `add_unique`.
    pub fn add_with_deps(&mut self, config: &BuildConfig, available: &[BuildConfig]) -> Result<ConfigId> {
        for dep_name in &config.depends_on {
            let dep = available
                .iter()
                .find(|c| &c.name == dep_name)
                .ok_or_else(|| {
                    CrucibleError::Validation(format!(
                        "config \"{}\" depends on \"{dep_name}\", but no config with that name exists",
                        config.name
                    ))
                })?;
            self.add_with_deps(dep, available)?;
        }

        Ok(self.add_unique(config.clone()))
    }

    /// Returns the flattened ids in insertion order, which already
    /// satisfies "every transitive dep before its dependent" (spec section
    /// 8, law 2) because `add_with_deps` only ever appends after recursing.
    pub fn flattened(&self) -> Vec<ConfigId> {
        (0..self.pool.len()).map(ConfigId).collect()
    }

    pub fn hash_of(&self, id: ConfigId) -> u32 {
        self.hashes[id.0]
    }

    /// `ConfigError::DuplicateName`: fails when two *top-level* configs
    /// (as opposed to merged-by-hash ones) share a name. O(n^2) scan, as
    /// the domain is small.
    pub fn check_unique_names(&self) -> Result<()> {
        for i in 0..self.pool.len() {
            for j in (i + 1)..self.pool.len() {
                if self.pool[i].name == self.pool[j].name {
                    return Err(CrucibleError::Validation(format!(
                        "duplicate config name \"{}\"",
                        self.pool[i].name
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: &str, deps: &[&str]) -> BuildConfig {
        BuildConfig {
            name: name.to_string(),
            depends_on: deps.iter().map(|s| s.to_string()).collect(),
            source_files: vec![format!("{name}.c")],
            ..Default::default()
        }
    }

    #[test]
    fn idempotent_uniqueness() {
        // add_unique(c, add_unique(c, L)) == add_unique(c, L)
        let mut graph = ConfigGraph::new();
        let c = config("a", &[]);
        let id1 = graph.add_unique(c.clone());
        let len_after_first = graph.len();
        let id2 = graph.add_unique(c);
        assert_eq!(id1, id2);
        assert_eq!(graph.len(), len_after_first);
    }

    #[test]
    fn topological_flattening_places_deps_first() {
        let library = config("library", &[]);
        let program = config("program", &["library"]);
        let available = vec![library.clone(), program.clone()];

        let mut graph = ConfigGraph::new();
        let program_id = graph.add_with_deps(&program, &available).unwrap();

        let flattened = graph.flattened();
        let library_pos = flattened
            .iter()
            .position(|&id| graph.get(id).name == "library")
            .unwrap();
        let program_pos = flattened.iter().position(|&id| id == program_id).unwrap();

        assert!(library_pos < program_pos);
    }

    #[test]
    fn unresolved_dependency_is_an_error() {
        let program = config("program", &["missing"]);
        let available = vec![program.clone()];
        let mut graph = ConfigGraph::new();
        assert!(graph.add_with_deps(&program, &available).is_err());
    }

    #[test]
    fn duplicate_top_level_names_rejected() {
        let mut graph = ConfigGraph::new();
        graph.add_unique(config("kenneth", &[]));
        let mut other = config("kenneth", &[]);
        other.defines.push("DIFFERENT=1".to_string());
        graph.add_unique(other);

        assert!(graph.check_unique_names().is_err());
    }
}
