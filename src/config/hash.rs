//! Structural identity of a [`super::BuildConfig`] (spec section 4.1).
//!
//! Ground truth: `original_source/include/builder.h`'s `BuilderHashSDBM` /
//! `BuilderGetConfigHash`. Kept as a seeded 32-bit SDBM rolling hash for
//! bit-parity with the reference implementation's observable behaviour,
//! rather than widened to 64 bits - spec section 4.1 permits either as
//! long as "identical configs are merged, distinct configs are kept" holds,
//! and the narrower hash is what the original tests were written against.

use super::BuildConfig;

fn sdbm(seed: u32, bytes: &[u8]) -> u32 {
    let mut hash = seed;
    for &b in bytes {
        hash = (b as u32)
            .wrapping_add(hash << 6)
            .wrapping_add(hash << 16)
            .wrapping_sub(hash);
    }
    hash
}

fn hash_str(seed: u32, s: &str) -> u32 {
    sdbm(seed, s.as_bytes())
}

fn hash_str_array(seed: u32, arr: &[String]) -> u32 {
    let mut hash = seed;
    for s in arr {
        hash = hash_str(hash, s);
    }
    hash
}

/// Computes the structural identity hash of a config. `resolve` looks up a
/// dependency by name so the hash can recurse into each dependency's own
/// dependencies, exactly as `BuilderGetConfigHash` walks `dependsOn`
/// recursively in the original. Two configs are "the same" iff their
/// hashes match.
pub fn config_hash(config: &BuildConfig, resolve: &dyn Fn(&str) -> Option<BuildConfig>) -> u32 {
    config_hash_seeded(config, 0, resolve)
}

fn config_hash_seeded(
    config: &BuildConfig,
    seed: u32,
    resolve: &dyn Fn(&str) -> Option<BuildConfig>,
) -> u32 {
    let mut hash = seed;

    for dep_name in &config.depends_on {
        if let Some(dep) = resolve(dep_name) {
            hash = config_hash_seeded(&dep, hash, resolve);
        }
    }

    hash = hash_str_array(hash, &config.source_files);
    hash = hash_str_array(hash, &config.defines);
    hash = hash_str_array(hash, &config.additional_includes);
    hash = hash_str_array(hash, &config.additional_lib_paths);
    hash = hash_str_array(hash, &config.additional_libs);
    hash = hash_str_array(hash, &config.ignore_warnings);

    hash = hash_str(hash, &config.binary_name);
    hash = hash_str(hash, &config.binary_folder);
    hash = hash_str(hash, &config.name);

    hash = sdbm(hash, &(config.binary_type as u32).to_le_bytes());
    hash = sdbm(hash, &(config.optimization_level as u32).to_le_bytes());

    hash = sdbm(hash, &[config.remove_symbols as u8]);
    hash = sdbm(hash, &[config.remove_file_extension as u8]);
    hash = sdbm(hash, &[config.warnings_as_errors as u8]);

    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_deps(_: &str) -> Option<BuildConfig> {
        None
    }

    fn base_config(name: &str) -> BuildConfig {
        BuildConfig {
            name: name.to_string(),
            source_files: vec!["main.c".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn distinguishes_names() {
        let a = base_config("debug");
        let b = base_config("debug");
        assert_eq!(config_hash(&a, &no_deps), config_hash(&b, &no_deps));

        let c = base_config("release");
        assert_ne!(config_hash(&a, &no_deps), config_hash(&c, &no_deps));
    }

    #[test]
    fn differing_sources_hash_differently() {
        let mut a = base_config("x");
        let mut b = base_config("x");
        b.source_files.push("extra.c".to_string());
        assert_ne!(config_hash(&a, &no_deps), config_hash(&b, &no_deps));
        a.source_files.push("extra.c".to_string());
        assert_eq!(config_hash(&a, &no_deps), config_hash(&b, &no_deps));
    }

    #[test]
    fn dependency_contents_affect_hash() {
        let mut a = base_config("lib_user");
        a.depends_on.push("lib".to_string());
        let b = a.clone();

        let lib_a = base_config("lib");
        let mut lib_b = lib_a.clone();
        lib_b.defines.push("EXTRA=1".to_string());

        let resolve_a = |name: &str| (name == "lib").then(|| lib_a.clone());
        let resolve_b = |name: &str| (name == "lib").then(|| lib_b.clone());

        assert_ne!(config_hash(&a, &resolve_a), config_hash(&b, &resolve_b));
    }
}
