//! Version naming for published entities.
//!
//! A published entity is stored as `{name}__{version}`. Different versions of
//! the same logical entity are distinct keys sharing one version group.

use crate::key::EntityKey;

/// Separates the logical name from its version.
pub const VERSION_SEPARATOR: &str = "__";

/// Splits `name__1.0.0` into `("name", Some("1.0.0"))`.
///
/// Only the last separator counts, and an empty version is not a version.
pub fn split_version(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once(VERSION_SEPARATOR) {
        Some((base, version)) if !base.is_empty() && !version.is_empty() => (base, Some(version)),
        _ => (name, None),
    }
}

/// Appends `version` to the unversioned part of `name`.
pub fn with_version(name: &str, version: &str) -> String {
    let (base, _) = split_version(name);
    format!("{base}{VERSION_SEPARATOR}{version}")
}

/// Returns the key with any version suffix removed from its name.
pub fn version_group(key: &EntityKey) -> EntityKey {
    let (base, _) = split_version(&key.name);
    EntityKey {
        bucket: key.bucket.clone(),
        folder_path: key.folder_path.clone(),
        name: base.to_string(),
    }
}
