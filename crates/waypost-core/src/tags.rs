//! Version metadata travels through the directory as a prefixed tag.
//!
//! At most one tag per registration carries [`VERSION_PREFIX`]; an instance
//! without one simply has no version.

use crate::registration::ServiceRegistration;

pub const VERSION_PREFIX: &str = "version-";
pub const URL_PREFIX: &str = "urlprefix-";

pub fn encode_version(version: &str) -> String {
    format!("{VERSION_PREFIX}{version}")
}

pub fn decode_version<S: AsRef<str>>(tags: &[S]) -> Option<String> {
    tags.iter()
        .find_map(|tag| tag.as_ref().strip_prefix(VERSION_PREFIX))
        .map(str::to_string)
}

pub fn url_prefix(service_name: &str) -> String {
    format!("{URL_PREFIX}{service_name}")
}

/// Full tag list as written to the directory: free-form tags, then the version.
pub fn registration_tags(registration: &ServiceRegistration) -> Vec<String> {
    let mut tags: Vec<String> = registration
        .tags
        .iter()
        .filter(|tag| !tag.starts_with(VERSION_PREFIX))
        .cloned()
        .collect();
    if let Some(version) = &registration.version {
        tags.push(encode_version(version));
    }
    tags
}
