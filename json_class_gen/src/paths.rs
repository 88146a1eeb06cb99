//! Names derived from file-system locations.

use std::path::{Component, Path};

/// Root class name of an input document: its file name up to the first `.`.
/// Example: `data/boutique.sample.json` -> `boutique`.
#[must_use]
pub fn root_name_from_path(path: &Path) -> Option<String> {
    let file_name: &str = path.file_name()?.to_str()?;
    let stem: &str = file_name.split('.').next().unwrap_or(file_name);
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

/// Module namespace of an output directory: the components after the last
/// `src`, joined by `::`; the directory name itself when there is no `src`.
/// Example: `app/src/model/generated` -> `model::generated`.
#[must_use]
pub fn namespace_from_path(path: &Path) -> String {
    let names: Vec<&str> = path
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => name.to_str(),
            _ => None,
        })
        .collect();
    match names.iter().rposition(|name| *name == "src") {
        Some(position) => names[position + 1..].join("::"),
        None => names.last().map(ToString::to_string).unwrap_or_default(),
    }
}
