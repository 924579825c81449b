//! Project discovery.
//!
//! Every project has its own directory under the projects root, named after
//! the project's absolute path with every character other than ASCII
//! letters, digits and `-` replaced by `-`. For example, a project at
//! `/Users/foo/my.app` lives in `<root>/-Users-foo-my-app/`.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::history::{HistoryError, Result};

/// A project directory under the projects root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDir {
    /// The encoded directory name.
    pub name: String,
    pub path: PathBuf,
}

/// Encode a project path into its directory name.
pub fn encode_project_path(path: &Path) -> String {
    path.to_string_lossy()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect()
}

/// List every project directory, sorted by name.
pub fn list_projects(root: &Path) -> Result<Vec<ProjectDir>> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(HistoryError::ProjectsRootMissing(root.to_path_buf()));
        }
        Err(source) => {
            return Err(HistoryError::Io {
                path: root.to_path_buf(),
                source,
            });
        }
    };

    let mut projects: Vec<ProjectDir> = entries
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let path = entry.path();
            if !path.is_dir() {
                return None;
            }
            let name = path.file_name()?.to_str()?.to_string();
            Some(ProjectDir { name, path })
        })
        .collect();
    projects.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(projects)
}

/// Resolve a project reference to one or more project directories.
///
/// Tried in order, stopping at the first rule that matches anything:
///
/// 1. a directory named exactly `reference`
/// 2. a directory named after `reference` as a path
/// 3. directories whose name ends with `-<encoded reference>`
/// 4. directories whose name contains the encoded reference
///
/// Fails with [`HistoryError::ProjectNotFound`] when nothing matches.
pub fn resolve_project(root: &Path, reference: &str) -> Result<Vec<PathBuf>> {
    let projects = list_projects(root)?;

    if let Some(p) = projects.iter().find(|p| p.name == reference) {
        return Ok(vec![p.path.clone()]);
    }

    let as_path = Path::new(reference);
    if as_path.exists() {
        let absolute = fs::canonicalize(as_path).unwrap_or_else(|_| as_path.to_path_buf());
        let encoded = encode_project_path(&absolute);
        if let Some(p) = projects.iter().find(|p| p.name == encoded) {
            return Ok(vec![p.path.clone()]);
        }
    }

    let encoded = encode_project_path(as_path);
    let fragment = encoded.trim_matches('-');
    if fragment.is_empty() {
        return Err(HistoryError::ProjectNotFound(reference.to_string()));
    }

    let suffix = format!("-{fragment}");
    let by_suffix: Vec<PathBuf> = projects
        .iter()
        .filter(|p| p.name.ends_with(&suffix))
        .map(|p| p.path.clone())
        .collect();
    if !by_suffix.is_empty() {
        return Ok(by_suffix);
    }

    let by_fragment: Vec<PathBuf> = projects
        .iter()
        .filter(|p| p.name.contains(fragment))
        .map(|p| p.path.clone())
        .collect();
    if !by_fragment.is_empty() {
        return Ok(by_fragment);
    }

    Err(HistoryError::ProjectNotFound(reference.to_string()))
}

/// Resolve the project for the current working directory.
pub fn resolve_current(root: &Path) -> Result<Vec<PathBuf>> {
    let cwd = env::current_dir().map_err(|source| HistoryError::Io {
        path: PathBuf::from("."),
        source,
    })?;
    let encoded = encode_project_path(&cwd);
    let projects = list_projects(root)?;
    match projects.into_iter().find(|p| p.name == encoded) {
        Some(p) => Ok(vec![p.path]),
        None => Err(HistoryError::ProjectNotFound(cwd.display().to_string())),
    }
}
