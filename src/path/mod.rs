// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Panebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Turning untrusted path strings into filesystem locations.
//!
//! There are two entry points with deliberately different policies:
//!
//! - [`resolve`] is used for single-file opens. It joins relative paths under the project root
//!   and checks existence. It does **not** confine the result to the project root.
//! - [`resolve_confined`] / [`confine_batch`] are used for drag and drop. They normalize the
//!   candidate and the root and keep only candidates inside the root. Existence is not checked.
//!
//! Host callers depend on both behaviors; keep them distinct.

use std::fmt;
use std::path::{Component, Path, PathBuf};


/// An absolute, normalized location that existed when it was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedPath {
    path: PathBuf,
    project_root: PathBuf,
}

impl ResolvedPath {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.path
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// A normalized location known to lie strictly inside a root directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfinedPath {
    path: PathBuf,
    relative: PathBuf,
}

impl ConfinedPath {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn relative(&self) -> &Path {
        &self.relative
    }

    /// Root-relative path with `/` separators regardless of platform.
    pub fn relative_slash(&self) -> String {
        self.relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    EmptyPath,
    NotFound {
        absolute: PathBuf,
        project_root: PathBuf,
        raw: String,
    },
    OutsideRoot {
        candidate: PathBuf,
        root: PathBuf,
    },
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPath => f.write_str("file path is empty"),
            Self::NotFound {
                absolute,
                project_root,
                raw,
            } => write!(
                f,
                "file not found: {} (root {}, requested {raw:?})",
                absolute.display(),
                project_root.display()
            ),
            Self::OutsideRoot { candidate, root } => write!(
                f,
                "path {} is outside of {}",
                candidate.display(),
                root.display()
            ),
        }
    }
}

impl std::error::Error for ResolveError {}

/// Lexically normalizes `path`: drops `.` segments and folds `..` into the preceding segment.
///
/// `..` never climbs above the root of an absolute path. Leading `..` segments of a relative
/// path are kept. The filesystem is not consulted, so symlinks are not followed.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                Some(Component::ParentDir) | Some(Component::CurDir) | None => {
                    out.push(Component::ParentDir);
                }
            },
            other => out.push(other),
        }
    }
    out.iter().map(|component| component.as_os_str()).collect()
}

fn absolutize(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path,
    }
}

fn join_under_root(candidate: &Path, project_root: &Path) -> PathBuf {
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        project_root.join(candidate)
    }
}

/// Existence-only resolution used by single-file opens.
///
/// Existence is checked on the joined path as written, so `missing/../f.txt` is not found even
/// when `f.txt` exists. The returned location is the normalized form.
pub fn resolve(raw: &str, project_root: &Path) -> Result<ResolvedPath, ResolveError> {
    if raw.is_empty() {
        return Err(ResolveError::EmptyPath);
    }

    let joined = absolutize(join_under_root(Path::new(raw), project_root));
    let absolute = normalize(&joined);
    if !joined.exists() {
        return Err(ResolveError::NotFound {
            absolute,
            project_root: project_root.to_path_buf(),
            raw: raw.to_owned(),
        });
    }

    Ok(ResolvedPath {
        path: absolute,
        project_root: project_root.to_path_buf(),
    })
}

/// Confinement-only resolution used by drag and drop.
///
/// The root itself is not a valid candidate; only paths strictly below it are accepted.
pub fn resolve_confined(
    raw: impl AsRef<Path>,
    project_root: &Path,
) -> Result<ConfinedPath, ResolveError> {
    let raw = raw.as_ref();
    if raw.as_os_str().is_empty() {
        return Err(ResolveError::EmptyPath);
    }

    let root = normalize(&absolutize(project_root.to_path_buf()));
    let candidate = normalize(&absolutize(join_under_root(raw, &root)));

    match candidate.strip_prefix(&root) {
        Ok(relative) if !relative.as_os_str().is_empty() => Ok(ConfinedPath {
            relative: relative.to_path_buf(),
            path: candidate,
        }),
        _ => Err(ResolveError::OutsideRoot { candidate, root }),
    }
}

/// Confines a batch of candidates, silently dropping the ones outside `project_root`.
///
/// Input order is preserved for the survivors.
pub fn confine_batch<I, P>(candidates: I, project_root: &Path) -> Vec<ConfinedPath>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    candidates
        .into_iter()
        .filter_map(|candidate| match resolve_confined(candidate.as_ref(), project_root) {
            Ok(confined) => Some(confined),
            Err(err) => {
                tracing::debug!(%err, "dropping candidate outside project root");
                None
            }
        })
        .collect()
}
