// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Panebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Explicit project/session handle.
//!
//! The handle is passed into the resolver, the protocol and host capabilities at construction
//! time. Scheduled UI actions consult [`SessionHandle::is_disposed`] right before acting.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct SessionInner {
    name: String,
    project_root: PathBuf,
    disposed: AtomicBool,
}

/// A cheaply cloneable reference to one open project.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<SessionInner>,
}

impl SessionHandle {
    pub fn new(name: impl Into<String>, project_root: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                name: name.into(),
                project_root: project_root.into(),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn project_root(&self) -> &Path {
        &self.inner.project_root
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Marks the session closed. Returns `false` if it was already disposed.
    pub fn dispose(&self) -> bool {
        !self.inner.disposed.swap(true, Ordering::AcqRel)
    }

    pub fn same_session(&self, other: &SessionHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("name", &self.inner.name)
            .field("project_root", &self.inner.project_root)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
