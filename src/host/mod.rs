// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Panebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Host capabilities consumed by the command protocol.
//!
//! Lookups happen on the caller's thread. `open_file` and `open_diff` are only ever invoked from
//! the UI loop, after the session has been checked for disposal.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::session::SessionHandle;

pub trait HostCapabilities: Send + Sync + 'static {
    /// Host-side file handle, e.g. a virtual-file-system entry.
    type Handle: Clone + Send + 'static;

    fn resolve_virtual_handle(&self, absolute_path: &Path) -> Option<Self::Handle>;

    /// Whether `handle` is still usable. Checked right before a deferred action runs.
    fn is_valid(&self, _handle: &Self::Handle) -> bool {
        true
    }

    fn open_file(&self, session: &SessionHandle, file: &Self::Handle);

    fn open_diff(&self, session: &SessionHandle, left: &Self::Handle, right: &Self::Handle);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostAction {
    OpenFile(PathBuf),
    OpenDiff { left: PathBuf, right: PathBuf },
}

/// Number of recent actions a [`LocalHost`] keeps.
pub const ACTION_HISTORY_LIMIT: usize = 256;

/// Filesystem-backed host for headless use. Handles are plain paths; opened files are logged and
/// the most recent [`ACTION_HISTORY_LIMIT`] actions are kept.
#[derive(Debug, Default)]
pub struct LocalHost {
    actions: Mutex<VecDeque<HostAction>>,
}

impl LocalHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recent actions, oldest first.
    pub fn actions(&self) -> Vec<HostAction> {
        match self.actions.lock() {
            Ok(actions) => actions.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    fn record(&self, action: HostAction) {
        let mut actions = match self.actions.lock() {
            Ok(actions) => actions,
            Err(poisoned) => poisoned.into_inner(),
        };
        if actions.len() == ACTION_HISTORY_LIMIT {
            actions.pop_front();
        }
        actions.push_back(action);
    }
}

impl HostCapabilities for LocalHost {
    type Handle = PathBuf;

    fn resolve_virtual_handle(&self, absolute_path: &Path) -> Option<PathBuf> {
        absolute_path.exists().then(|| absolute_path.to_path_buf())
    }

    fn is_valid(&self, handle: &PathBuf) -> bool {
        handle.exists()
    }

    fn open_file(&self, session: &SessionHandle, file: &PathBuf) {
        tracing::info!(session = session.name(), path = %file.display(), "open file");
        self.record(HostAction::OpenFile(file.clone()));
    }

    fn open_diff(&self, session: &SessionHandle, left: &PathBuf, right: &PathBuf) {
        tracing::info!(
            session = session.name(),
            left = %left.display(),
            right = %right.display(),
            "open diff"
        );
        self.record(HostAction::OpenDiff {
            left: left.clone(),
            right: right.clone(),
        });
    }
}
