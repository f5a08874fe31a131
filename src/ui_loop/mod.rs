// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Panebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The host's UI/main execution context.
//!
//! [`UiScheduler`] can be cloned into any thread and posts work; [`UiLoop`] is drained on the UI
//! context. [`UiScheduler::invoke_later`] never runs work inline, even when called from the UI
//! context itself.

use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use tokio::sync::mpsc;

use crate::session::SessionHandle;

type UiTask = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Default)]
struct UiShared {
    ui_thread: Mutex<Option<ThreadId>>,
}

impl UiShared {
    fn bind_current_thread(&self) {
        let current = thread::current().id();
        match self.ui_thread.lock() {
            Ok(mut guard) => *guard = Some(current),
            Err(poisoned) => *poisoned.into_inner() = Some(current),
        }
    }

    fn is_current_thread(&self) -> bool {
        let bound = match self.ui_thread.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        };
        bound == Some(thread::current().id())
    }
}

/// Creates a connected scheduler/loop pair. The calling thread becomes the UI context until
/// [`UiLoop::run_pending`] or [`UiLoop::run`] is called from another thread.
pub fn ui_loop() -> (UiScheduler, UiLoop) {
    let (tx, rx) = mpsc::unbounded_channel();
    let shared = Arc::new(UiShared::default());
    shared.bind_current_thread();
    (
        UiScheduler {
            tx,
            shared: shared.clone(),
        },
        UiLoop { rx, shared },
    )
}

#[derive(Clone)]
pub struct UiScheduler {
    tx: mpsc::UnboundedSender<UiTask>,
    shared: Arc<UiShared>,
}

impl std::fmt::Debug for UiScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiScheduler")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl UiScheduler {
    pub fn is_ui_context(&self) -> bool {
        self.shared.is_current_thread()
    }

    /// Queues `task` for the UI loop. Returns `false` if the loop is gone.
    pub fn invoke_later(&self, task: impl FnOnce() + Send + 'static) -> bool {
        if self.tx.send(Box::new(task)).is_err() {
            tracing::debug!("ui loop closed, dropping task");
            return false;
        }
        true
    }

    /// Queues `task` on behalf of `session`. The task is skipped silently if the session is
    /// disposed either now or by the time the loop gets to it.
    pub fn invoke_later_for(
        &self,
        session: &SessionHandle,
        task: impl FnOnce() + Send + 'static,
    ) -> bool {
        if session.is_disposed() {
            tracing::debug!(session = session.name(), "session disposed, not scheduling");
            return false;
        }

        let session = session.clone();
        self.invoke_later(move || {
            if session.is_disposed() {
                tracing::debug!(session = session.name(), "session disposed, skipping task");
                return;
            }
            task();
        })
    }

    /// Runs `task` inline when already on the UI context, otherwise queues it.
    pub fn invoke_on_ui(&self, task: impl FnOnce() + Send + 'static) {
        if self.is_ui_context() {
            task();
        } else {
            self.invoke_later(task);
        }
    }
}

pub struct UiLoop {
    rx: mpsc::UnboundedReceiver<UiTask>,
    shared: Arc<UiShared>,
}

impl UiLoop {
    /// Runs every task queued so far on the current thread and returns how many ran.
    ///
    /// Tasks queued by the tasks themselves are run too.
    pub fn run_pending(&mut self) -> usize {
        self.shared.bind_current_thread();
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Runs tasks as they arrive until every scheduler has been dropped.
    pub async fn run(mut self) {
        self.shared.bind_current_thread();
        while let Some(task) = self.rx.recv().await {
            task();
        }
    }
}
