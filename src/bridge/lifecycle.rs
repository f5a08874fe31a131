// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Panebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use crate::widget::{HandlerId, QueryHandler, Widget, WidgetError};

pub const HIDE_SCRIPT: &str = "onPluginHide();";
pub const SHOW_SCRIPT: &str = "onPluginShow();";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    Detached,
    Attached(HandlerId),
}

/// Owns the widget and the registration of the query handler on its message channel.
///
/// All transitions are expected on the UI context. None of them fail: widget errors are logged
/// and teardown always runs to completion.
pub struct BridgeLifecycle<W: Widget> {
    widget: W,
    handler: QueryHandler,
    attachment: Attachment,
    started: bool,
    disposed: bool,
}

impl<W: Widget> BridgeLifecycle<W> {
    pub fn new(widget: W, handler: QueryHandler) -> Self {
        Self {
            widget,
            handler,
            attachment: Attachment::Detached,
            started: false,
            disposed: false,
        }
    }

    pub fn attachment(&self) -> Attachment {
        self.attachment
    }

    pub fn is_attached(&self) -> bool {
        matches!(self.attachment, Attachment::Attached(_))
    }

    /// Whether `show` has run at least once.
    pub fn has_started(&self) -> bool {
        self.started
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn widget(&self) -> &W {
        &self.widget
    }

    pub fn widget_mut(&mut self) -> &mut W {
        &mut self.widget
    }

    /// Registers a fresh handler, replacing any existing registration first.
    pub fn attach(&mut self) {
        if self.disposed {
            tracing::debug!("bridge disposed, not attaching");
            return;
        }

        self.unregister();
        match self.widget.add_message_handler(self.handler.clone()) {
            Ok(id) => {
                tracing::debug!(handler = id.get(), "bridge attached");
                self.attachment = Attachment::Attached(id);
            }
            Err(err) => warn_widget_error("attach", &err),
        }
    }

    /// Unregisters the handler and tells the page it was hidden. No-op when detached.
    pub fn detach(&mut self) {
        if !self.is_attached() {
            return;
        }
        self.unregister();
        self.run_script(HIDE_SCRIPT);
    }

    /// Attaches whenever the bridge is detached, then tells the page it is shown.
    ///
    /// This covers the first activation and also every show after a hide, so page commands keep
    /// working once the panel is shown again.
    pub fn show(&mut self) {
        if self.disposed {
            return;
        }
        self.started = true;
        if !self.is_attached() {
            self.attach();
        }
        self.run_script(SHOW_SCRIPT);
    }

    pub fn hide(&mut self) {
        self.detach();
    }

    /// Detaches, stops navigation, closes the widget and releases it. Runs once.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.detach();
        if let Err(err) = self.widget.stop_load() {
            warn_widget_error("stop load", &err);
        }
        if let Err(err) = self.widget.close() {
            warn_widget_error("close", &err);
        }
        if let Err(err) = self.widget.release() {
            warn_widget_error("release", &err);
        }
        self.disposed = true;
    }

    pub(crate) fn run_script(&mut self, script: &str) {
        if self.disposed {
            return;
        }
        if let Err(err) = self.widget.execute_script(script) {
            warn_widget_error("execute script", &err);
        }
    }

    fn unregister(&mut self) {
        if let Attachment::Attached(id) = self.attachment {
            if let Err(err) = self.widget.remove_message_handler(id) {
                warn_widget_error("detach", &err);
            }
            tracing::debug!(handler = id.get(), "bridge detached");
        }
        self.attachment = Attachment::Detached;
    }
}

fn warn_widget_error(step: &'static str, err: &WidgetError) {
    tracing::warn!(step, %err, "widget error ignored");
}
