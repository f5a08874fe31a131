// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Panebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The bridge between embedded content and the host.
//!
//! [`BridgeLifecycle`] owns the message-channel registration. [`BrowserPanel`] wires the lifecycle
//! together with the command protocol, the progress heuristic, config-driven navigation and drag
//! and drop.

mod lifecycle;

#[cfg(test)]
mod tests;

use std::path::Path;
use std::sync::Arc;

pub use lifecycle::{Attachment, BridgeLifecycle, HIDE_SCRIPT, SHOW_SCRIPT};

use crate::config::{ServerConfig, SharedConfig};
use crate::host::HostCapabilities;
use crate::path::confine_batch;
use crate::progress::{ProgressIndicator, ProgressSynthesizer};
use crate::protocol::CommandProtocol;
use crate::ui_loop::UiScheduler;
use crate::widget::{NavigationEvent, Widget};

pub const BLANK_URL: &str = "about:blank";

type UrlObserver = Box<dyn Fn(&str) + Send + Sync>;

pub struct BrowserPanel<W: Widget, H: HostCapabilities> {
    lifecycle: BridgeLifecycle<W>,
    protocol: Arc<CommandProtocol<H>>,
    progress: Arc<ProgressSynthesizer>,
    config: Arc<SharedConfig>,
    scheduler: UiScheduler,
    url_observer: Option<UrlObserver>,
}

impl<W: Widget, H: HostCapabilities> BrowserPanel<W, H> {
    /// Builds the panel and navigates to the configured server. The bridge stays detached until
    /// the first [`BrowserPanel::show`].
    pub fn new(
        widget: W,
        protocol: CommandProtocol<H>,
        config: Arc<SharedConfig>,
        scheduler: UiScheduler,
    ) -> Self {
        let protocol = Arc::new(protocol);
        let lifecycle = BridgeLifecycle::new(widget, protocol.clone().into_handler());
        let mut panel = Self {
            lifecycle,
            protocol,
            progress: Arc::new(ProgressSynthesizer::new()),
            config,
            scheduler,
            url_observer: None,
        };
        panel.load_app();
        panel
    }

    pub fn lifecycle(&self) -> &BridgeLifecycle<W> {
        &self.lifecycle
    }

    pub fn protocol(&self) -> &Arc<CommandProtocol<H>> {
        &self.protocol
    }

    /// Shared with engine callbacks, which may run off the UI thread.
    pub fn progress(&self) -> Arc<ProgressSynthesizer> {
        self.progress.clone()
    }

    pub fn config(&self) -> ServerConfig {
        self.config.current()
    }

    /// Re-reads the config and (re)loads the content server.
    pub fn load_app(&mut self) -> ServerConfig {
        let config = self.config.reload();
        let url = config.server_url();
        tracing::info!(%url, "loading panel content");
        for target in [BLANK_URL, url.as_str()] {
            if let Err(err) = self.lifecycle.widget_mut().load_url(target) {
                tracing::warn!(url = target, %err, "cannot load url");
            }
        }
        config
    }

    pub fn back(&mut self) {
        let widget = self.lifecycle.widget_mut();
        if widget.can_go_back() {
            if let Err(err) = widget.go_back() {
                tracing::warn!(%err, "cannot go back");
            }
        }
    }

    pub fn forward(&mut self) {
        let widget = self.lifecycle.widget_mut();
        if widget.can_go_forward() {
            if let Err(err) = widget.go_forward() {
                tracing::warn!(%err, "cannot go forward");
            }
        }
    }

    pub fn open_dev_tools(&mut self) {
        if let Err(err) = self.lifecycle.widget_mut().open_dev_tools() {
            tracing::warn!(%err, "cannot open dev tools");
        }
    }

    pub fn on_url_change(&mut self, observer: impl Fn(&str) + Send + Sync + 'static) {
        self.url_observer = Some(Box::new(observer));
    }

    /// Delivers progress indicator updates on the UI context.
    pub fn on_progress_indicator(
        &self,
        observer: impl Fn(ProgressIndicator) + Send + Sync + 'static,
    ) {
        let observer = Arc::new(observer);
        let scheduler = self.scheduler.clone();
        self.progress.set_observer(move |state| {
            let observer = observer.clone();
            let indicator = ProgressIndicator::from_value(state.value());
            scheduler.invoke_on_ui(move || observer(indicator));
        });
    }

    /// Handles a navigation callback. Popups are loaded in place instead of opening a window.
    pub fn on_navigation(&mut self, event: NavigationEvent) {
        if self.progress.on_navigation(&event).is_some() {
            return;
        }
        match event {
            NavigationEvent::AddressChanged { url } => {
                if let Some(observer) = &self.url_observer {
                    observer(&url);
                }
            }
            NavigationEvent::PopupRequested { target_url } => {
                if let Err(err) = self.lifecycle.widget_mut().load_url(&target_url) {
                    tracing::warn!(url = %target_url, %err, "cannot load popup target");
                }
            }
            NavigationEvent::LoadingStateChanged { .. }
            | NavigationEvent::LoadEnded { .. }
            | NavigationEvent::LoadError { .. } => {}
        }
    }

    pub fn on_visibility_changed(&mut self, visible: bool) {
        if visible {
            self.show();
        } else {
            self.hide();
        }
    }

    pub fn show(&mut self) {
        self.lifecycle.show();
    }

    pub fn hide(&mut self) {
        self.lifecycle.hide();
    }

    /// Stops progress notifications and tears the bridge down.
    pub fn dispose(&mut self) {
        self.progress.clear_observer();
        self.lifecycle.dispose();
    }

    /// Passes dropped files inside the project root to the page as `@file <relative>` mentions.
    /// Files outside the root are dropped silently. Returns the script that was run, if any.
    pub fn on_files_dropped<P: AsRef<Path>>(&mut self, files: &[P]) -> Option<String> {
        if self.lifecycle.is_disposed() {
            return None;
        }
        let root = self.protocol.session().project_root().to_path_buf();
        let message: String = confine_batch(files, &root)
            .iter()
            .map(|file| format!("@file {} ", file.relative_slash()))
            .collect();
        if message.is_empty() {
            return None;
        }

        let script = format!("onFilesDrag('{}')", escape_js_single_quoted(&message));
        self.lifecycle.run_script(&script);
        Some(script)
    }
}

/// Escapes `value` for use inside a single-quoted JavaScript string literal.
pub fn escape_js_single_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            '<' => out.push_str("\\x3c"),
            ch if ch.is_control() => out.push_str(&format!("\\u{:04x}", ch as u32)),
            ch => out.push(ch),
        }
    }
    out
}
