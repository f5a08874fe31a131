// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Panebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The embedded browser widget, as seen by the bridge.
//!
//! Rendering and navigation belong to the widget. The bridge only needs URL loading, history,
//! script execution, a message channel for queries from the page, and teardown.

use std::fmt;
use std::sync::Arc;

/// Handles one query from embedded content and returns the reply string.
pub type QueryHandler = Arc<dyn Fn(Option<&str>) -> String + Send + Sync>;

/// Registration of a [`QueryHandler`] on a widget's message channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetError {
    Closed,
    UnknownHandler(HandlerId),
    Engine(String),
}

impl fmt::Display for WidgetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => f.write_str("widget is closed"),
            Self::UnknownHandler(id) => write!(f, "no message handler registered as #{}", id.0),
            Self::Engine(message) => write!(f, "browser engine error: {message}"),
        }
    }
}

impl std::error::Error for WidgetError {}

pub trait Widget {
    fn load_url(&mut self, url: &str) -> Result<(), WidgetError>;

    fn can_go_back(&self) -> bool;

    fn can_go_forward(&self) -> bool;

    fn go_back(&mut self) -> Result<(), WidgetError>;

    fn go_forward(&mut self) -> Result<(), WidgetError>;

    fn execute_script(&mut self, script: &str) -> Result<(), WidgetError>;

    fn open_dev_tools(&mut self) -> Result<(), WidgetError> {
        Ok(())
    }

    fn add_message_handler(&mut self, handler: QueryHandler) -> Result<HandlerId, WidgetError>;

    fn remove_message_handler(&mut self, id: HandlerId) -> Result<(), WidgetError>;

    fn stop_load(&mut self) -> Result<(), WidgetError>;

    fn close(&mut self) -> Result<(), WidgetError>;

    /// Releases the resource that owns the widget (the native browser instance).
    fn release(&mut self) -> Result<(), WidgetError>;
}

/// Navigation callbacks from the browser engine. These may arrive off the UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent {
    LoadingStateChanged {
        is_loading: bool,
        can_go_back: bool,
        can_go_forward: bool,
    },
    LoadEnded {
        http_status: i32,
    },
    LoadError {
        code: i32,
        text: String,
        failed_url: String,
    },
    AddressChanged {
        url: String,
    },
    PopupRequested {
        target_url: String,
    },
}

pub trait WidgetFactory {
    type Widget: Widget;

    fn create(&self, initial_url: &str) -> Result<Self::Widget, WidgetError>;
}

/// Result of probing for an embedded browser engine. Probed once at startup.
#[derive(Debug)]
pub enum EngineSupport<F> {
    Supported(F),
    Unsupported { reason: String },
}

impl<F> EngineSupport<F> {
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Supported(_))
    }
}

pub const UNSUPPORTED_ENGINE_MESSAGE: &str = "The embedded browser is not supported in the running host";

/// Runs the engine probe and turns its outcome into an [`EngineSupport`].
pub fn negotiate<F>(probe: impl FnOnce() -> Result<F, WidgetError>) -> EngineSupport<F> {
    match probe() {
        Ok(factory) => EngineSupport::Supported(factory),
        Err(err) => {
            tracing::info!(%err, "embedded browser engine unavailable");
            EngineSupport::Unsupported {
                reason: err.to_string(),
            }
        }
    }
}
