// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Panebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Message channel for hosts without a native browser engine.
//!
//! [`MessageRouter`] is the handler registry behind a widget's message channel. [`HeadlessWidget`]
//! implements [`Widget`] on top of it, and [`query_router`] exposes it over loopback HTTP as
//! `POST /query` (request body in, reply body out).

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;

use crate::widget::{HandlerId, QueryHandler, Widget, WidgetError};


pub const NO_HANDLER_REPLY: &str = "error:no_handler";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[derive(Default)]
pub struct MessageRouter {
    handlers: Mutex<BTreeMap<HandlerId, QueryHandler>>,
    next_id: AtomicU64,
}

impl fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageRouter")
            .field("handlers", &self.handler_count())
            .finish()
    }
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, handler: QueryHandler) -> HandlerId {
        let id = HandlerId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.handlers).insert(id, handler);
        id
    }

    pub fn remove(&self, id: HandlerId) -> bool {
        lock(&self.handlers).remove(&id).is_some()
    }

    pub fn handler_count(&self) -> usize {
        lock(&self.handlers).len()
    }

    /// Delivers a query to the oldest registered handler. `None` when nothing is registered.
    pub fn deliver(&self, raw: Option<&str>) -> Option<String> {
        // Clone the handler out so it runs without the registry lock held.
        let handler = lock(&self.handlers).values().next().cloned()?;
        Some(handler(raw))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WidgetLog {
    pub loaded_urls: Vec<String>,
    pub scripts: Vec<String>,
    pub dev_tools_opened: usize,
    pub stop_loads: usize,
    pub closed: bool,
    pub released: bool,
}

#[derive(Debug, Default)]
struct HeadlessState {
    log: WidgetLog,
    history: Vec<String>,
    position: usize,
}

/// A widget without rendering. Clones share state, so a clone can observe a widget that has been
/// moved into a bridge.
#[derive(Debug, Clone, Default)]
pub struct HeadlessWidget {
    router: Arc<MessageRouter>,
    state: Arc<Mutex<HeadlessState>>,
}

impl HeadlessWidget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn router(&self) -> Arc<MessageRouter> {
        self.router.clone()
    }

    pub fn log(&self) -> WidgetLog {
        lock(&self.state).log.clone()
    }

    pub fn current_url(&self) -> Option<String> {
        let state = lock(&self.state);
        state.history.get(state.position).cloned()
    }

    /// Simulates a query sent by the page.
    pub fn query(&self, raw: Option<&str>) -> String {
        self.router
            .deliver(raw)
            .unwrap_or_else(|| NO_HANDLER_REPLY.to_owned())
    }

    fn live(&self) -> Result<MutexGuard<'_, HeadlessState>, WidgetError> {
        let state = lock(&self.state);
        if state.log.closed {
            return Err(WidgetError::Closed);
        }
        Ok(state)
    }
}

impl Widget for HeadlessWidget {
    fn load_url(&mut self, url: &str) -> Result<(), WidgetError> {
        let mut state = self.live()?;
        let keep = if state.history.is_empty() { 0 } else { state.position + 1 };
        state.history.truncate(keep);
        state.history.push(url.to_owned());
        state.position = state.history.len() - 1;
        state.log.loaded_urls.push(url.to_owned());
        tracing::debug!(url, "headless widget navigated");
        Ok(())
    }

    fn can_go_back(&self) -> bool {
        lock(&self.state).position > 0
    }

    fn can_go_forward(&self) -> bool {
        let state = lock(&self.state);
        state.position + 1 < state.history.len()
    }

    fn go_back(&mut self) -> Result<(), WidgetError> {
        let mut state = self.live()?;
        state.position = state.position.saturating_sub(1);
        Ok(())
    }

    fn go_forward(&mut self) -> Result<(), WidgetError> {
        let mut state = self.live()?;
        if state.position + 1 < state.history.len() {
            state.position += 1;
        }
        Ok(())
    }

    fn execute_script(&mut self, script: &str) -> Result<(), WidgetError> {
        self.live()?.log.scripts.push(script.to_owned());
        tracing::debug!(script, "headless widget script");
        Ok(())
    }

    fn open_dev_tools(&mut self) -> Result<(), WidgetError> {
        self.live()?.log.dev_tools_opened += 1;
        Ok(())
    }

    fn add_message_handler(&mut self, handler: QueryHandler) -> Result<HandlerId, WidgetError> {
        let _state = self.live()?;
        Ok(self.router.add(handler))
    }

    fn remove_message_handler(&mut self, id: HandlerId) -> Result<(), WidgetError> {
        if self.router.remove(id) {
            Ok(())
        } else {
            Err(WidgetError::UnknownHandler(id))
        }
    }

    fn stop_load(&mut self) -> Result<(), WidgetError> {
        self.live()?.log.stop_loads += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), WidgetError> {
        self.live()?.log.closed = true;
        Ok(())
    }

    fn release(&mut self) -> Result<(), WidgetError> {
        let mut state = lock(&self.state);
        if state.log.released {
            return Err(WidgetError::Closed);
        }
        state.log.released = true;
        Ok(())
    }
}

#[derive(Debug)]
pub enum ChannelError {
    Bind { addr: String, source: io::Error },
    Serve { source: io::Error },
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind { addr, source } => write!(f, "cannot bind query channel on {addr}: {source}"),
            Self::Serve { source } => write!(f, "query channel server error: {source}"),
        }
    }
}

impl std::error::Error for ChannelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bind { source, .. } | Self::Serve { source } => Some(source),
        }
    }
}

pub fn query_router(router: Arc<MessageRouter>) -> Router {
    Router::new()
        .route("/query", post(handle_query))
        .route("/health", get(|| async { "ok" }))
        .with_state(router)
}

async fn handle_query(State(router): State<Arc<MessageRouter>>, body: String) -> impl IntoResponse {
    match router.deliver(Some(&body)) {
        Some(reply) => (StatusCode::OK, reply),
        None => (StatusCode::SERVICE_UNAVAILABLE, NO_HANDLER_REPLY.to_owned()),
    }
}

/// Binds `127.0.0.1:<port>` (0 picks a free port).
pub async fn bind_loopback(port: u16) -> Result<TcpListener, ChannelError> {
    let addr = format!("127.0.0.1:{port}");
    TcpListener::bind(&addr)
        .await
        .map_err(|source| ChannelError::Bind { addr, source })
}

pub async fn serve_query_channel(
    listener: TcpListener,
    router: Arc<MessageRouter>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ChannelError> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "query channel listening");
    }
    axum::serve(listener, query_router(router))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|source| ChannelError::Serve { source })
}
