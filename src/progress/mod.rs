// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Panebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Synthetic page-load progress.
//!
//! The browser engine only reports "loading" / "not loading", so the indicator shows a random
//! value strictly inside `(0.1, 0.8)` for the duration of one loading episode. `0.0` means idle;
//! `1.0` is never emitted.

use std::sync::{Arc, Mutex, MutexGuard};

use rand::Rng;
use serde::Serialize;

use crate::widget::NavigationEvent;

pub const LOADING_MIN: f64 = 0.1;
pub const LOADING_MAX: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum ProgressState {
    Idle,
    Loading(f64),
}

impl ProgressState {
    pub fn value(self) -> f64 {
        match self {
            Self::Idle => 0.0,
            Self::Loading(value) => value,
        }
    }

    pub fn is_loading(self) -> bool {
        matches!(self, Self::Loading(_))
    }
}

type Observer = Arc<dyn Fn(ProgressState) + Send + Sync>;
type Sampler = Box<dyn FnMut() -> f64 + Send>;

struct Inner {
    state: ProgressState,
    sampler: Sampler,
    observer: Option<Observer>,
}

/// Serializes load callbacks into progress states.
///
/// The observer is called after the state lock is released, so it may read the synthesizer. It
/// must not drive transitions itself.
pub struct ProgressSynthesizer {
    inner: Mutex<Inner>,
    // Held across state change and notification so observers see transition order.
    emit: Mutex<()>,
}

impl Default for ProgressSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProgressSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSynthesizer")
            .field("state", &self.state())
            .finish()
    }
}

fn sample_loading_value() -> f64 {
    let mut rng = rand::rng();
    loop {
        let value = rng.random_range(LOADING_MIN..LOADING_MAX);
        if value > LOADING_MIN {
            return value;
        }
    }
}

impl ProgressSynthesizer {
    pub fn new() -> Self {
        Self::with_sampler(sample_loading_value)
    }

    /// Uses `sampler` to pick the value of each loading episode. It must return values inside
    /// `(LOADING_MIN, LOADING_MAX)`.
    pub fn with_sampler(sampler: impl FnMut() -> f64 + Send + 'static) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: ProgressState::Idle,
                sampler: Box::new(sampler),
                observer: None,
            }),
            emit: Mutex::new(()),
        }
    }

    /// Registers the observer that receives every emitted state. Replaces any previous one.
    pub fn set_observer(&self, observer: impl Fn(ProgressState) + Send + Sync + 'static) {
        self.with_inner(|inner| inner.observer = Some(Arc::new(observer)));
    }

    pub fn clear_observer(&self) {
        self.with_inner(|inner| inner.observer = None);
    }

    pub fn state(&self) -> ProgressState {
        self.with_inner(|inner| inner.state)
    }

    pub fn on_loading_changed(&self, is_loading: bool) -> ProgressState {
        self.transition(|inner| {
            if !is_loading {
                return ProgressState::Idle;
            }
            match inner.state {
                ProgressState::Idle => ProgressState::Loading((inner.sampler)()),
                loading @ ProgressState::Loading(_) => loading,
            }
        })
    }

    pub fn on_load_ended(&self) -> ProgressState {
        self.transition(|_| ProgressState::Idle)
    }

    pub fn on_load_error(&self) -> ProgressState {
        self.transition(|_| ProgressState::Idle)
    }

    /// Feeds a navigation event. Returns the new state for load-related events.
    pub fn on_navigation(&self, event: &NavigationEvent) -> Option<ProgressState> {
        match event {
            NavigationEvent::LoadingStateChanged { is_loading, .. } => {
                Some(self.on_loading_changed(*is_loading))
            }
            NavigationEvent::LoadEnded { .. } => Some(self.on_load_ended()),
            NavigationEvent::LoadError { .. } => Some(self.on_load_error()),
            NavigationEvent::AddressChanged { .. } | NavigationEvent::PopupRequested { .. } => None,
        }
    }

    fn transition(&self, next: impl FnOnce(&mut Inner) -> ProgressState) -> ProgressState {
        let _emitting = self.emit_guard();
        let (state, observer) = self.with_inner(|inner| {
            inner.state = next(inner);
            (inner.state, inner.observer.clone())
        });
        if let Some(observer) = observer {
            observer(state);
        }
        state
    }

    fn emit_guard(&self) -> MutexGuard<'_, ()> {
        match self.emit.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn with_inner<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        match self.inner.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

/// How a progress value is shown: hidden at exactly `0` or `1`, otherwise a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressIndicator {
    pub visible: bool,
    pub percent: u8,
}

impl ProgressIndicator {
    pub fn from_value(value: f64) -> Self {
        let clamped = value.clamp(0.0, 1.0);
        Self {
            visible: clamped != 0.0 && clamped != 1.0,
            percent: (clamped * 100.0) as u8,
        }
    }
}
