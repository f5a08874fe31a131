// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Panebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Panebridge: host bridge for an embedded web panel.
//!
//! Embedded content sends `//`-separated string commands; the bridge resolves file arguments,
//! schedules host actions on the UI loop and replies immediately. The attachment of the bridge
//! to the widget's message channel follows the panel's show/hide/dispose lifecycle.

pub mod bridge;
pub mod channel;
pub mod config;
pub mod host;
pub mod path;
pub mod progress;
pub mod protocol;
pub mod session;
pub mod ui_loop;
pub mod widget;
