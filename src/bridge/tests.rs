// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Panebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use rstest::{fixture, rstest};

use super::{
    escape_js_single_quoted, Attachment, BridgeLifecycle, BrowserPanel, BLANK_URL, HIDE_SCRIPT,
    SHOW_SCRIPT,
};
use crate::channel::{HeadlessWidget, NO_HANDLER_REPLY};
use crate::config::{ConfigLoader, SharedConfig};
use crate::host::{HostAction, LocalHost};
use crate::progress::ProgressIndicator;
use crate::protocol::CommandProtocol;
use crate::session::SessionHandle;
use crate::ui_loop::{ui_loop, UiLoop};
use crate::widget::{NavigationEvent, QueryHandler, Widget};

static TEMP_DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

struct TempDir {
    path: PathBuf,
}

impl TempDir {
    fn new(prefix: &str) -> Self {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
        let counter = TEMP_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut path = std::env::temp_dir();
        path.push(format!("panebridge-{prefix}-{}-{nanos}-{counter}", std::process::id()));
        std::fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

fn counting_handler(calls: Arc<AtomicUsize>) -> QueryHandler {
    Arc::new(move |_raw: Option<&str>| {
        calls.fetch_add(1, Ordering::SeqCst);
        "success".to_owned()
    })
}

#[test]
fn attach_twice_keeps_one_registration() {
    let widget = HeadlessWidget::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let mut bridge = BridgeLifecycle::new(widget.clone(), counting_handler(calls.clone()));

    bridge.attach();
    let Attachment::Attached(first) = bridge.attachment() else {
        panic!("expected attached");
    };
    bridge.attach();
    let Attachment::Attached(second) = bridge.attachment() else {
        panic!("expected attached");
    };
    assert_ne!(first, second);
    assert_eq!(widget.router().handler_count(), 1);

    assert_eq!(widget.query(Some("anything")), "success");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn detach_notifies_once_and_is_idempotent() {
    let widget = HeadlessWidget::new();
    let mut bridge = BridgeLifecycle::new(widget.clone(), counting_handler(Arc::default()));

    bridge.detach();
    assert!(widget.log().scripts.is_empty());

    bridge.attach();
    bridge.detach();
    bridge.detach();
    assert_eq!(bridge.attachment(), Attachment::Detached);
    assert_eq!(widget.router().handler_count(), 0);
    assert_eq!(widget.log().scripts, vec![HIDE_SCRIPT.to_owned()]);
    assert_eq!(widget.query(Some("x")), NO_HANDLER_REPLY);
}

#[test]
fn show_attaches_on_first_activation_and_always_notifies() {
    let widget = HeadlessWidget::new();
    let mut bridge = BridgeLifecycle::new(widget.clone(), counting_handler(Arc::default()));
    assert!(!bridge.has_started());

    bridge.show();
    let attached = bridge.attachment();
    assert!(bridge.has_started());
    assert!(bridge.is_attached());

    bridge.show();
    assert_eq!(bridge.attachment(), attached);
    assert_eq!(widget.router().handler_count(), 1);
    assert_eq!(widget.log().scripts, vec![SHOW_SCRIPT.to_owned(), SHOW_SCRIPT.to_owned()]);
}

#[test]
fn show_after_hide_reattaches() {
    let widget = HeadlessWidget::new();
    let mut bridge = BridgeLifecycle::new(widget.clone(), counting_handler(Arc::default()));

    bridge.show();
    bridge.hide();
    assert!(!bridge.is_attached());
    bridge.show();
    assert!(bridge.is_attached());
    assert_eq!(widget.router().handler_count(), 1);
    assert_eq!(
        widget.log().scripts,
        vec![SHOW_SCRIPT.to_owned(), HIDE_SCRIPT.to_owned(), SHOW_SCRIPT.to_owned()]
    );
}

#[test]
fn dispose_tears_down_in_order_and_twice_is_safe() {
    let widget = HeadlessWidget::new();
    let mut bridge = BridgeLifecycle::new(widget.clone(), counting_handler(Arc::default()));
    bridge.show();

    bridge.dispose();
    bridge.dispose();

    assert!(bridge.is_disposed());
    assert_eq!(bridge.attachment(), Attachment::Detached);
    let log = widget.log();
    assert_eq!(log.scripts.last().map(String::as_str), Some(HIDE_SCRIPT));
    assert_eq!(log.stop_loads, 1);
    assert!(log.closed);
    assert!(log.released);
    assert_eq!(widget.router().handler_count(), 0);

    bridge.attach();
    bridge.show();
    assert!(!bridge.is_attached());
    assert_eq!(widget.router().handler_count(), 0);
}

#[test]
fn dispose_without_attach_is_safe() {
    let widget = HeadlessWidget::new();
    let mut bridge = BridgeLifecycle::new(widget.clone(), counting_handler(Arc::default()));
    bridge.dispose();
    assert!(bridge.is_disposed());
    assert!(widget.log().scripts.is_empty());
    assert!(widget.log().released);
}

#[test]
fn dispose_completes_when_widget_already_closed() {
    let mut widget = HeadlessWidget::new();
    widget.close().unwrap();
    let mut bridge = BridgeLifecycle::new(widget.clone(), counting_handler(Arc::default()));
    bridge.attach();
    bridge.dispose();
    assert!(bridge.is_disposed());
    assert!(widget.log().released);
}

struct PanelCtx {
    _tmp: TempDir,
    root: PathBuf,
    config_path: PathBuf,
    widget: HeadlessWidget,
    host: Arc<LocalHost>,
    ui: UiLoop,
    panel: BrowserPanel<HeadlessWidget, LocalHost>,
}

#[fixture]
fn panel() -> PanelCtx {
    let tmp = TempDir::new("bridge");
    let root = tmp.path().join("proj");
    std::fs::create_dir_all(root.join("src")).unwrap();
    std::fs::write(root.join("src/lib.rs"), "pub fn f() {}\n").unwrap();

    let config_path = tmp.path().join("code_agent_cnfg.env");
    std::fs::write(&config_path, "HTTP_PORT=5100\n").unwrap();
    let config = Arc::new(SharedConfig::new(ConfigLoader::with_path(&config_path)));

    let session = SessionHandle::new("proj", &root);
    let host = Arc::new(LocalHost::new());
    let (scheduler, ui) = ui_loop();
    let protocol = CommandProtocol::new(session, host.clone(), scheduler.clone());

    let widget = HeadlessWidget::new();
    let panel = BrowserPanel::new(widget.clone(), protocol, config, scheduler);
    PanelCtx {
        _tmp: tmp,
        root,
        config_path,
        widget,
        host,
        ui,
        panel,
    }
}

#[rstest]
fn panel_loads_server_url_from_config(mut panel: PanelCtx) {
    assert_eq!(
        panel.widget.log().loaded_urls,
        vec![BLANK_URL.to_owned(), "http://localhost:5100/".to_owned()]
    );
    assert!(!panel.panel.lifecycle().is_attached());

    std::fs::write(&panel.config_path, "HTTP_PORT=not-a-number\n").unwrap();
    let reloaded = panel.panel.load_app();
    assert_eq!(reloaded.port, 5000);
    assert_eq!(panel.widget.current_url().as_deref(), Some("http://localhost:5000/"));
}

#[rstest]
fn panel_routes_page_queries_to_the_host(mut panel: PanelCtx) {
    assert_eq!(panel.widget.query(Some("jide_open_file//src/lib.rs")), NO_HANDLER_REPLY);

    panel.panel.on_visibility_changed(true);
    assert_eq!(panel.widget.query(Some("jide_open_file//src/lib.rs")), "success");
    assert!(panel.host.actions().is_empty());

    panel.ui.run_pending();
    assert_eq!(
        panel.host.actions(),
        vec![HostAction::OpenFile(panel.root.join("src/lib.rs"))]
    );

    panel.panel.on_visibility_changed(false);
    assert_eq!(panel.widget.query(Some("jide_open_file//src/lib.rs")), NO_HANDLER_REPLY);
}

#[rstest]
fn panel_navigation_respects_history(mut panel: PanelCtx) {
    panel.panel.forward();
    assert_eq!(panel.widget.current_url().as_deref(), Some("http://localhost:5100/"));
    panel.panel.back();
    assert_eq!(panel.widget.current_url().as_deref(), Some(BLANK_URL));
    panel.panel.back();
    assert_eq!(panel.widget.current_url().as_deref(), Some(BLANK_URL));
    panel.panel.forward();
    assert_eq!(panel.widget.current_url().as_deref(), Some("http://localhost:5100/"));

    panel.panel.open_dev_tools();
    assert_eq!(panel.widget.log().dev_tools_opened, 1);
}

#[rstest]
fn panel_loads_popups_in_place_and_reports_address(mut panel: PanelCtx) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    panel.panel.on_url_change(move |url| sink.lock().unwrap().push(url.to_owned()));

    panel.panel.on_navigation(NavigationEvent::PopupRequested {
        target_url: "http://localhost:5100/popup".into(),
    });
    panel.panel.on_navigation(NavigationEvent::AddressChanged {
        url: "http://localhost:5100/popup".into(),
    });

    assert_eq!(
        panel.widget.current_url().as_deref(),
        Some("http://localhost:5100/popup")
    );
    assert_eq!(*seen.lock().unwrap(), vec!["http://localhost:5100/popup".to_owned()]);
}

#[rstest]
fn panel_progress_indicator_runs_on_ui_context(mut panel: PanelCtx) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    panel.panel.on_progress_indicator(move |indicator| sink.lock().unwrap().push(indicator));

    let progress = panel.panel.progress();
    std::thread::spawn(move || {
        progress.on_loading_changed(true);
        progress.on_load_ended();
    })
    .join()
    .unwrap();
    assert!(seen.lock().unwrap().is_empty());

    panel.ui.run_pending();
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].visible && (10..80).contains(&seen[0].percent));
    assert_eq!(
        seen[1],
        ProgressIndicator {
            visible: false,
            percent: 0
        }
    );
}

#[rstest]
fn panel_progress_indicator_on_ui_context_can_read_progress(mut panel: PanelCtx) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let progress = panel.panel.progress();
    let reader = Arc::downgrade(&progress);
    panel.panel.on_progress_indicator(move |indicator| {
        let state = reader.upgrade().map(|progress| progress.state());
        sink.lock().unwrap().push((indicator, state));
    });

    let emitted = progress.on_loading_changed(true);
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].0.visible);
    assert_eq!(seen[0].1, Some(emitted));
    assert_eq!(panel.ui.run_pending(), 0);
}

#[rstest]
fn panel_dispose_stops_progress_updates(mut panel: PanelCtx) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    panel.panel.on_progress_indicator(move |indicator| sink.lock().unwrap().push(indicator));
    panel.panel.show();
    panel.panel.dispose();

    panel.panel.on_navigation(NavigationEvent::LoadingStateChanged {
        is_loading: true,
        can_go_back: false,
        can_go_forward: false,
    });
    panel.panel.on_navigation(NavigationEvent::LoadEnded { http_status: 200 });
    panel.ui.run_pending();
    assert!(seen.lock().unwrap().is_empty());
}

#[rstest]
fn panel_drop_mentions_only_files_inside_root(mut panel: PanelCtx) {
    panel.panel.show();
    let files = vec![
        panel.root.join("src/lib.rs"),
        panel.root.join("../secret.txt"),
        PathBuf::from("/etc/passwd"),
        panel.root.join("docs/it's.md"),
    ];

    let script = panel.panel.on_files_dropped(&files).unwrap();
    assert_eq!(script, "onFilesDrag('@file src/lib.rs @file docs/it\\'s.md ')");
    assert_eq!(panel.widget.log().scripts.last(), Some(&script));
}

#[rstest]
fn panel_drop_outside_root_runs_nothing(mut panel: PanelCtx) {
    let before = panel.widget.log().scripts.len();
    let outside = [panel.root.join("../x"), PathBuf::from("/tmp/other")];
    assert_eq!(panel.panel.on_files_dropped(&outside), None);
    assert_eq!(panel.widget.log().scripts.len(), before);
}

#[rstest]
fn panel_dispose_closes_widget(mut panel: PanelCtx) {
    panel.panel.show();
    panel.panel.dispose();
    panel.panel.dispose();
    assert!(panel.widget.log().closed);
    assert_eq!(panel.widget.router().handler_count(), 0);
    assert_eq!(panel.panel.on_files_dropped(&[panel.root.join("src/lib.rs")]), None);
    assert_eq!(panel.widget.log().scripts.last().map(String::as_str), Some(HIDE_SCRIPT));
}

#[test]
fn js_escaping_covers_quotes_backslashes_and_line_breaks() {
    assert_eq!(escape_js_single_quoted("a'b\\c\nd\u{2028}</"), "a\\'b\\\\c\\nd\\u2028\\x3c/");
    assert_eq!(escape_js_single_quoted("\u{7}"), "\\u0007");
}
