// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Panebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Panebridge CLI entrypoint.
//!
//! Runs a headless host: the panel bridge is attached to a loopback message channel served at
//! `http://127.0.0.1:<port>/query`, and opened files are logged instead of shown in an editor.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use panebridge::bridge::BrowserPanel;
use panebridge::channel::{bind_loopback, serve_query_channel, HeadlessWidget};
use panebridge::config::{ConfigLoader, SharedConfig};
use panebridge::host::LocalHost;
use panebridge::protocol::CommandProtocol;
use panebridge::session::SessionHandle;
use panebridge::ui_loop::ui_loop;
use panebridge::widget::{negotiate, EngineSupport, WidgetError, UNSUPPORTED_ENGINE_MESSAGE};

const DEFAULT_QUERY_PORT: u16 = 27436;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--project-root <dir>] [--config <path>] [--init-config] [--query-port <port>]\n  {program} [--config <path>] [--init-config] --print-config\n\nServes the panel query channel at `http://127.0.0.1:<port>/query`.\n--query-port selects the port (0 = ephemeral; default {DEFAULT_QUERY_PORT}).\n\nIf --project-root is omitted, the current working directory is used.\nIf --config is omitted, ~/code_agent_cnfg.env is used.\n--init-config writes the default config when the file does not exist yet.\n--print-config prints the effective server config as JSON and exits."
    );
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    project_root: Option<String>,
    config: Option<String>,
    init_config: bool,
    print_config: bool,
    query_port: Option<u16>,
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--project-root" => {
                if options.project_root.is_some() {
                    return Err(());
                }
                options.project_root = Some(args.next().ok_or(())?);
            }
            "--config" => {
                if options.config.is_some() {
                    return Err(());
                }
                options.config = Some(args.next().ok_or(())?);
            }
            "--init-config" => {
                if options.init_config {
                    return Err(());
                }
                options.init_config = true;
            }
            "--print-config" => {
                if options.print_config {
                    return Err(());
                }
                options.print_config = true;
            }
            "--query-port" => {
                if options.query_port.is_some() {
                    return Err(());
                }
                let raw = args.next().ok_or(())?;
                let port: u16 = raw.parse().map_err(|_| ())?;
                options.query_port = Some(port);
            }
            _ => return Err(()),
        }
    }

    if options.print_config && (options.project_root.is_some() || options.query_port.is_some()) {
        return Err(());
    }

    Ok(options)
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn absolute_dir(raw: Option<String>) -> Result<PathBuf, Box<dyn Error>> {
    let cwd = std::env::current_dir()?;
    Ok(match raw {
        Some(raw) => panebridge::path::normalize(&cwd.join(raw)),
        None => cwd,
    })
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "panebridge".to_owned());

        let options = match parse_options(args) {
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };

        init_tracing();

        let loader = match options.config {
            Some(path) => ConfigLoader::with_path(path),
            None => ConfigLoader::new(),
        };
        if options.init_config && !loader.path().exists() {
            loader.materialize_default_config();
        }

        if options.print_config {
            println!("{}", serde_json::to_string_pretty(&loader.load_config())?);
            return Ok(());
        }

        let project_root = absolute_dir(options.project_root)?;
        let session_name = project_root
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
            .unwrap_or("project")
            .to_owned();
        let session = SessionHandle::new(session_name, &project_root);

        let widget = match negotiate(|| Ok::<_, WidgetError>(HeadlessWidget::new())) {
            EngineSupport::Supported(widget) => widget,
            EngineSupport::Unsupported { reason } => {
                return Err(format!("{UNSUPPORTED_ENGINE_MESSAGE}: {reason}").into());
            }
        };
        let router = widget.router();

        let (scheduler, ui) = ui_loop();
        let host = Arc::new(LocalHost::new());
        let protocol = CommandProtocol::new(session.clone(), host, scheduler.clone());
        let config = Arc::new(SharedConfig::new(loader));
        let mut panel = BrowserPanel::new(widget, protocol, config, scheduler);
        panel.show();

        let query_port = options.query_port.unwrap_or(DEFAULT_QUERY_PORT);
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;

        runtime.block_on(async move {
            let listener = bind_loopback(query_port).await?;
            let server = tokio::spawn(serve_query_channel(listener, router, async {
                let _ = tokio::signal::ctrl_c().await;
            }));

            tokio::select! {
                _ = ui.run() => {}
                joined = server => {
                    joined.map_err(|err| -> Box<dyn Error> { Box::new(err) })??;
                }
            }

            tracing::info!(session = session.name(), "shutting down");
            panel.dispose();
            session.dispose();
            Ok::<(), Box<dyn Error>>(())
        })?;

        Ok(())
    })();

    if let Err(err) = result {
        eprintln!("panebridge: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_options, CliOptions};

    fn args(values: &[&str]) -> impl Iterator<Item = String> {
        values.iter().map(|value| (*value).to_owned()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn parses_empty_args() {
        let options = parse_options(std::iter::empty()).expect("parse options");
        assert_eq!(options, CliOptions::default());
    }

    #[test]
    fn parses_all_serve_flags() {
        let options = parse_options(args(&[
            "--project-root",
            "some/dir",
            "--config",
            "cfg.env",
            "--init-config",
            "--query-port",
            "0",
        ]))
        .expect("parse options");
        assert_eq!(options.project_root.as_deref(), Some("some/dir"));
        assert_eq!(options.config.as_deref(), Some("cfg.env"));
        assert!(options.init_config);
        assert_eq!(options.query_port, Some(0));
        assert!(!options.print_config);
    }

    #[test]
    fn parses_print_config() {
        let options =
            parse_options(args(&["--print-config", "--config", "x.env"])).expect("parse options");
        assert!(options.print_config);
        assert_eq!(options.config.as_deref(), Some("x.env"));
    }

    #[test]
    fn rejects_print_config_with_serve_flags() {
        parse_options(args(&["--print-config", "--query-port", "1"])).unwrap_err();
        parse_options(args(&["--print-config", "--project-root", "."])).unwrap_err();
    }

    #[test]
    fn rejects_bad_port() {
        parse_options(args(&["--query-port", "70000"])).unwrap_err();
        parse_options(args(&["--query-port"])).unwrap_err();
    }

    #[test]
    fn rejects_unknown_positional_and_duplicate_args() {
        parse_options(args(&["--nope"])).unwrap_err();
        parse_options(args(&["dir"])).unwrap_err();
        parse_options(args(&["--init-config", "--init-config"])).unwrap_err();
        parse_options(args(&["--config", "a", "--config", "b"])).unwrap_err();
    }
}
