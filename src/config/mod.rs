// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Panebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Server port configuration.
//!
//! The config lives in a single properties-style file in the user's home directory. Loading never
//! fails: missing files, unreadable files and bad values all degrade to [`DEFAULT_PORT`].

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;


pub const CONFIG_FILE_NAME: &str = "code_agent_cnfg.env";
pub const DEFAULT_PORT: u16 = 5000;

const PORT_KEY: &str = "HTTP_PORT";
const LEGACY_PORT_KEY: &str = "PORT";
const DEFAULT_TEMPLATE: &str = include_str!("default.env");

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerConfig {
    pub port: u16,
    pub config_file_path: PathBuf,
}

impl ServerConfig {
    pub fn server_url(&self) -> String {
        format!("http://localhost:{}/", self.port)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: io::Error },
    MissingTemplate,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "io error at {path:?}: {source}"),
            Self::MissingTemplate => f.write_str("bundled config template is empty"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::MissingTemplate => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoader {
    path: PathBuf,
    template: &'static str,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Uses `<home>/code_agent_cnfg.env`, or the current directory when no home is known.
    pub fn new() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::with_path(home.join(CONFIG_FILE_NAME))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            template: DEFAULT_TEMPLATE,
        }
    }

    pub fn with_template(mut self, template: &'static str) -> Self {
        self.template = template;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_config(&self) -> ServerConfig {
        let port = match fs::read_to_string(&self.path) {
            Ok(contents) => port_from_properties(&contents),
            Err(err) => {
                tracing::debug!(path = %self.path.display(), %err, "config file not readable, using default port");
                DEFAULT_PORT
            }
        };

        ServerConfig {
            port,
            config_file_path: self.path.clone(),
        }
    }

    /// Writes the bundled template to the config path. Failures are logged only, so the file
    /// may still be absent afterwards.
    pub fn materialize_default_config(&self) {
        if let Err(err) = self.try_materialize_default_config() {
            tracing::warn!(path = %self.path.display(), %err, "cannot create config file");
        }
    }

    fn try_materialize_default_config(&self) -> Result<(), ConfigError> {
        if self.template.trim().is_empty() {
            return Err(ConfigError::MissingTemplate);
        }

        let absolute = std::env::current_dir()
            .map(|cwd| cwd.join(&self.path))
            .unwrap_or_else(|_| self.path.clone());
        let contents = format!(
            "# path to config file: {}\n\n{}",
            absolute.display(),
            self.template
        );

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        fs::write(&self.path, contents).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!(path = %absolute.display(), "created default config file");
        Ok(())
    }
}

/// Current config plus a serialized reload path.
#[derive(Debug)]
pub struct SharedConfig {
    loader: ConfigLoader,
    current: Mutex<ServerConfig>,
}

impl SharedConfig {
    pub fn new(loader: ConfigLoader) -> Self {
        let current = loader.load_config();
        Self {
            loader,
            current: Mutex::new(current),
        }
    }

    pub fn loader(&self) -> &ConfigLoader {
        &self.loader
    }

    pub fn current(&self) -> ServerConfig {
        match self.current.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Re-reads the file. The lock is held across the read so reloads never interleave.
    pub fn reload(&self) -> ServerConfig {
        let mut guard = match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = self.loader.load_config();
        guard.clone()
    }
}

fn port_from_properties(contents: &str) -> u16 {
    let properties = parse_properties(contents);
    let lookup = |key: &str| {
        properties
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    };

    let Some((key, raw)) = lookup(PORT_KEY)
        .map(|v| (PORT_KEY, v))
        .or_else(|| lookup(LEGACY_PORT_KEY).map(|v| (LEGACY_PORT_KEY, v)))
    else {
        return DEFAULT_PORT;
    };

    match raw.trim().parse::<u16>() {
        Ok(port) => port,
        Err(err) => {
            tracing::warn!(key, value = raw, %err, "invalid port value in config file, using default {DEFAULT_PORT}");
            DEFAULT_PORT
        }
    }
}

/// Parses `key=value` / `key:value` lines. `#` and `!` start comment lines.
fn parse_properties(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let (key, value) = match line.find(['=', ':']) {
            Some(idx) => (&line[..idx], &line[idx + 1..]),
            None => (line, ""),
        };
        out.push((key.trim().to_owned(), value.trim().to_owned()));
    }
    out
}
