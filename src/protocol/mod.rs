// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Panebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! String command protocol between embedded content and the host.
//!
//! A request is an opcode optionally followed by `//`-separated positional arguments. Every
//! request gets a reply string: `success` or `error:<tag>`. Host effects (opening an editor or a
//! diff view) are queued on the UI loop and may become visible after the reply was delivered.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::host::HostCapabilities;
use crate::path::{resolve, ResolveError, ResolvedPath};
use crate::session::SessionHandle;
use crate::ui_loop::UiScheduler;
use crate::widget::QueryHandler;


pub const DELIMITER: &str = "//";
pub const OPEN_FILE: &str = "jide_open_file";
pub const OPEN_DIFF_FILE: &str = "jide_open_diff_file";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    opcode: String,
    args: Vec<String>,
}

impl Command {
    pub fn new(opcode: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            opcode: opcode.into(),
            args,
        }
    }

    pub fn opcode(&self) -> &str {
        &self.opcode
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Matches the opcode first, then validates the argument count for that opcode.
    pub fn operation(&self) -> Result<Operation<'_>, ProtocolError> {
        let opcode = Opcode::from_token(&self.opcode);
        if let Some(expected) = opcode.arity() {
            if self.args.len() != expected {
                return Err(ProtocolError::ArgumentCount {
                    opcode: self.opcode.clone(),
                    expected,
                    actual: self.args.len(),
                });
            }
        }

        Ok(match opcode {
            Opcode::OpenFile => Operation::OpenFile {
                path: &self.args[0],
            },
            Opcode::OpenDiffFile => Operation::OpenDiff {
                path: &self.args[0],
                source_path: &self.args[1],
            },
            Opcode::Unrecognized => Operation::Unrecognized {
                opcode: &self.opcode,
            },
        })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.opcode)?;
        for arg in &self.args {
            write!(f, "{DELIMITER}{arg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    OpenFile,
    OpenDiffFile,
    Unrecognized,
}

impl Opcode {
    pub fn from_token(token: &str) -> Self {
        match token {
            OPEN_FILE => Self::OpenFile,
            OPEN_DIFF_FILE => Self::OpenDiffFile,
            _ => Self::Unrecognized,
        }
    }

    /// Required argument count, or `None` when any count is accepted.
    pub fn arity(self) -> Option<usize> {
        match self {
            Self::OpenFile => Some(1),
            Self::OpenDiffFile => Some(2),
            Self::Unrecognized => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation<'a> {
    OpenFile { path: &'a str },
    OpenDiff { path: &'a str, source_path: &'a str },
    Unrecognized { opcode: &'a str },
}

/// Which argument of a diff request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffSide {
    Path,
    SourcePath,
}

impl DiffSide {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::SourcePath => "source_path",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    WrongCommand,
    EmptyCommand,
    ArgumentCount {
        opcode: String,
        expected: usize,
        actual: usize,
    },
    Resolve {
        side: Option<DiffSide>,
        source: ResolveError,
    },
    VfsResolutionFailed {
        side: Option<DiffSide>,
        path: PathBuf,
    },
}

impl ProtocolError {
    /// Machine-readable tag used on the wire after `error:`.
    pub fn tag(&self) -> String {
        let with_side = |kind: &str, side: &Option<DiffSide>, detail: Option<String>| {
            let mut out = kind.to_owned();
            if let Some(side) = side {
                out.push(':');
                out.push_str(side.as_str());
            }
            if let Some(detail) = detail {
                out.push(':');
                out.push_str(&detail);
            }
            out
        };

        match self {
            Self::WrongCommand => "wrong_command".to_owned(),
            Self::EmptyCommand | Self::ArgumentCount { .. } => {
                "wrong_command_arguments".to_owned()
            }
            Self::Resolve { side, source } => match source {
                ResolveError::EmptyPath => with_side("empty_file_path", side, None),
                ResolveError::NotFound {
                    absolute,
                    project_root,
                    raw,
                } => with_side(
                    "file_not_found",
                    side,
                    Some(format!(
                        "{}({})[{raw}]",
                        absolute.display(),
                        project_root.display()
                    )),
                ),
                ResolveError::OutsideRoot { candidate, .. } => with_side(
                    "outside_root",
                    side,
                    Some(candidate.display().to_string()),
                ),
            },
            Self::VfsResolutionFailed { side, path } => with_side(
                "vfs_resolution_failed",
                side,
                Some(path.display().to_string()),
            ),
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongCommand => f.write_str("no command given"),
            Self::EmptyCommand => f.write_str("command has no opcode"),
            Self::ArgumentCount {
                opcode,
                expected,
                actual,
            } => write!(
                f,
                "{opcode} expects {expected} argument(s), got {actual}"
            ),
            Self::Resolve {
                side: Some(side),
                source,
            } => write!(f, "cannot resolve {}: {source}", side.as_str()),
            Self::Resolve { side: None, source } => write!(f, "cannot resolve path: {source}"),
            Self::VfsResolutionFailed { path, .. } => {
                write!(f, "file not found in host file system: {}", path.display())
            }
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Resolve { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Success,
    Error(ProtocolError),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Error(err) => write!(f, "error:{}", err.tag()),
        }
    }
}

impl From<Result<(), ProtocolError>> for Reply {
    fn from(result: Result<(), ProtocolError>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(err) => Self::Error(err),
        }
    }
}

/// Splits `raw` on `//` and drops trailing empty tokens.
fn split_tokens(raw: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = raw.split(DELIMITER).collect();
    while tokens.last().is_some_and(|token| token.is_empty()) {
        tokens.pop();
    }
    tokens
}

/// Decodes a raw request.
///
/// An absent request is [`ProtocolError::WrongCommand`]. A request without tokens (the empty
/// string, or only delimiters) or with an empty opcode is [`ProtocolError::EmptyCommand`].
pub fn parse_command(raw: Option<&str>) -> Result<Command, ProtocolError> {
    let raw = raw.ok_or(ProtocolError::WrongCommand)?;
    let mut tokens = split_tokens(raw).into_iter();
    let opcode = match tokens.next() {
        Some(opcode) if !opcode.is_empty() => opcode,
        _ => return Err(ProtocolError::EmptyCommand),
    };
    Ok(Command::new(opcode, tokens.map(str::to_owned).collect()))
}

pub struct CommandProtocol<H: HostCapabilities> {
    session: SessionHandle,
    host: Arc<H>,
    scheduler: UiScheduler,
}

impl<H: HostCapabilities> CommandProtocol<H> {
    pub fn new(session: SessionHandle, host: Arc<H>, scheduler: UiScheduler) -> Self {
        Self {
            session,
            host,
            scheduler,
        }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Handles one request and renders the reply. Never panics on malformed input.
    pub fn dispatch(&self, raw: Option<&str>) -> String {
        self.handle(raw).to_string()
    }

    pub fn handle(&self, raw: Option<&str>) -> Reply {
        let reply = Reply::from(self.try_handle(raw));
        if let Reply::Error(err) = &reply {
            tracing::debug!(session = self.session.name(), %err, "command failed");
        }
        reply
    }

    /// Wraps the protocol as a message-channel handler.
    pub fn into_handler(self: Arc<Self>) -> QueryHandler {
        Arc::new(move |raw: Option<&str>| self.dispatch(raw))
    }

    fn try_handle(&self, raw: Option<&str>) -> Result<(), ProtocolError> {
        let command = parse_command(raw)?;
        match command.operation()? {
            Operation::OpenFile { path } => self.open_file(path),
            Operation::OpenDiff { path, source_path } => self.open_diff(path, source_path),
            Operation::Unrecognized { opcode } => {
                tracing::debug!(
                    session = self.session.name(),
                    opcode,
                    args = command.args().len(),
                    "ignoring unrecognized command"
                );
                Ok(())
            }
        }
    }

    fn lookup(&self, raw: &str, side: Option<DiffSide>) -> Result<H::Handle, ProtocolError> {
        let resolved: ResolvedPath = resolve(raw, self.session.project_root())
            .map_err(|source| ProtocolError::Resolve { side, source })?;
        self.host
            .resolve_virtual_handle(resolved.path())
            .ok_or_else(|| ProtocolError::VfsResolutionFailed {
                side,
                path: resolved.into_path_buf(),
            })
    }

    fn open_file(&self, path: &str) -> Result<(), ProtocolError> {
        let file = self.lookup(path, None)?;

        let host = self.host.clone();
        let session = self.session.clone();
        self.scheduler.invoke_later_for(&self.session, move || {
            host.open_file(&session, &file);
        });
        Ok(())
    }

    fn open_diff(&self, path: &str, source_path: &str) -> Result<(), ProtocolError> {
        let left = self.lookup(source_path, Some(DiffSide::SourcePath))?;
        let right = self.lookup(path, Some(DiffSide::Path))?;

        let host = self.host.clone();
        let session = self.session.clone();
        self.scheduler.invoke_later_for(&self.session, move || {
            if !host.is_valid(&left) || !host.is_valid(&right) {
                tracing::debug!(session = session.name(), "diff side no longer valid, skipping");
                return;
            }
            host.open_diff(&session, &left, &right);
        });
        Ok(())
    }
}
