//! Control protocol with the companion process.
//!
//! Every exchange is a single command line answered by a single response
//! line. Responses are free text; only the markers below carry meaning.

use std::fmt;

use zkgit_crypto::RepoSignature;

pub mod markers {
    /// Present in every successful response.
    pub const SUCCESS: &str = "SUCCESS";
    /// Present when the companion's stored snapshot already matches.
    pub const UP_TO_DATE: &str = "upToDate";
    /// Present when the companion holds no snapshot for the requested name.
    pub const NOT_FOUND: &str = "notFound";
}

/// One command sent to the companion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlCommand {
    /// Ask whether the companion is connected to its remote.
    Status,
    /// Hand over the archive `path` for storage under `signature`.
    Send { path: String, signature: RepoSignature },
    /// Ask for the archive `name` unless it matches `signature`.
    Request { name: String, signature: RepoSignature },
    /// Drop any temporary state for `name`.
    Clean { name: String },
}

impl ControlCommand {
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Status => "STATUS",
            Self::Send { .. } => "SEND",
            Self::Request { .. } => "REQUEST",
            Self::Clean { .. } => "CLEAN",
        }
    }

    /// The command line, without the trailing newline.
    pub fn to_line(&self) -> String {
        match self {
            Self::Status => self.verb().to_string(),
            Self::Send { path, signature } => format!("{} {path} {signature}", self.verb()),
            Self::Request { name, signature } => format!("{} {name} {signature}", self.verb()),
            Self::Clean { name } => format!("{} {name}", self.verb()),
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

/// Interpreted companion response.
///
/// Network trouble is a value, not an error: callers always branch on the
/// variant and can tell "the companion said no" from "no companion".
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlResponse {
    /// The command succeeded (and, for `REQUEST`, a snapshot was delivered).
    Success,
    /// Nothing to transfer: the companion's copy matches the signature.
    UpToDate,
    /// The companion has never stored a snapshot under the requested name.
    NotFound,
    /// The companion answered without the success marker.
    Failure(String),
    /// The companion could not be reached or did not answer.
    Unreachable(String),
}

impl ControlResponse {
    /// Interpret one response line.
    ///
    /// The up-to-date marker is accepted with or without the success marker;
    /// companions send it on its own.
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.contains(markers::NOT_FOUND) {
            Self::NotFound
        } else if line.contains(markers::UP_TO_DATE) {
            Self::UpToDate
        } else if line.contains(markers::SUCCESS) {
            Self::Success
        } else {
            Self::Failure(line.to_string())
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn is_up_to_date(&self) -> bool {
        matches!(self, Self::UpToDate)
    }
}

impl fmt::Display for ControlResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str(markers::SUCCESS),
            Self::UpToDate => write!(f, "{} {}", markers::SUCCESS, markers::UP_TO_DATE),
            Self::NotFound => f.write_str(markers::NOT_FOUND),
            Self::Failure(text) => write!(f, "failure: {text}"),
            Self::Unreachable(reason) => write!(f, "unknown status ({reason})"),
        }
    }
}
