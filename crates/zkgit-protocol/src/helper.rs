//! The git remote-helper command stream.
//!
//! git writes one command per line on the helper's stdin; the helper answers
//! on stdout, ending each response block with a blank line.

use std::fmt;

use zkgit_types::{ObjectId, PushSpec, HEAD};

use crate::error::{ProtocolError, ProtocolResult};

pub mod capabilities {
    pub const PUSH: &str = "push";
    pub const FETCH: &str = "fetch";

    /// Advertised in answer to `capabilities`, in this order.
    pub const ADVERTISED: &[&str] = &[PUSH, FETCH];
}

const FOR_PUSH: &str = "for-push";

/// One `fetch <sha> <name>` request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    pub id: ObjectId,
    pub name: String,
}

/// A parsed input line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HelperCommand {
    Capabilities,
    List { for_push: bool },
    Push(PushSpec),
    Fetch(FetchRequest),
    /// A blank line: ends a push/fetch batch, or the session.
    Blank,
}

impl HelperCommand {
    pub fn parse(line: &str) -> ProtocolResult<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Ok(Self::Blank);
        }
        if line == "capabilities" {
            return Ok(Self::Capabilities);
        }
        if let Some(rest) = line.strip_prefix("list") {
            return Ok(Self::List { for_push: rest.split_whitespace().any(|w| w == FOR_PUSH) });
        }
        if let Some(rest) = line.strip_prefix("push ") {
            let spec = PushSpec::parse(rest.trim()).map_err(|_| ProtocolError::Malformed {
                command: "push",
                line: line.to_string(),
            })?;
            return Ok(Self::Push(spec));
        }
        if let Some(rest) = line.strip_prefix("fetch ") {
            let malformed = || ProtocolError::Malformed { command: "fetch", line: line.to_string() };
            let mut parts = rest.split_whitespace();
            let (Some(sha), Some(name)) = (parts.next(), parts.next()) else {
                return Err(malformed());
            };
            let id = ObjectId::from_hex(sha).map_err(|_| malformed())?;
            return Ok(Self::Fetch(FetchRequest { id, name: name.to_string() }));
        }
        Err(ProtocolError::UnsupportedOperation(line.to_string()))
    }
}

/// One output line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HelperReply {
    Capability(&'static str),
    Ref { id: ObjectId, name: String },
    /// `@<target> HEAD`: the default branch.
    SymbolicHead(String),
    Ok(String),
    Error { dst: String, reason: String },
    /// The blank line closing a response block.
    End,
}

impl fmt::Display for HelperReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Capability(name) => f.write_str(name),
            Self::Ref { id, name } => write!(f, "{id} {name}"),
            Self::SymbolicHead(target) => write!(f, "@{target} {HEAD}"),
            Self::Ok(dst) => write!(f, "ok {dst}"),
            Self::Error { dst, reason } => write!(f, "error {dst} {reason}"),
            Self::End => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

    #[test]
    fn parse_simple_commands() {
        assert_eq!(HelperCommand::parse("capabilities").unwrap(), HelperCommand::Capabilities);
        assert_eq!(HelperCommand::parse("").unwrap(), HelperCommand::Blank);
        assert_eq!(HelperCommand::parse("\n").unwrap(), HelperCommand::Blank);
        assert_eq!(
            HelperCommand::parse("list").unwrap(),
            HelperCommand::List { for_push: false }
        );
        assert_eq!(
            HelperCommand::parse("list for-push").unwrap(),
            HelperCommand::List { for_push: true }
        );
    }

    #[test]
    fn parse_push_line() {
        let cmd = HelperCommand::parse("push +refs/heads/a:refs/heads/b").unwrap();
        assert_eq!(cmd, HelperCommand::Push(PushSpec::forced("refs/heads/a", "refs/heads/b")));
    }

    #[test]
    fn parse_delete_push() {
        let HelperCommand::Push(spec) = HelperCommand::parse("push :refs/heads/b").unwrap() else {
            panic!("expected push");
        };
        assert!(spec.is_delete());
    }

    #[test]
    fn parse_fetch_line() {
        let cmd = HelperCommand::parse(&format!("fetch {SHA} refs/heads/main")).unwrap();
        assert_eq!(
            cmd,
            HelperCommand::Fetch(FetchRequest {
                id: SHA.parse().unwrap(),
                name: "refs/heads/main".into()
            })
        );
    }

    #[test]
    fn malformed_fetch_is_rejected() {
        let err = HelperCommand::parse("fetch nothex refs/heads/main").unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed { command: "fetch", .. }));
        assert!(HelperCommand::parse(&format!("fetch {SHA}")).is_err());
    }

    #[test]
    fn unknown_command_is_unsupported() {
        let err = HelperCommand::parse("option verbosity 1").unwrap_err();
        assert!(matches!(err, ProtocolError::UnsupportedOperation(ref l) if l == "option verbosity 1"));
    }

    #[test]
    fn replies_render_as_git_expects() {
        let id: ObjectId = SHA.parse().unwrap();
        assert_eq!(HelperReply::Capability("push").to_string(), "push");
        assert_eq!(
            HelperReply::Ref { id, name: "refs/heads/main".into() }.to_string(),
            format!("{SHA} refs/heads/main")
        );
        assert_eq!(
            HelperReply::SymbolicHead("refs/heads/main".into()).to_string(),
            "@refs/heads/main HEAD"
        );
        assert_eq!(HelperReply::Ok("refs/heads/main".into()).to_string(), "ok refs/heads/main");
        assert_eq!(
            HelperReply::Error { dst: "refs/heads/main".into(), reason: "non-fast forward".into() }
                .to_string(),
            "error refs/heads/main non-fast forward"
        );
        assert_eq!(HelperReply::End.to_string(), "");
    }
}
