use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// One push request from the client: `<+?src>:<dst>`.
///
/// An empty `src` asks for `dst` to be deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSpec {
    pub src: String,
    pub dst: String,
    pub force: bool,
}

impl PushSpec {
    pub fn new(src: impl Into<String>, dst: impl Into<String>) -> Self {
        Self { src: src.into(), dst: dst.into(), force: false }
    }

    pub fn forced(src: impl Into<String>, dst: impl Into<String>) -> Self {
        Self { src: src.into(), dst: dst.into(), force: true }
    }

    /// Parse "+refs/heads/main:refs/heads/main" or ":refs/heads/gone".
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let (force, rest) = match s.strip_prefix('+') {
            Some(stripped) => (true, stripped),
            None => (false, s),
        };
        let (src, dst) = rest
            .split_once(':')
            .ok_or_else(|| TypeError::MalformedPushSpec(s.to_string()))?;
        if dst.is_empty() {
            return Err(TypeError::MalformedPushSpec(s.to_string()));
        }
        Ok(Self { src: src.into(), dst: dst.into(), force })
    }

    /// Returns `true` when this spec deletes its destination.
    pub fn is_delete(&self) -> bool {
        self.src.is_empty()
    }
}
