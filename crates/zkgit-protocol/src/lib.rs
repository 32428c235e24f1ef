//! Protocols spoken by the zkgit remote helper.
//!
//! Two line-based protocols meet here:
//!
//! - The **control protocol** with the companion process: one command line
//!   and one response line per short-lived TCP connection
//!   (`STATUS`, `SEND`, `REQUEST`, `CLEAN`). See [`control`] and [`channel`].
//! - The **remote-helper protocol** with git on stdin/stdout
//!   (`capabilities`, `list`, `push`, `fetch`, blank line). See [`helper`].

pub mod channel;
pub mod control;
pub mod error;
pub mod helper;

pub use channel::{ChannelConfig, ControlChannel, TcpControlChannel};
pub use control::{markers, ControlCommand, ControlResponse};
pub use error::{ProtocolError, ProtocolResult};
pub use helper::{capabilities, FetchRequest, HelperCommand, HelperReply};
