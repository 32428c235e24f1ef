//! Address of the companion process and repository naming derived from the
//! remote URL.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The companion process is always reached over loopback.
pub const COMPANION_HOST: &str = "localhost";

/// Loopback TCP endpoint of the companion process.
///
/// A port of `0` means the URL carried no `:<port>/` segment; such an
/// endpoint is never reachable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEndpoint {
    pub host: String,
    pub port: u16,
}

impl RemoteEndpoint {
    pub fn new(port: u16) -> Self {
        Self { host: COMPANION_HOST.to_string(), port }
    }

    /// Derive the endpoint from a remote URL by extracting the last
    /// `:<digits>/` segment. Falls back to port `0`.
    pub fn from_url(url: &str) -> Self {
        Self::new(port_from_url(url).unwrap_or(0))
    }

    /// Returns `true` if no port could be derived.
    pub fn is_unset(&self) -> bool {
        self.port == 0
    }

    /// `host:port` form accepted by socket connect calls.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for RemoteEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

fn port_from_url(url: &str) -> Option<u16> {
    url.match_indices(':').rev().find_map(|(idx, _)| {
        let rest = &url[idx + 1..];
        let digits = rest.find('/').map(|end| &rest[..end])?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    })
}

/// Repository name for a URL or path: the last `/` segment with its final
/// extension removed (`http://localhost:8080/secret.git` → `secret`).
pub fn repo_name_from_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    match last.rfind('.') {
        Some(dot) => last[..dot].to_string(),
        None => last.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn port_from_http_style_url() {
        let ep = RemoteEndpoint::from_url("zkgit://localhost:8451/secret.git");
        assert_eq!(ep.port, 8451);
        assert_eq!(ep.host, COMPANION_HOST);
        assert_eq!(ep.addr(), "localhost:8451");
    }

    #[test]
    fn missing_port_is_unset() {
        let ep = RemoteEndpoint::from_url("zkgit://localhost/secret.git");
        assert!(ep.is_unset());
    }

    #[test]
    fn port_without_trailing_slash_is_unset() {
        assert!(RemoteEndpoint::from_url("localhost:8451").is_unset());
    }

    #[test]
    fn out_of_range_port_is_unset() {
        assert!(RemoteEndpoint::from_url("x://h:99999/r.git").is_unset());
    }

    #[test]
    fn last_port_segment_wins() {
        let ep = RemoteEndpoint::from_url("a://h:1/b:2/c.git");
        assert_eq!(ep.port, 2);
    }

    #[test]
    fn repo_name_strips_extension() {
        assert_eq!(repo_name_from_url("zkgit://localhost:8451/secret.git"), "secret");
        assert_eq!(repo_name_from_url("/home/me/work/secret"), "secret");
        assert_eq!(repo_name_from_url("/home/me/work/secret/"), "secret");
        assert_eq!(repo_name_from_url("plain"), "plain");
    }

    proptest! {
        #[test]
        fn any_port_segment_roundtrips(port in 1u16.., name in "[a-z]{1,12}") {
            let url = format!("zkgit://localhost:{port}/{name}.git");
            prop_assert_eq!(RemoteEndpoint::from_url(&url).port, port);
            prop_assert_eq!(repo_name_from_url(&url), name);
        }
    }
}
