//! Endpoint selection
//!
//! The websocket scheme follows the security of the page hosting the
//! board: a page served over https talks `wss`, anything else `ws`. When
//! the page does not expose a usable host, a separately configured
//! protocol + host pair is used instead.

use serde::Deserialize;
use std::fmt::{Display, Formatter};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EndpointError {
    #[error("no host available: page has none and the fallback host is empty")]
    MissingHost,

    #[error("unknown protocol '{0}'")]
    UnknownProtocol(String),
}

/// What the host page declares about itself.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PageLocation {
    /// Page scheme, with or without the trailing colon (`https:`, `http`).
    pub protocol: String,
    pub host: Option<String>,
}

impl Default for PageLocation {
    fn default() -> PageLocation {
        PageLocation {
            protocol: "http:".to_string(),
            host: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Fallback {
    pub protocol: String,
    pub host: String,
}

impl Default for Fallback {
    fn default() -> Fallback {
        Fallback {
            protocol: "ws".to_string(),
            host: "localhost:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Ws,
    Wss,
}

impl Scheme {
    /// Maps a page or socket protocol onto a websocket scheme.
    pub fn from_protocol(protocol: &str) -> Result<Scheme, EndpointError> {
        let proto = protocol.trim().trim_end_matches(':').to_ascii_lowercase();
        match proto.as_str() {
            "https" | "wss" => Ok(Scheme::Wss),
            "http" | "ws" | "file" => Ok(Scheme::Ws),
            _ => Err(EndpointError::UnknownProtocol(protocol.to_string())),
        }
    }
}

impl Display for Scheme {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Scheme::Ws => write!(f, "ws"),
            Scheme::Wss => write!(f, "wss"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub scheme: Scheme,
    pub host: String,
    pub path: String,
}

impl Endpoint {
    pub fn resolve(
        page: &PageLocation,
        fallback: &Fallback,
        path: &str,
    ) -> Result<Endpoint, EndpointError> {
        let (scheme, host) = match page.host.as_deref().map(str::trim) {
            Some(host) if !host.is_empty() => (Scheme::from_protocol(&page.protocol)?, host),
            _ => {
                let host = fallback.host.trim();
                if host.is_empty() {
                    return Err(EndpointError::MissingHost);
                }
                (Scheme::from_protocol(&fallback.protocol)?, host)
            }
        };
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        Ok(Endpoint {
            scheme,
            host: host.to_string(),
            path,
        })
    }

    pub fn url(&self) -> String {
        self.to_string()
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.host, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(protocol: &str, host: Option<&str>) -> PageLocation {
        PageLocation {
            protocol: protocol.to_string(),
            host: host.map(str::to_string),
        }
    }

    #[test]
    fn secure_page_selects_wss() {
        let ep = Endpoint::resolve(
            &page("https:", Some("ion.example.org")),
            &Fallback::default(),
            "/bus/",
        )
        .unwrap();
        assert_eq!(ep.url(), "wss://ion.example.org/bus/");
    }

    #[test]
    fn plain_page_selects_ws() {
        let loc = page("http", Some("localhost:8000"));
        let ep = Endpoint::resolve(&loc, &Fallback::default(), "bus").unwrap();
        assert_eq!(ep.url(), "ws://localhost:8000/bus");
    }

    #[test]
    fn missing_host_uses_fallback_pair() {
        let fallback = Fallback {
            protocol: "wss".to_string(),
            host: "bus.example.org".to_string(),
        };
        let ep = Endpoint::resolve(&page("http:", None), &fallback, "/bus/").unwrap();
        assert_eq!(ep.scheme, Scheme::Wss);
        assert_eq!(ep.host, "bus.example.org");

        let ep = Endpoint::resolve(&page("http:", Some("  ")), &fallback, "/bus/").unwrap();
        assert_eq!(ep.host, "bus.example.org");
    }

    #[test]
    fn errors() {
        let empty = Fallback {
            protocol: "ws".to_string(),
            host: String::new(),
        };
        assert_eq!(
            Endpoint::resolve(&page("https:", None), &empty, "/"),
            Err(EndpointError::MissingHost)
        );
        assert_eq!(
            Endpoint::resolve(&page("gopher:", Some("h")), &empty, "/"),
            Err(EndpointError::UnknownProtocol("gopher:".to_string()))
        );
    }
}
