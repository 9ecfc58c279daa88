//! Connection string resolution.
//!
//! Operators configure the graph store with the same connection string they
//! would hand a Bolt driver (`bolt://db:7687`, `neo4j+s://cluster.example`).
//! The HTTP API listens on a different port, so Bolt-family strings are mapped
//! onto the matching HTTP listener:
//!
//! | Scheme                                   | HTTP scheme | Port when unset or 7687 |
//! |------------------------------------------|-------------|-------------------------|
//! | `bolt`, `neo4j`                          | `http`      | 7474                    |
//! | `bolt+s`, `bolt+ssc`, `neo4j+s`, `neo4j+ssc` | `https` | 7473                    |
//! | `http`, `https`                          | unchanged   | unchanged               |
//!
//! A Bolt-family string with any other port is rejected: the HTTP port cannot
//! be derived from it, so such deployments must be configured with an
//! `http://` or `https://` string naming the HTTP listener.

use convograph_core::graph::GraphError;
use reqwest::Url;

/// Default Bolt listener port.
pub const BOLT_PORT: u16 = 7687;
/// Default plain-text HTTP listener port.
pub const HTTP_PORT: u16 = 7474;
/// Default TLS HTTP listener port.
pub const HTTPS_PORT: u16 = 7473;

/// Resolve a connection string into the base URL of the HTTP API.
///
/// The returned URL always ends in `/` and carries no credentials, path or
/// query.
///
/// # Errors
///
/// Returns [`GraphError::InvalidUri`] if the string does not parse, has no
/// host, uses an unsupported scheme, or is a Bolt-family string with a
/// non-default port.
pub fn resolve(uri: &str) -> Result<Url, GraphError> {
    let invalid = |reason: &str| GraphError::InvalidUri {
        uri: uri.to_string(),
        reason: reason.to_string(),
    };

    let parsed = Url::parse(uri).map_err(|e| invalid(&e.to_string()))?;

    let (secure, bolt_family) = match parsed.scheme() {
        "http" => (false, false),
        "https" => (true, false),
        "bolt" | "neo4j" => (false, true),
        "bolt+s" | "bolt+ssc" | "neo4j+s" | "neo4j+ssc" => (true, true),
        other => return Err(invalid(&format!("unsupported scheme '{other}'"))),
    };

    let host = parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| invalid("missing host"))?;

    let port = match (parsed.port(), bolt_family) {
        (Some(BOLT_PORT) | None, true) => Some(if secure { HTTPS_PORT } else { HTTP_PORT }),
        (Some(other), true) => {
            return Err(invalid(&format!(
                "bolt port {other} has no known HTTP listener; use an http(s):// connection string"
            )));
        },
        (port, false) => port,
    };

    let scheme = if secure { "https" } else { "http" };
    let base = match port {
        Some(port) => format!("{scheme}://{host}:{port}/"),
        None => format!("{scheme}://{host}/"),
    };

    Url::parse(&base).map_err(|e| invalid(&e.to_string()))
}
