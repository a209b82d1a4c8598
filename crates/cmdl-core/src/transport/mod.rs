//! HTTP transport seam.
//!
//! The engine never talks to libcurl directly: it gets a `Transport` at
//! construction time. `CurlTransport` is the production implementation;
//! tests inject fakes with simulated payloads, failures and latency.

mod curl_client;
mod parse;

use thiserror::Error;

use crate::cancel::CancelToken;

pub use curl_client::{ClientOptions, CurlTransport};
pub use parse::{content_range_total, parse_head_info, status_code};

/// Metadata from a size probe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadInfo {
    /// Total size in bytes, if the server reported one.
    pub content_length: Option<u64>,
    /// True if the server advertised or honored byte ranges.
    pub accept_ranges: bool,
    /// Raw `Content-Disposition` value (filename hint).
    pub content_disposition: Option<String>,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// Final response status was not 2xx.
    #[error("HTTP {0}")]
    Http(u32),
    /// The body receiver asked to stop.
    #[error("transfer aborted by receiver")]
    Aborted,
    #[error("{0}")]
    Protocol(String),
}

/// Blocking HTTP operations the engine and catalog need.
///
/// Body callbacks receive each buffered read as it arrives and return
/// `false` to abort the transfer, which then ends with `TransportError::Aborted`.
/// Ranged transfers also end with `Aborted` once `cancel` is raised, even
/// while the server sends nothing.
pub trait Transport: Send + Sync {
    /// Probe the resource size (HEAD, with a ranged-GET fallback).
    fn head(&self, url: &str) -> Result<HeadInfo, TransportError>;

    /// GET with `Range: bytes=start-end` (inclusive), streaming the body.
    fn get_range(
        &self,
        url: &str,
        start: u64,
        end: u64,
        cancel: &CancelToken,
        on_data: &mut dyn FnMut(&[u8]) -> bool,
    ) -> Result<(), TransportError>;

    /// Plain GET, streaming the body.
    fn get(&self, url: &str, on_data: &mut dyn FnMut(&[u8]) -> bool)
        -> Result<(), TransportError>;
}

/// GET `url` and collect the whole body in memory (small JSON responses).
pub fn get_bytes(transport: &dyn Transport, url: &str) -> Result<Vec<u8>, TransportError> {
    let mut body = Vec::new();
    transport.get(url, &mut |data| {
        body.extend_from_slice(data);
        true
    })?;
    Ok(body)
}
