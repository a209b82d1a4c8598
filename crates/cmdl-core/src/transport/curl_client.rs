//! libcurl-backed transport: one `Easy` handle per request.

use std::cell::{Cell, RefCell};
use std::str;
use std::time::Duration;

use curl::easy::{Easy, List};

use crate::cancel::CancelToken;

use super::parse;
use super::{HeadInfo, Transport, TransportError};

/// Connection settings for every request made by a `CurlTransport`.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Proxy URL (e.g. `http://127.0.0.1:7890`).
    pub proxy: Option<String>,
    /// Skip TLS peer and host verification.
    pub insecure_tls: bool,
    pub connect_timeout: Duration,
    pub user_agent: String,
    /// Sent as `Authorization: Bearer <token>`.
    pub bearer_token: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            proxy: None,
            insecure_tls: false,
            connect_timeout: Duration::from_secs(30),
            user_agent: concat!("cmdl/", env!("CARGO_PKG_VERSION")).to_string(),
            bearer_token: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Method {
    Head,
    Get,
    Range(u64, u64),
}

/// Final response of one request.
struct Exchange {
    status: u32,
    headers: Vec<String>,
    aborted: bool,
}

/// Explicitly constructed HTTP client; share it behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct CurlTransport {
    options: ClientOptions,
}

impl CurlTransport {
    pub fn new(options: ClientOptions) -> Self {
        Self { options }
    }

    fn handle(&self, url: &str) -> Result<Easy, curl::Error> {
        let mut easy = Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(self.options.connect_timeout)?;
        // Only the connect phase is bounded; transfers run as long as they need.
        easy.timeout(Duration::ZERO)?;
        easy.useragent(&self.options.user_agent)?;
        if let Some(proxy) = &self.options.proxy {
            easy.proxy(proxy)?;
        }
        if self.options.insecure_tls {
            easy.ssl_verify_peer(false)?;
            easy.ssl_verify_host(false)?;
        }
        if let Some(token) = self.options.bearer_token.as_deref().filter(|t| !t.is_empty()) {
            let mut list = List::new();
            list.append(&format!("Authorization: Bearer {token}"))?;
            easy.http_headers(list)?;
        }
        Ok(easy)
    }

    /// Run one request. Body bytes of a non-2xx response never reach `on_data`.
    ///
    /// With a `cancel` token the transfer is also polled from libcurl's
    /// progress callback, which fires about once a second even on a stalled
    /// connection, and ends with `TransportError::Aborted` once it is raised.
    fn perform(
        &self,
        url: &str,
        method: Method,
        cancel: Option<&CancelToken>,
        on_data: &mut dyn FnMut(&[u8]) -> bool,
    ) -> Result<Exchange, TransportError> {
        let mut easy = self.handle(url)?;
        match method {
            Method::Head => easy.nobody(true)?,
            Method::Get => {}
            Method::Range(start, end) => easy.range(&format!("{start}-{end}"))?,
        }
        if cancel.is_some() {
            easy.progress(true)?;
        }

        let headers: RefCell<Vec<String>> = RefCell::new(Vec::new());
        let rejected: Cell<Option<u32>> = Cell::new(None);
        let aborted = Cell::new(false);
        let cancelled = Cell::new(false);

        let performed = {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    let line = s.trim_end();
                    let mut headers = headers.borrow_mut();
                    // Each redirect hop starts a fresh header block.
                    if line.starts_with("HTTP/") {
                        headers.clear();
                    }
                    if !line.is_empty() {
                        headers.push(line.to_string());
                    }
                }
                true
            })?;
            transfer.write_function(|data| {
                if let Some(code) = parse::status_code(&headers.borrow()) {
                    if !(200..300).contains(&code) {
                        rejected.set(Some(code));
                        return Ok(0);
                    }
                }
                if on_data(data) {
                    Ok(data.len())
                } else {
                    aborted.set(true);
                    Ok(0)
                }
            })?;
            if let Some(cancel) = cancel {
                let cancelled = &cancelled;
                transfer.progress_function(move |_, _, _, _| {
                    if cancel.is_cancelled() {
                        cancelled.set(true);
                        return false;
                    }
                    true
                })?;
            }
            transfer.perform()
        };

        if cancelled.get() {
            return Err(TransportError::Aborted);
        }
        if let Some(code) = rejected.get() {
            return Err(TransportError::Http(code));
        }
        match performed {
            Ok(()) => {}
            Err(e) if e.is_write_error() && aborted.get() => {}
            Err(e) => return Err(e.into()),
        }

        let status = easy.response_code()?;
        if !(200..300).contains(&status) {
            return Err(TransportError::Http(status));
        }
        Ok(Exchange {
            status,
            headers: headers.into_inner(),
            aborted: aborted.get(),
        })
    }

    /// One-byte ranged GET: total from `Content-Range` (or `Content-Length`
    /// when the range is ignored). Ranges count as supported only on a 206.
    fn range_probe(&self, url: &str) -> Result<HeadInfo, TransportError> {
        let exchange = self.perform(url, Method::Range(0, 0), None, &mut |_| false)?;
        let mut info = parse::parse_head_info(&exchange.headers);
        info.accept_ranges = exchange.status == 206;
        if info.accept_ranges {
            let total = parse::content_range_total(&exchange.headers).ok_or_else(|| {
                TransportError::Protocol("206 response without a complete length".to_string())
            })?;
            info.content_length = Some(total);
        }
        Ok(info)
    }
}

impl Transport for CurlTransport {
    fn head(&self, url: &str) -> Result<HeadInfo, TransportError> {
        match self.perform(url, Method::Head, None, &mut |_| true) {
            Ok(exchange) => {
                let mut info = parse::parse_head_info(&exchange.headers);
                if info.content_length.is_some() {
                    if !info.accept_ranges {
                        // Many servers answer ranges with 206 without advertising them.
                        info.accept_ranges = match self.range_probe(url) {
                            Ok(probe) => probe.accept_ranges,
                            Err(e) => {
                                tracing::debug!(url, error = %e, "range probe failed");
                                false
                            }
                        };
                    }
                    return Ok(info);
                }
                tracing::debug!(url, "HEAD reported no length, probing with a ranged GET");
            }
            Err(TransportError::Http(code)) => {
                tracing::debug!(url, code, "HEAD refused, probing with a ranged GET");
            }
            Err(e) => return Err(e),
        }
        self.range_probe(url)
    }

    fn get_range(
        &self,
        url: &str,
        start: u64,
        end: u64,
        cancel: &CancelToken,
        on_data: &mut dyn FnMut(&[u8]) -> bool,
    ) -> Result<(), TransportError> {
        let exchange = self.perform(url, Method::Range(start, end), Some(cancel), on_data)?;
        if exchange.aborted {
            return Err(TransportError::Aborted);
        }
        Ok(())
    }

    fn get(
        &self,
        url: &str,
        on_data: &mut dyn FnMut(&[u8]) -> bool,
    ) -> Result<(), TransportError> {
        let exchange = self.perform(url, Method::Get, None, on_data)?;
        if exchange.aborted {
            return Err(TransportError::Aborted);
        }
        Ok(())
    }
}
