//! Minimal HTTP/1.1 server for integration tests: HEAD, ranged GET, plain GET.
//!
//! Serves one static body on every path, one request per connection. Options
//! simulate servers that block HEAD, ignore or silently honor ranges, fail or
//! stall a specific range, or require a bearer token.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct RangeServerOptions {
    /// HEAD answers 405.
    pub block_head: bool,
    /// HEAD omits Content-Length.
    pub hide_length: bool,
    /// GET ignores Range and always returns 200 with the full body.
    pub ignore_ranges: bool,
    /// Ranges are honored but `Accept-Ranges` is never sent.
    pub hide_accept_ranges: bool,
    /// Ranged GETs starting at this offset answer 500.
    pub fail_range_at: Option<u64>,
    /// Wait this long before answering the failing range.
    pub fail_delay: Duration,
    /// Ranged GETs starting at this offset send 4 bytes, then nothing for 30 s.
    pub stall_range_at: Option<u64>,
    /// Ranged GETs starting at this offset send only half of the range.
    pub truncate_range_at: Option<u64>,
    /// Sent as `Content-Disposition` on HEAD and GET.
    pub content_disposition: Option<String>,
    /// Requests without `Authorization: Bearer <token>` answer 401.
    pub bearer_token: Option<String>,
}

pub struct RangeServer {
    pub url: String,
    requests: Arc<AtomicUsize>,
}

impl RangeServer {
    /// Requests served so far.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

/// Serve `body` with default behavior. The server runs until the process exits.
pub fn start(body: Vec<u8>) -> RangeServer {
    start_with_options(body, RangeServerOptions::default())
}

pub fn start_with_options(body: Vec<u8>, opts: RangeServerOptions) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let opts = Arc::new(opts);
    let requests = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let opts = Arc::clone(&opts);
            counter.fetch_add(1, Ordering::SeqCst);
            thread::spawn(move || handle(stream, &body, &opts));
        }
    });
    RangeServer {
        url: format!("http://127.0.0.1:{port}/files/model.safetensors"),
        requests,
    }
}

struct Request {
    method: String,
    range: Option<(u64, u64)>,
    authorization: Option<String>,
}

fn handle(mut stream: TcpStream, body: &[u8], opts: &RangeServerOptions) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let Some(req) = read_request(&mut stream) else {
        return;
    };

    if let Some(token) = &opts.bearer_token {
        if req.authorization.as_deref() != Some(&format!("Bearer {token}")) {
            respond(&mut stream, "401 Unauthorized", &[], b"");
            return;
        }
    }

    let total = body.len() as u64;
    let mut headers: Vec<String> = Vec::new();
    if !opts.ignore_ranges && !opts.hide_accept_ranges {
        headers.push("Accept-Ranges: bytes".to_string());
    }
    if let Some(cd) = &opts.content_disposition {
        headers.push(format!("Content-Disposition: {cd}"));
    }

    match req.method.as_str() {
        "HEAD" => {
            if opts.block_head {
                respond(&mut stream, "405 Method Not Allowed", &[], b"");
                return;
            }
            if !opts.hide_length {
                headers.push(format!("Content-Length: {total}"));
            }
            let head = format!("HTTP/1.1 200 OK\r\n{}\r\n", join_headers(&headers));
            let _ = stream.write_all(head.as_bytes());
        }
        "GET" => match req.range.filter(|_| !opts.ignore_ranges) {
            Some((start, end)) => {
                if opts.fail_range_at == Some(start) {
                    thread::sleep(opts.fail_delay);
                    respond(&mut stream, "500 Internal Server Error", &[], b"boom");
                    return;
                }
                let end = end.min(total.saturating_sub(1));
                if start > end {
                    headers.push(format!("Content-Range: bytes */{total}"));
                    respond(&mut stream, "416 Range Not Satisfiable", &headers, b"");
                    return;
                }
                let mut slice = &body[start as usize..=end as usize];
                if opts.truncate_range_at == Some(start) {
                    slice = &slice[..slice.len() / 2];
                }
                headers.push(format!("Content-Range: bytes {start}-{end}/{total}"));
                if opts.stall_range_at == Some(start) {
                    respond(&mut stream, "206 Partial Content", &headers, &slice[..slice.len().min(4)]);
                    let _ = stream.flush();
                    thread::sleep(Duration::from_secs(30));
                    return;
                }
                respond(&mut stream, "206 Partial Content", &headers, slice);
            }
            None => respond(&mut stream, "200 OK", &headers, body),
        },
        _ => respond(&mut stream, "405 Method Not Allowed", &[], b""),
    }
}

fn join_headers(headers: &[String]) -> String {
    headers.iter().map(|h| format!("{h}\r\n")).collect()
}

/// Status line, headers, `Content-Length` of `payload`, then `payload`.
/// The advertised length is the full range even when `payload` was cut short.
fn respond(stream: &mut TcpStream, status: &str, headers: &[String], payload: &[u8]) {
    let declared = headers
        .iter()
        .find_map(|h| h.strip_prefix("Content-Range: bytes "))
        .and_then(|r| r.split_once('/'))
        .and_then(|(span, _)| span.split_once('-'))
        .and_then(|(a, b)| Some(b.parse::<u64>().ok()? - a.parse::<u64>().ok()? + 1))
        .unwrap_or(payload.len() as u64);
    let head = format!(
        "HTTP/1.1 {status}\r\nContent-Length: {declared}\r\nConnection: close\r\n{}\r\n",
        join_headers(headers)
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(payload);
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut buf = Vec::with_capacity(1024);
    let mut tmp = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut tmp).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
        if buf.len() > 64 * 1024 {
            return None;
        }
    }
    let text = String::from_utf8_lossy(&buf);
    let mut lines = text.split("\r\n");
    let method = lines.next()?.split_whitespace().next()?.to_ascii_uppercase();
    let mut range = None;
    let mut authorization = None;
    for line in lines.take_while(|l| !l.is_empty()) {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if name.eq_ignore_ascii_case("range") {
            range = value
                .strip_prefix("bytes=")
                .and_then(|r| r.split_once('-'))
                .and_then(|(a, b)| {
                    let start = a.parse().ok()?;
                    let end = if b.is_empty() { u64::MAX } else { b.parse().ok()? };
                    Some((start, end))
                });
        } else if name.eq_ignore_ascii_case("authorization") {
            authorization = Some(value.to_string());
        }
    }
    Some(Request {
        method,
        range,
        authorization,
    })
}
