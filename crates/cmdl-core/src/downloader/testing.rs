//! Payload-backed fake transport with fault and latency injection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use crate::cancel::CancelToken;
use crate::transport::{HeadInfo, Transport, TransportError};

/// How long a stalled range waits for cancellation before giving up.
const STALL_LIMIT: Duration = Duration::from_secs(10);

/// Misbehavior for the range starting at a given offset.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Fault {
    /// Fail before any byte with this HTTP status.
    Http(u32),
    /// Deliver all but this many bytes, then report success.
    Short(usize),
    /// Deliver this many extra bytes past the range end.
    Overrun(usize),
    /// Deliver this many bytes, then fail with a connection error.
    DropAfter(usize),
    /// Deliver this many bytes, then send nothing until cancelled.
    Stall(usize),
    /// Panic inside the transfer.
    Panic,
}

type PieceHook = Box<dyn Fn(usize) + Send + Sync>;

pub(crate) struct FakeTransport {
    payload: Vec<u8>,
    piece: usize,
    delay: Duration,
    faults: HashMap<u64, Fault>,
    on_piece: Option<PieceHook>,
    head_length: Option<Option<u64>>,
    active: AtomicUsize,
    peak: AtomicUsize,
    requests: Mutex<Vec<(u64, u64)>>,
}

impl FakeTransport {
    pub(crate) fn new(payload: Vec<u8>) -> Self {
        Self {
            payload,
            piece: 64,
            delay: Duration::ZERO,
            faults: HashMap::new(),
            on_piece: None,
            head_length: None,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Buffer size delivered per callback.
    pub(crate) fn piece(mut self, size: usize) -> Self {
        self.piece = size.max(1);
        self
    }

    /// Sleep before each buffer.
    pub(crate) fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn fault(mut self, start: u64, fault: Fault) -> Self {
        self.faults.insert(start, fault);
        self
    }

    /// Called with the running buffer count after each accepted buffer.
    pub(crate) fn on_piece(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_piece = Some(Box::new(hook));
        self
    }

    /// Override the length reported by `head` (None = not reported).
    pub(crate) fn head_length(mut self, length: Option<u64>) -> Self {
        self.head_length = Some(length);
        self
    }

    /// Ranges requested so far, in request order.
    pub(crate) fn requests(&self) -> Vec<(u64, u64)> {
        self.requests.lock().unwrap().clone()
    }

    /// Highest number of simultaneously running transfers.
    pub(crate) fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn stream(
        &self,
        body: &[u8],
        drop_after: Option<usize>,
        on_data: &mut dyn FnMut(&[u8]) -> bool,
    ) -> Result<(), TransportError> {
        let mut sent = 0usize;
        for (n, piece) in body.chunks(self.piece).enumerate() {
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            let piece = match drop_after {
                Some(limit) if sent + piece.len() > limit => {
                    let rest = &piece[..limit - sent];
                    if !rest.is_empty() && !on_data(rest) {
                        return Err(TransportError::Aborted);
                    }
                    return Err(TransportError::Protocol("connection reset".to_string()));
                }
                _ => piece,
            };
            if !on_data(piece) {
                return Err(TransportError::Aborted);
            }
            sent += piece.len();
            if let Some(hook) = &self.on_piece {
                hook(n + 1);
            }
        }
        Ok(())
    }

    fn ranged(
        &self,
        start: u64,
        end: u64,
        cancel: &CancelToken,
        on_data: &mut dyn FnMut(&[u8]) -> bool,
    ) -> Result<(), TransportError> {
        self.requests.lock().unwrap().push((start, end));
        let (start, end) = (start as usize, end as usize);
        let mut body = self.payload[start..=end].to_vec();
        let mut drop_after = None;
        match self.faults.get(&(start as u64)) {
            Some(Fault::Http(code)) => return Err(TransportError::Http(*code)),
            Some(Fault::Short(n)) => body.truncate(body.len().saturating_sub(*n)),
            Some(Fault::Overrun(n)) => body.extend(std::iter::repeat(0xEE).take(*n)),
            Some(Fault::DropAfter(n)) => drop_after = Some(*n),
            Some(Fault::Stall(n)) => {
                let n = (*n).min(body.len());
                if n > 0 && !on_data(&body[..n]) {
                    return Err(TransportError::Aborted);
                }
                return stall(cancel);
            }
            Some(Fault::Panic) => panic!("injected transport panic"),
            None => {}
        }
        self.stream(&body, drop_after, on_data)
    }
}

impl Transport for FakeTransport {
    fn head(&self, _url: &str) -> Result<HeadInfo, TransportError> {
        let content_length = match self.head_length {
            Some(length) => length,
            None => Some(self.payload.len() as u64),
        };
        Ok(HeadInfo {
            content_length,
            accept_ranges: true,
            content_disposition: None,
        })
    }

    fn get_range(
        &self,
        _url: &str,
        start: u64,
        end: u64,
        cancel: &CancelToken,
        on_data: &mut dyn FnMut(&[u8]) -> bool,
    ) -> Result<(), TransportError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let result = self.ranged(start, end, cancel, on_data);
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn get(
        &self,
        _url: &str,
        on_data: &mut dyn FnMut(&[u8]) -> bool,
    ) -> Result<(), TransportError> {
        self.stream(&self.payload, None, on_data)
    }
}

/// Idle connection: no buffers, only the transport's own cancellation polling.
fn stall(cancel: &CancelToken) -> Result<(), TransportError> {
    let started = Instant::now();
    while started.elapsed() < STALL_LIMIT {
        if cancel.is_cancelled() {
            return Err(TransportError::Aborted);
        }
        thread::sleep(Duration::from_millis(5));
    }
    Err(TransportError::Protocol("stalled".to_string()))
}
