//! Periodic progress line on stderr, sampled from the engine's byte counter.

use cmdl_core::progress::{ByteCounter, ProgressStats};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const PROGRESS_INTERVAL_MS: u64 = 500;
const MIB: f64 = 1_048_576.0;

pub struct ProgressPrinter {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl ProgressPrinter {
    /// Start printing every 500 ms until `finish` is called.
    pub fn spawn(counter: Arc<ByteCounter>, total_bytes: u64) -> Self {
        let (stop, mut stopped) = oneshot::channel::<()>();
        let started = Instant::now();
        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_millis(PROGRESS_INTERVAL_MS));
            loop {
                tokio::select! {
                    _ = tick.tick() => {}
                    _ = &mut stopped => break,
                }
                let stats = ProgressStats {
                    bytes_done: counter.get(),
                    total_bytes,
                    elapsed_secs: started.elapsed().as_secs_f64(),
                };
                eprint!("\r{}", format_line(&stats));
            }
            let stats = ProgressStats {
                bytes_done: counter.get(),
                total_bytes,
                elapsed_secs: started.elapsed().as_secs_f64(),
            };
            eprintln!("\r{}", format_line(&stats));
        });
        Self { stop, handle }
    }

    /// Print the final line and stop.
    pub async fn finish(self) {
        let _ = self.stop.send(());
        let _ = self.handle.await;
    }
}

/// `done / total MiB (pct)  rate MiB/s  ETA`; total is `?` when unknown.
pub fn format_line(stats: &ProgressStats) -> String {
    let done_mib = stats.bytes_done as f64 / MIB;
    let rate_mib = stats.bytes_per_sec() / MIB;
    let eta = stats
        .eta_secs()
        .map(format_eta)
        .unwrap_or_else(|| "?".to_string());
    if stats.total_bytes == 0 {
        return format!("  {:.1} MiB  {:.2} MiB/s  ", done_mib, rate_mib);
    }
    format!(
        "  {:.1} / {:.1} MiB ({:.1}%)  {:.2} MiB/s  ETA {}  ",
        done_mib,
        stats.total_bytes as f64 / MIB,
        stats.fraction() * 100.0,
        rate_mib,
        eta
    )
}

fn format_eta(secs: f64) -> String {
    let secs = secs.round() as u64;
    match secs {
        0..=59 => format!("{secs}s"),
        60..=3599 => format!("{}m{:02}s", secs / 60, secs % 60),
        _ => format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60),
    }
}
