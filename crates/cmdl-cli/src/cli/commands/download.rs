//! `cmdl download` – resolve the source, probe it, then run the engine.

use anyhow::{bail, Context, Result};
use cmdl_core::config::CmdlConfig;
use cmdl_core::downloader::{DownloadRequest, Downloader};
use cmdl_core::filename::{derive_filename, sanitize};
use cmdl_core::progress::ByteCounter;
use cmdl_core::transport::{CurlTransport, HeadInfo, Transport};
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::progress::ProgressPrinter;
use crate::cli::source::{resolve, ResolvedSource};
use crate::cli::DownloadArgs;

/// Everything needed to start the engine, decided before any byte moves.
#[derive(Debug)]
pub struct PreparedDownload {
    pub request: DownloadRequest,
    pub direct: bool,
}

pub async fn run_download(cfg: &CmdlConfig, args: DownloadArgs) -> Result<()> {
    let transport: Arc<dyn Transport> = Arc::new(CurlTransport::new(cfg.client_options()));
    let source = args.source.source()?;
    let resolved = resolve(cfg, Arc::clone(&transport), source).await?;

    let head = if args.size.is_some() {
        None
    } else {
        let probe = Arc::clone(&transport);
        let url = resolved.url.clone();
        let info = tokio::task::spawn_blocking(move || probe.head(&url))
            .await
            .context("size probe task")?
            .with_context(|| format!("probing {}", resolved.url))?;
        Some(info)
    };

    let planned = plan_download(cfg, &args, &resolved, head.as_ref())?;
    let request = planned.request;
    tracing::info!(
        url = %request.url,
        dest = %request.dest.display(),
        size = request.expected_size,
        threads = request.threads,
        direct = planned.direct,
        "downloading"
    );

    let downloader = Downloader::new(transport);
    let counter = Arc::new(ByteCounter::new());
    let printer = ProgressPrinter::spawn(Arc::clone(&counter), request.expected_size);
    let dest = request.dest.clone();

    let result = if planned.direct {
        downloader.download_direct_async(request, counter.clone()).await
    } else {
        downloader.download_async(request, counter.clone()).await
    };
    printer.finish().await;
    let report = result.with_context(|| format!("downloading to {}", dest.display()))?;

    println!(
        "saved {} ({} bytes, {} chunk(s) in {:.1}s)",
        dest.display(),
        report.total_size,
        report.chunk_count,
        report.elapsed.as_secs_f64()
    );
    Ok(())
}

/// Destination, size, chunking and mode from flags, config, catalog and probe.
pub fn plan_download(
    cfg: &CmdlConfig,
    args: &DownloadArgs,
    resolved: &ResolvedSource,
    head: Option<&HeadInfo>,
) -> Result<PreparedDownload> {
    let name = match &args.name {
        Some(name) => {
            let clean = sanitize(name);
            if clean.is_empty() {
                bail!("--name {name:?} is not a usable file name");
            }
            clean
        }
        None => derive_filename(
            &resolved.url,
            head.and_then(|h| h.content_disposition.as_deref()),
            resolved.file_name.as_deref(),
        ),
    };
    let dir = args
        .output_dir
        .clone()
        .or_else(|| cfg.download_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    let size = args
        .size
        .or_else(|| head.and_then(|h| h.content_length))
        .unwrap_or(0);
    if size > 0 && resolved.size_hint > 0 && size.abs_diff(resolved.size_hint) > size / 100 {
        tracing::warn!(
            size,
            catalog_size = resolved.size_hint,
            "server size differs from the catalog's estimate"
        );
    }

    let mut direct = args.direct;
    if !direct && head.is_some_and(|h| !h.accept_ranges) {
        tracing::warn!("server does not honor byte ranges; falling back to a single stream");
        direct = true;
    }
    if !direct && size == 0 {
        bail!("server did not report a size; pass --size or --direct");
    }

    let request = DownloadRequest::new(resolved.url.clone(), dir.join(name))
        .expected_size(size)
        .threads(args.threads.unwrap_or(cfg.threads))
        .max_chunk_size(args.max_chunk_size.unwrap_or(cfg.max_chunk_size));
    Ok(PreparedDownload { request, direct })
}
