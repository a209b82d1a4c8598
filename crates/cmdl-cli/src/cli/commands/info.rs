//! `cmdl info` – show what a catalog source resolves to.

use anyhow::{Context, Result};
use cmdl_core::catalog::{CatalogClient, ModelVersion};
use cmdl_core::config::CmdlConfig;
use cmdl_core::transport::{CurlTransport, Transport};
use std::sync::Arc;

use crate::cli::source::{lookup_version, Source};
use crate::cli::SourceArgs;

pub async fn run_info(cfg: &CmdlConfig, args: SourceArgs) -> Result<()> {
    let source = args.source()?;
    if matches!(source, Source::Url(_)) {
        anyhow::bail!("info needs --model-id, --model-version-id or --hash");
    }
    let transport: Arc<dyn Transport> = Arc::new(CurlTransport::new(cfg.client_options()));
    let catalog_url = cfg.catalog_url.clone();
    let version = tokio::task::spawn_blocking(move || {
        let catalog = CatalogClient::new(transport, &catalog_url)?;
        lookup_version(&catalog, &source)
    })
    .await
    .context("catalog lookup task")??;

    print!("{}", describe(&version));
    Ok(())
}

/// Human-readable summary of a model version and its files.
pub fn describe(version: &ModelVersion) -> String {
    let mut out = String::new();
    if let Some(model) = &version.model {
        let kind = model.kind.as_deref().unwrap_or("model");
        out.push_str(&format!("Model:    {} ({kind})\n", model.name));
    }
    if let Some(id) = version.model_id {
        out.push_str(&format!("Model id: {id}\n"));
    }
    out.push_str(&format!("Version:  {} (id {})\n", version.name, version.id));
    if let Some(base) = &version.base_model {
        out.push_str(&format!("Base:     {base}\n"));
    }
    if let Some(url) = &version.download_url {
        out.push_str(&format!("URL:      {url}\n"));
    }
    let primary = version.primary_file().map(|f| f.name.as_str());
    out.push_str("Files:\n");
    for file in &version.files {
        let marker = if Some(file.name.as_str()) == primary { "*" } else { " " };
        out.push_str(&format!(
            "  {marker} {}  {:.1} MiB\n",
            file.name,
            file.size_bytes() as f64 / 1_048_576.0
        ));
    }
    out
}
