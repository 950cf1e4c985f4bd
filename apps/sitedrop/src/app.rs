//! Command execution.

use std::sync::Arc;

use anyhow::Context;
use sitedrop_pages_api::Client;
use sitedrop_publish::{
    HeaderRules, ProgressCallback, PublishOptions, Publisher, UploadProgress, build_manifest,
    scan_directory,
};
use tracing::info;

use crate::cli::{Cli, Command, DeployArgs, ScanArgs};
use crate::config;

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Deploy(args) => deploy(args).await,
        Command::Scan(args) => scan(args).await,
    }
}

async fn deploy(args: DeployArgs) -> anyhow::Result<()> {
    let config = config::load(args.config.as_deref())?;

    let rules = HeaderRules::parse(&args.headers)?;
    let headers_override = if rules.is_empty() {
        None
    } else {
        info!(headers = rules.len(), "using global header rules");
        Some(rules.render().into_bytes())
    };

    let mut client = Client::new(&args.account_id, &args.api_token)
        .context("creating API client")?;
    if let Some(url) = args.api_url.filter(|u| !u.is_empty()) {
        client = client.with_base_url(url);
    }

    let publisher = Publisher::new(Arc::new(client), config)?.with_upload_token(args.upload_token);

    let progress: ProgressCallback = Arc::new(|p: UploadProgress| {
        info!("uploaded {}/{}", p.uploaded, p.total);
    });
    let options = PublishOptions {
        project: args.project,
        directory: args.dir,
        branch: args.branch,
        skip_caching: args.skip_caching,
        headers_override,
        progress: Some(progress),
    };

    let outcome = publisher
        .publish(&options)
        .await
        .with_context(|| format!("publishing {}", options.directory.display()))?;

    info!(
        total = outcome.report.total,
        uploaded = outcome.report.uploaded,
        skipped = outcome.report.skipped,
        elapsed_ms = outcome.report.elapsed.as_millis() as u64,
        "done"
    );
    println!("deployment: {}", outcome.deployment.id);
    if !outcome.deployment.url.is_empty() {
        println!("url: {}", outcome.deployment.url);
    }
    Ok(())
}

async fn scan(args: ScanArgs) -> anyhow::Result<()> {
    let config = config::load(args.config.as_deref())?;

    let files = tokio::task::spawn_blocking(move || {
        scan_directory(&args.dir, &config.limits, config.upload.hash_workers)
    })
    .await??;

    let manifest = build_manifest(&files);
    println!("{}", serde_json::to_string_pretty(&manifest)?);
    Ok(())
}
