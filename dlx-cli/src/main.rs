mod cli;
mod error;
mod logging;
mod output;

use std::collections::HashMap;
use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use dlx_engine::{
    DownloadOptions, DownloadOutcome, Downloader, DownloaderConfig, ExtractOptions,
    ExtractorRegistry, MediaItem, ProxyConfig, Transport,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, warn};

use crate::cli::{Cli, Commands, ExtractArgs, RequestArgs};
use crate::error::{AppError, Result};
use crate::output::OutputManager;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("dlx {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    // Held until the end of main so the file writer is flushed.
    let _guard = match logging::init_logging(cli.log_level.as_deref(), cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("Application error: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `false` when at least one URL or item failed.
async fn run(command: Commands) -> Result<bool> {
    match command {
        Commands::Download {
            urls,
            stream,
            output_dir,
            output_name,
            ffmpeg,
            request,
            extract,
        } => {
            let transport = Arc::new(Transport::new(downloader_config(&request)?)?);
            let registry = ExtractorRegistry::with_universal(Arc::clone(&transport));
            let extract_options = extract_options(&extract, request.cookie.clone())?;
            let base_options = DownloadOptions {
                output_dir,
                output_name,
                stream,
                merge_tool: ffmpeg,
                ..DownloadOptions::default()
            };
            let bar = progress_bar();

            let mut ok = true;
            for url in &urls {
                let items = match registry.extract(url, &extract_options).await {
                    Ok(items) => items,
                    Err(e) => {
                        eprintln!("{url}: {e}");
                        ok = false;
                        continue;
                    }
                };

                let mut options = base_options.clone();
                if items.len() > 1 && options.output_name.take().is_some() {
                    warn!(url = %url, items = items.len(), "Ignoring --output-name for multi-item URL");
                }
                let downloader = Downloader::new(
                    Arc::clone(&transport),
                    Arc::new(bar.clone()),
                    options,
                );

                // Every item is attempted; failures are reported one by one.
                for item in &items {
                    if let Some(media) = item.as_media() {
                        bar.set_message(media.title.clone());
                    }
                    match downloader.download_item(item).await {
                        Ok(outcome) => report_outcome(&outcome),
                        Err(e) => {
                            eprintln!("{e}");
                            ok = false;
                        }
                    }
                }
            }
            Ok(ok)
        }

        Commands::Info {
            urls,
            json,
            request,
            extract,
        } => {
            let transport = Arc::new(Transport::new(downloader_config(&request)?)?);
            let registry = ExtractorRegistry::with_universal(transport);
            let extract_options = extract_options(&extract, request.cookie.clone())?;
            let printer = OutputManager::new(!json && std::io::stdout().is_terminal());

            let mut ok = true;
            let mut items: Vec<MediaItem> = Vec::new();
            for url in &urls {
                match registry.extract(url, &extract_options).await {
                    Ok(extracted) => items.extend(extracted),
                    Err(e) => {
                        eprintln!("{url}: {e}");
                        ok = false;
                    }
                }
            }

            for item in &items {
                if let MediaItem::Failed(failure) = item {
                    eprintln!("{}", printer.format_failure(failure));
                    ok = false;
                }
            }
            let media: Vec<_> = items.iter().filter_map(MediaItem::as_media).collect();
            if json {
                println!("{}", printer.format_json(&media)?);
            } else {
                for media in media {
                    println!("{}", printer.format_media(media));
                }
            }
            Ok(ok)
        }

        Commands::Version => Ok(true),
    }
}

fn downloader_config(args: &RequestArgs) -> Result<DownloaderConfig> {
    let mut builder = DownloaderConfig::builder()
        .retry_times(args.retry)
        .debug(args.debug)
        .danger_accept_invalid_certs(args.insecure)
        .use_system_proxy(!args.no_system_proxy);

    if let Some(cookie) = &args.cookie {
        builder = builder.cookie(cookie);
    }
    if let Some(user_agent) = &args.user_agent {
        builder = builder.user_agent(user_agent);
    }
    if let Some(referer) = &args.referer {
        builder = builder.referer(referer);
    }
    if let Some(url) = &args.proxy {
        let mut proxy = ProxyConfig::new(url, args.proxy_type);
        if let Some(user) = &args.proxy_user {
            proxy = proxy.with_auth(user, args.proxy_pass.clone().unwrap_or_default());
        }
        builder = builder.proxy(proxy);
    }
    Ok(builder.build())
}

fn extract_options(args: &ExtractArgs, cookie: Option<String>) -> Result<ExtractOptions> {
    Ok(ExtractOptions {
        playlist: args.playlist,
        items: args.items.clone(),
        item_start: args.item_start,
        item_end: args.item_end,
        thread_number: args.threads,
        cookie,
        episode_title_only: args.episode_title_only,
        tokens: parse_tokens(&args.tokens)?,
    })
}

/// Parse `key=value` pairs.
fn parse_tokens(tokens: &[String]) -> Result<HashMap<String, String>> {
    tokens
        .iter()
        .map(|token| {
            token
                .split_once('=')
                .map(|(key, value)| (key.trim().to_string(), value.to_string()))
                .ok_or_else(|| AppError::InvalidInput(format!("Invalid token format: {token}")))
        })
        .collect()
}

fn progress_bar() -> ProgressBar {
    let style = ProgressStyle::with_template(
        "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
    )
    .map(|style| style.progress_chars("#>-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    ProgressBar::new(0).with_style(style)
}

fn report_outcome(outcome: &DownloadOutcome) {
    for path in outcome.paths() {
        info!(path = %path.display(), "Saved");
    }
}
