use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use saved_post_extractor::chromium_profile::{clone_profile, ProfileLocation};
use saved_post_extractor::config::Config;
use saved_post_extractor::export::{ExportError, SheetsExporter, StaticToken};
use saved_post_extractor::page::chrome::{BrowserSettings, ChromeBrowser};
use saved_post_extractor::page::PageContext;
use saved_post_extractor::{ExtractionResult, Extractor};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    info!("Starting saved-post-extractor");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(
        url = %config.saved_posts_url,
        api_enabled = config.api_enabled,
        growth_signal = ?config.load.growth_signal,
        "Configuration loaded"
    );

    tokio::fs::create_dir_all(&config.work_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create work directory: {}",
                config.work_dir.display()
            )
        })?;

    let profile = match config.chrome_profile.as_deref() {
        Some(path) => Some(clone_profile(&config.work_dir, &ProfileLocation::resolve(path)).await?),
        None => {
            warn!("No CHROME_PROFILE configured - the browser will not be logged in");
            None
        }
    };

    let settings = BrowserSettings {
        chrome_path: config
            .chrome_path
            .as_ref()
            .map(|p| p.display().to_string()),
        user_data_dir: profile.as_ref().map(|p| p.user_data_dir.clone()),
        profile_directory: profile.and_then(|p| p.profile_directory),
        headless: config.headless,
        request_timeout: config.browser_timeout,
    };
    let browser = ChromeBrowser::launch(&settings).await?;

    let outcome = extract(&browser, &config).await;
    browser.shutdown().await;
    let result = outcome?;

    write_output(&config, &result).await?;

    if let Some(token) = config.sheets_access_token.clone() {
        let exporter = SheetsExporter::new(&config.sheets_api_base)?;
        match exporter.export(&StaticToken::new(Some(token)), &result).await {
            Ok(report) => info!(url = %report.url, rows = report.rows_added, "Spreadsheet ready"),
            Err(ExportError::Empty) => warn!("No data to export"),
            Err(e) => return Err(e).context("Spreadsheet export failed"),
        }
    }

    info!("Done");
    Ok(())
}

async fn extract(browser: &ChromeBrowser, config: &Config) -> Result<ExtractionResult> {
    let page = browser
        .open(&config.saved_posts_url, config.navigation_settle)
        .await?;
    page.navigate_if_needed(&config.saved_posts_url, config.navigation_settle)
        .await?;

    let page: Arc<dyn PageContext> = Arc::new(page);
    let extractor = Extractor::from_config(page, config)?;

    let cancel = extractor.cancel_token();
    let watcher = tokio::spawn(cancel_on_signal(cancel));
    let result = extractor.run().await;
    watcher.abort();

    Ok(result?)
}

async fn write_output(config: &Config, result: &ExtractionResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result).context("Failed to serialize result")?;
    match config.output_path {
        Some(ref path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), count = result.count, "Results written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,saved_post_extractor=debug"));

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    // Logs go to stderr; stdout carries the result.
    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}

/// Cancel the running extraction on Ctrl+C or SIGTERM.
async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown requested, cancelling extraction");
    cancel.cancel();
}
