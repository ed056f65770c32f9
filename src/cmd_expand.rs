//! The `expand` and `check-config` commands.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use unfurl_config::{Config, ConfigLoader, ConfigValidator};
use unfurl_core::{Controller, RunState};
use unfurl_tree_cdp::{CdpClient, CdpTree, DatasetMarkers, PageSession};

use crate::adapters::expander_config;
use crate::report::ProgressReporter;

/// Options of one `expand` invocation.
pub(crate) struct ExpandArgs {
    pub url: String,
    pub endpoint: Option<String>,
    pub attach: bool,
    pub timeout: Option<u64>,
}

/// Validate `config`, logging warnings. Errors abort.
fn validate(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let result = ConfigValidator::validate(config)?;
    for warning in &result.warnings {
        warn!("Config {}: {}", warning.path, warning.message);
    }
    match result.into_error() {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

async fn open_page(
    client: &CdpClient,
    config: &Config,
    args: &ExpandArgs,
) -> Result<PageSession, Box<dyn std::error::Error>> {
    let load_timeout = Duration::from_secs(config.browser.load_timeout_secs);

    if args.attach {
        let page = client.attach_matching(&args.url).await?;
        page.wait_for_load(load_timeout).await?;
        info!("Attached to {}", page.get_url().await?);
        return Ok(page);
    }

    let page = client.new_page(None).await?;
    page.navigate(&args.url, load_timeout).await?;
    Ok(page)
}

/// Expand everything on one page.
pub(crate) async fn run_expand(
    config: &Config,
    args: ExpandArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    validate(config)?;
    let expander = expander_config(config)?;

    let endpoint = args
        .endpoint
        .clone()
        .unwrap_or_else(|| config.browser.endpoint.clone());
    let client = CdpClient::connect_with_timeout(
        &endpoint,
        Duration::from_secs(config.browser.request_timeout_secs),
    )
    .await?;

    let page = Arc::new(open_page(&client, config, &args).await?);
    match page.get_title().await {
        Ok(title) => info!("Page ready: {}", title),
        Err(e) => warn!("Could not read page title: {}", e),
    }

    let tree = CdpTree::attach(Arc::clone(&page)).await?;
    let markers = Arc::new(DatasetMarkers::new(
        tree.clone(),
        config.selectors.marker.clone(),
    ));
    let controller = Controller::new(Arc::new(tree), markers, expander)?
        .with_observer(Arc::new(ProgressReporter));

    controller.start();

    let deadline = async {
        match args.timeout {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };

    let state = tokio::select! {
        state = controller.wait() => state,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping expansion");
            controller.stop();
            controller.state()
        }
        _ = deadline => {
            warn!("Timed out, stopping expansion");
            controller.stop();
            controller.state()
        }
    };

    let counters = controller.counters();
    if state != RunState::Completed {
        return Err(format!(
            "Expansion did not complete: {} of {} sections expanded",
            counters.actuated, counters.discovered
        )
        .into());
    }
    Ok(())
}

/// Load and validate the configuration file, printing every finding.
pub(crate) fn check_config(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::load(path)?;
    let result = ConfigValidator::validate(&config)?;

    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for error in &result.errors {
        println!("error: {}: {}", error.path, error.message);
    }

    if let Some(err) = result.into_error() {
        return Err(err.into());
    }
    expander_config(&config)?;

    println!("Configuration OK: {}", path.display());
    Ok(())
}
