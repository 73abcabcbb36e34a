use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::config;
use crate::content::{self, Content};
use crate::data::{GitHubRepositoryService, RepositoryService};
use crate::github;
use crate::loader::{FetchState, RepoLoader};
use crate::present::{self, DisplayWindow};
use crate::ui;

const LIST_WAIT_MARGIN: Duration = Duration::from_secs(5);
const LIST_FALLBACK_WIDTH: usize = 80;

/// Values taken from the command line. Each one, when set, wins over the
/// config file and environment.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub user: Option<String>,
    pub window: Option<DisplayWindow>,
    pub config_file: Option<PathBuf>,
    pub content_file: Option<PathBuf>,
    pub list: bool,
}

struct Setup {
    content: Content,
    service: Arc<dyn RepositoryService + Send + Sync>,
    identity: String,
    window: DisplayWindow,
    timeout: Duration,
}

pub fn run(options: RunOptions) -> Result<()> {
    let setup = prepare(&options)?;
    info!(
        identity = %setup.identity,
        window = %setup.window,
        list = options.list,
        "starting repofolio"
    );

    if options.list {
        return print_list(setup);
    }

    let mut model = ui::Model::new(ui::Options {
        content: setup.content,
        service: setup.service,
        identity: setup.identity,
        window: setup.window,
    });
    model.run()
}

fn prepare(options: &RunOptions) -> Result<Setup> {
    let cfg = config::load(config::LoadOptions {
        config_file: options.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;

    let content_path = options.content_file.as_ref().or(cfg.content.path.as_ref());
    let content = content::load(content_path.map(PathBuf::as_path)).context("load content")?;

    let identity = resolve_identity(
        options.user.as_deref(),
        &cfg.github.identity,
        content.profile.github_handle().as_deref(),
    );
    let window = options.window.unwrap_or(cfg.display.window);

    let client = github::Client::new(github::ClientConfig {
        user_agent: cfg.github.user_agent.clone(),
        base_url: cfg.github.api_base.clone(),
        timeout: cfg.github.timeout,
        http_client: None,
    })
    .context("create GitHub client")?;
    let service: Arc<dyn RepositoryService + Send + Sync> =
        Arc::new(GitHubRepositoryService::new(Arc::new(client)));

    Ok(Setup {
        content,
        service,
        identity,
        window,
        timeout: cfg.github.timeout,
    })
}

/// First non-blank of the command line, the config and the profile handle.
fn resolve_identity(cli: Option<&str>, configured: &str, profile: Option<&str>) -> String {
    [cli, Some(configured), profile]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|candidate| !candidate.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn print_list(setup: Setup) -> Result<()> {
    let mut loader = RepoLoader::new(setup.service);
    loader.watch(&setup.identity);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .context("spinner template")?
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", " "]),
    );
    spinner.set_message(format!("Loading projects for @{}...", setup.identity));
    spinner.enable_steady_tick(Duration::from_millis(120));
    loader.wait(setup.timeout + LIST_WAIT_MARGIN);
    spinner.finish_and_clear();

    let width = crossterm::terminal::size()
        .map(|(cols, _)| usize::from(cols))
        .unwrap_or(LIST_FALLBACK_WIDTH);

    match loader.state() {
        FetchState::Ready(items) => {
            let cards = present::present(items, setup.window);
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(present::plain_text(&cards, width).as_bytes())
                .context("write listing")?;
            stdout.flush().context("flush listing")?;
            Ok(())
        }
        FetchState::Error(message) => bail!("Error loading projects: {message}"),
        FetchState::Loading => bail!(
            "Error loading projects: no answer within {}",
            humantime::format_duration(setup.timeout + LIST_WAIT_MARGIN)
        ),
    }
}
