use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use checksout_console::gate::{AutoConfirm, TerminalConfirm};
use checksout_console::navigation::SessionExit;
use checksout_console::tui;
use checksout_console::{
    Confirmation, ConfirmPrompt, ConfirmationGate, Config, HttpClient, RepoActivity,
    SyncController,
};

#[derive(Parser)]
#[command(name = "checksout")]
#[command(about = "Enable checks-out approvals on your repositories and organizations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path (defaults to XDG config location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Do not ask before enabling anything
    #[arg(short, long, global = true)]
    yes: bool,

    /// Organization to work in (defaults to your own account)
    #[arg(long, global = true)]
    org: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List repositories and whether approvals are enabled
    Repos,

    /// List your organizations and whether they are enabled
    Orgs,

    /// Enable approvals for a repository (owner/name)
    Enable { slug: String },

    /// Disable approvals for a repository (owner/name)
    Disable { slug: String },

    /// Enable a whole organization
    EnableOrg { login: String },

    /// Disable a whole organization
    DisableOrg { login: String },

    /// Validate the approval configuration of a repository (owner/name)
    Validate { slug: String },

    /// Delete your account and sign out
    DeleteAccount,

    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        config_command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Print the configuration file location
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = load_config(cli.config.clone())?;

    // Only initialize logging for CLI commands, not TUI
    // TUI has its own log viewer and stdout logging breaks raw mode
    let command = match cli.command {
        None => return tui::run_tui(config, cli.org).await,
        Some(command) => command,
    };
    init_logging(cli.verbose, &config);
    debug!("checksout-console v{}", env!("CARGO_PKG_VERSION"));

    let options = Options {
        yes: cli.yes,
        org: cli.org,
    };

    match command {
        Commands::Repos => cmd_repos(&options, &config).await,
        Commands::Orgs => cmd_orgs(&options, &config).await,
        Commands::Enable { slug } => cmd_set_repo(&slug, true, &options, &config).await,
        Commands::Disable { slug } => cmd_set_repo(&slug, false, &options, &config).await,
        Commands::EnableOrg { login } => cmd_set_org(&login, true, &options, &config).await,
        Commands::DisableOrg { login } => cmd_set_org(&login, false, &options, &config).await,
        Commands::Validate { slug } => cmd_validate(&slug, &options, &config).await,
        Commands::DeleteAccount => cmd_delete_account(&options, &config).await,
        Commands::Config { config_command } => cmd_config(config_command, &config),
    }
}

/// Global flags shared by every subcommand
struct Options {
    yes: bool,
    org: Option<String>,
}

impl Options {
    fn gate(&self) -> Box<dyn ConfirmationGate> {
        if self.yes {
            Box::new(AutoConfirm)
        } else {
            Box::new(TerminalConfirm)
        }
    }
}

/// Initialize logging based on verbosity level and the config defaults
fn init_logging(verbose: bool, config: &Config) {
    let default_level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.logging.color);

    if config.logging.format == "full" {
        tracing_subscriber::registry().with(layer).with(filter).init();
    } else {
        tracing_subscriber::registry()
            .with(layer.compact().with_target(false))
            .with(filter)
            .init();
    }
}

/// Load configuration from specified path or default location
fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load(&path),
        None => Config::load_or_default(),
    }
}

/// Sign in and build a controller scoped to `org`
async fn connect(
    config: &Config,
    gate: Box<dyn ConfirmationGate>,
    org: Option<&str>,
) -> Result<(HttpClient, SessionExit, SyncController)> {
    let client = HttpClient::new(&config.server)?;
    let mut bootstrap = client.fetch_bootstrap().await?;
    if bootstrap.docs_url.is_none() {
        bootstrap.docs_url = config.server.docs_url.clone();
    }

    if let Some(login) = org {
        if bootstrap.directory().get(login).is_none() {
            bail!(
                "{} is neither your account nor one of your organizations",
                login
            );
        }
    }

    let exit = SessionExit::new();
    let collaborators = client.collaborators(gate, Box::new(exit.clone()));
    let org = org.or(config.ui.default_org.as_deref());
    let controller = SyncController::bootstrap(
        bootstrap,
        org,
        collaborators,
        config.server.logout_path.clone(),
    )
    .ok_or_else(|| anyhow!("This account has been deleted"))?;

    Ok((client, exit, controller))
}

/// Fail the command when the controller recorded an error
fn check_error(controller: &SyncController, action: &str) -> Result<()> {
    match &controller.state().error {
        Some(e) => Err(anyhow!("{} failed: {}", action, e)),
        None => Ok(()),
    }
}

fn split_slug(slug: &str) -> Result<(&str, &str)> {
    match slug.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() => Ok((owner, name)),
        _ => bail!("Expected a repository as owner/name, got '{}'", slug),
    }
}

/// List repositories of the selected organization
async fn cmd_repos(options: &Options, config: &Config) -> Result<()> {
    let (_, _, controller) = connect(config, options.gate(), options.org.as_deref()).await?;
    controller.refresh().await;
    check_error(&controller, "Loading repositories")?;

    let state = controller.state();
    println!(
        "Repositories of {} ({} of {} enabled):",
        state.current_org,
        state.active_repo_count(),
        state.repos.len()
    );
    for repo in &state.repos {
        let marker = if repo.id().is_some() { "✅" } else { "  " };
        let private = if repo.private { " (private)" } else { "" };
        println!("  {} {}{}", marker, repo.slug, private);
    }

    Ok(())
}

/// List organizations and their enabled state
async fn cmd_orgs(options: &Options, config: &Config) -> Result<()> {
    let (_, _, controller) = connect(config, options.gate(), None).await?;
    controller.refresh().await;
    check_error(&controller, "Loading organizations")?;

    let state = controller.state();
    println!("Organizations ({}):", state.orgs.len());
    for org in &state.orgs {
        let marker = if org.enabled { "✅" } else { "  " };
        let you = if org.login == state.user.login {
            " (you)"
        } else {
            ""
        };
        println!("  {} {}{}", marker, org.login, you);
    }

    Ok(())
}

/// Switch a repository on or off through the same flow as the dashboard toggle
async fn cmd_set_repo(slug: &str, enable: bool, options: &Options, config: &Config) -> Result<()> {
    let (owner, _) = split_slug(slug)?;
    let org = options.org.as_deref().unwrap_or(owner);
    let (_, _, controller) = connect(config, options.gate(), Some(org)).await?;

    controller.refresh().await;
    check_error(&controller, "Loading repositories")?;

    let is_on = controller
        .state()
        .repo(slug)
        .map(|r| r.is_on())
        .with_context(|| format!("Repository {} is not listed for {}", slug, org))?;
    if is_on == enable {
        println!("{} is already {}", slug, if enable { "enabled" } else { "disabled" });
        return Ok(());
    }

    info!("{} {}", if enable { "Enabling" } else { "Disabling" }, slug);
    controller.flip_repo(slug);
    controller.toggle(slug).await;
    check_error(&controller, if enable { "Enabling" } else { "Disabling" })?;

    let activity = controller
        .state()
        .repo(slug)
        .map(|r| r.activity)
        .unwrap_or(RepoActivity::Inactive);
    match activity {
        RepoActivity::Active(id) => println!("✅ {} enabled (id {})", slug, id),
        RepoActivity::Inactive if enable => println!("Cancelled, {} left disabled", slug),
        _ => println!("✅ {} disabled", slug),
    }

    Ok(())
}

/// Switch an organization on or off
async fn cmd_set_org(login: &str, enable: bool, options: &Options, config: &Config) -> Result<()> {
    let (_, _, controller) = connect(config, options.gate(), None).await?;
    controller.refresh().await;
    check_error(&controller, "Loading organizations")?;

    let enabled = controller
        .state()
        .org(login)
        .map(|o| o.enabled)
        .with_context(|| format!("{} is not one of your organizations", login))?;
    if enabled == enable {
        println!("{} is already {}", login, if enable { "enabled" } else { "disabled" });
        return Ok(());
    }

    controller.flip_org(login);
    controller.toggle_org(login).await;
    check_error(&controller, if enable { "Enabling" } else { "Disabling" })?;

    let enabled = controller.state().org(login).map(|o| o.enabled).unwrap_or(false);
    match (enable, enabled) {
        (true, true) => println!("✅ {} enabled", login),
        (true, false) => println!("Cancelled, {} left disabled", login),
        _ => println!("✅ {} disabled", login),
    }

    Ok(())
}

/// Print the validation report for a repository
async fn cmd_validate(slug: &str, options: &Options, config: &Config) -> Result<()> {
    let (owner, _) = split_slug(slug)?;
    let org = options.org.as_deref().unwrap_or(owner);
    let (_, _, controller) = connect(config, options.gate(), Some(org)).await?;

    controller.refresh().await;
    check_error(&controller, "Loading repositories")?;
    if controller.state().repo(slug).is_none() {
        bail!("Repository {} is not listed for {}", slug, org);
    }
    controller.validate(slug).await;

    let state = controller.state();
    let info = state
        .validation_info
        .as_ref()
        .ok_or_else(|| anyhow!("No validation report for {}", slug))?;

    println!("🔍 {}", info.slug);
    println!("   {}", info.message);
    if let Some(file) = &info.file_content {
        println!("\nSuggested configuration:\n{}", file);
    }

    Ok(())
}

/// Delete the signed-in account after confirmation
async fn cmd_delete_account(options: &Options, config: &Config) -> Result<()> {
    let gate = options.gate();
    let (client, exit, controller) = connect(config, Box::new(AutoConfirm), None).await?;

    let login = controller.state().user.login.clone();
    let prompt = ConfirmPrompt::DeleteAccount { login };
    if let Confirmation::Declined(reason) = gate.open_confirm(&prompt).await {
        println!("Account kept ({})", reason);
        return Ok(());
    }

    controller.delete_user().await;
    check_error(&controller, "Deleting the account")?;

    if let Some(target) = exit.target() {
        println!("Account deleted. Continue at {}{}", client.base_url(), target);
    }

    Ok(())
}

/// Handle config commands
fn cmd_config(command: ConfigCommands, config: &Config) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            let mut shown = config.clone();
            for secret in [&mut shown.server.session_cookie, &mut shown.server.csrf_token] {
                if secret.is_some() {
                    *secret = Some("********".to_string());
                }
            }
            let yaml = serde_yaml::to_string(&shown).context("Failed to serialize config")?;
            print!("{}", yaml);
        }
        ConfigCommands::Path => {
            println!("{}", Config::default_config_path()?.display());
        }
    }

    Ok(())
}
