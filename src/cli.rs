use crate::credentials::{CredentialChain, CredentialStore, Credentials, FileCredentialStore};
use crate::renamer::{Executor, Orchestrator, PlanStatus, RenamePlan, ScanSession};
use crate::scraper::{Resolver, create_resolver};
use crate::settings::Settings;
use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use dialoguer::{Confirm, Password};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use validator::Validate;

#[derive(Debug, Parser)]
#[command(name = "reelname", version, about = "Rename movie and TV files using TMDB metadata")]
pub struct Cli {
    /// Settings file (defaults to ./reelname.toml, then the user config dir)
    #[arg(long, global = true, env = "REELNAME_CONFIG")]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan a directory and preview the renames
    Scan(ScanArgs),
    /// Apply a session exported with `scan --output`
    Apply(ApplyArgs),
    /// Manage the settings file
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Library root
    pub dir: PathBuf,

    /// Write the preview session as JSON
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Apply without asking
    #[arg(short, long, conflicts_with = "dry_run")]
    pub yes: bool,

    /// Preview only
    #[arg(long)]
    pub dry_run: bool,

    /// Lookups in flight at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    #[arg(long)]
    pub movie_template: Option<String>,

    #[arg(long)]
    pub series_template: Option<String>,
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Session file written by `scan --output`
    pub session: PathBuf,

    /// Apply without asking
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a settings file with defaults and an API key
    Init {
        /// TMDB API key; prompted for when omitted
        #[arg(long)]
        api_key: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective settings
    Show,
}

pub async fn run(cli: Cli, settings: Settings, settings_path: PathBuf) -> Result<()> {
    match cli.command {
        Command::Scan(args) => scan(args, settings, &settings_path).await,
        Command::Apply(args) => apply(args, settings),
        Command::Config(ConfigCommand::Init { api_key, force }) => {
            config_init(settings, api_key, force, &settings_path).await
        }
        Command::Config(ConfigCommand::Show) => config_show(&settings, &settings_path),
    }
}

async fn scan(args: ScanArgs, mut settings: Settings, settings_path: &Path) -> Result<()> {
    if let Some(concurrency) = args.concurrency {
        settings.scan.concurrency = concurrency;
    }
    if let Some(template) = args.movie_template {
        settings.naming.movie = template;
    }
    if let Some(template) = args.series_template {
        settings.naming.series = template;
    }
    settings.validate().context("invalid command line overrides")?;

    let resolver = build_resolver(&settings, settings_path)?;
    let orchestrator = Orchestrator::new(Arc::new(resolver), settings.orchestrator_config());

    let cancel = CancellationToken::new();
    watch_interrupts(cancel.clone());

    let session = orchestrator
        .scan_with_cancel(&args.dir, cancel.clone())
        .await
        .with_context(|| format!("scan of {} failed", args.dir.display()))?;

    print_preview(&session);

    if let Some(output) = &args.output {
        session
            .save(output)
            .with_context(|| format!("failed to write {}", output.display()))?;
        println!("Session written to {}", output.display());
    }

    if args.dry_run || cancel.is_cancelled() {
        return Ok(());
    }

    commit(session, args.yes, settings.apply.prune_empty_dirs, &cancel)
}

fn apply(args: ApplyArgs, settings: Settings) -> Result<()> {
    let session = ScanSession::load(&args.session)
        .with_context(|| format!("failed to load session {}", args.session.display()))?;
    info!(session = %session.id, root = %session.root.display(), "Loaded session");

    print_preview(&session);

    let cancel = CancellationToken::new();
    watch_interrupts(cancel.clone());
    commit(session, args.yes, settings.apply.prune_empty_dirs, &cancel)
}

/// Cancel `cancel` on the first Ctrl-C. Once a handler is installed the
/// default one never comes back, so a second Ctrl-C exits right away.
fn watch_interrupts(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Interrupted, stopping after the current file (Ctrl-C again to quit now)");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}

/// Confirm, then apply. Exits non-zero when any rename failed.
fn commit(
    session: ScanSession,
    yes: bool,
    prune_empty_dirs: bool,
    interrupt: &CancellationToken,
) -> Result<()> {
    let pending = session.summary().to_rename;
    if pending == 0 {
        println!("Nothing to rename.");
        return Ok(());
    }

    if !yes {
        if !std::io::stdin().is_terminal() {
            println!("Not a terminal; pass --yes to apply {pending} renames.");
            return Ok(());
        }
        if !confirm(pending)? {
            println!("Nothing changed.");
            return Ok(());
        }
    }

    let root = session.root.clone();
    let mut failed = 0;
    let session = Executor::new(prune_empty_dirs).apply_with_cancel(session, interrupt, |_, plan| {
        if plan.status == PlanStatus::Applied {
            println!("  ok      {}", display(&root, &plan.proposed_path));
        } else {
            failed += 1;
            println!(
                "  failed  {}: {}",
                display(&root, &plan.original_path),
                plan.failure_reason.as_deref().unwrap_or("unknown error")
            );
        }
    });

    let summary = session.summary();
    println!("{summary}");
    if interrupt.is_cancelled() && summary.to_rename > 0 {
        println!("Interrupted; {} renames were not applied.", summary.to_rename);
    }
    if failed > 0 {
        bail!("{failed} of {pending} renames failed");
    }
    Ok(())
}

/// Ask before applying. Ctrl-C at the prompt answers no.
fn confirm(pending: usize) -> Result<bool> {
    match Confirm::new()
        .with_prompt(format!("Apply {pending} renames?"))
        .default(false)
        .interact()
    {
        Ok(answer) => Ok(answer),
        Err(e) if is_interrupt(&e) => Ok(false),
        Err(e) => Err(e).context("prompt failed"),
    }
}

/// The terminal is in raw mode during a prompt, so Ctrl-C arrives as an
/// interrupted read instead of a signal
fn is_interrupt(error: &dialoguer::Error) -> bool {
    matches!(error, dialoguer::Error::IO(e) if e.kind() == std::io::ErrorKind::Interrupted)
}

/// Write `settings` plus the API key, then check the key with the provider
async fn config_init(
    settings: Settings,
    api_key: Option<String>,
    force: bool,
    settings_path: &Path,
) -> Result<()> {
    if settings_path.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite",
            settings_path.display()
        );
    }

    let api_key = match api_key {
        Some(key) => key,
        None if std::io::stdin().is_terminal() => Password::new()
            .with_prompt("TMDB API key")
            .interact()
            .context("prompt failed")?,
        None => bail!("no API key given; pass --api-key"),
    };
    let api_key = api_key.trim().to_string();
    if api_key.is_empty() {
        bail!("API key must not be empty");
    }

    settings
        .save(settings_path)
        .with_context(|| format!("failed to write {}", settings_path.display()))?;

    let credentials = Credentials::new(settings.provider.name, api_key);
    FileCredentialStore::new(settings_path)
        .save(&credentials)
        .context("failed to store API key")?;
    println!("Wrote {}", settings_path.display());

    let resolver = create_resolver(
        credentials.provider,
        credentials.api_key(),
        settings.provider.base_url.as_deref(),
        &settings.network.http_options(),
        settings.resolver_config(),
    )?;
    match resolver.preflight().await {
        Ok(()) => println!("API key accepted by {}", resolver.provider().name()),
        Err(e) if e.is_unauthorized() => warn!("API key was rejected: {e}"),
        Err(e) => warn!("Could not verify API key: {e}"),
    }

    Ok(())
}

fn config_show(settings: &Settings, settings_path: &Path) -> Result<()> {
    let exists = if settings_path.is_file() { "" } else { " (not created yet)" };
    println!("# Settings file: {}{exists}", settings_path.display());

    let chain = CredentialChain::standard(settings.provider.name, settings_path);
    match chain.lookup().context("failed to read credentials")? {
        Some((_, source)) => println!("# API key: set (from {source})"),
        None => println!("# API key: not set"),
    }
    println!();
    print!("{}", settings.to_toml()?);
    Ok(())
}

fn build_resolver(settings: &Settings, settings_path: &Path) -> Result<Resolver> {
    let chain = CredentialChain::standard(settings.provider.name, settings_path);
    let Some((credentials, source)) = chain.lookup().context("failed to read credentials")? else {
        bail!("no API key configured; run `reelname config init` or set REELNAME_API_KEY");
    };
    info!(source, provider = %credentials.provider, "Using API key");

    Ok(create_resolver(
        credentials.provider,
        credentials.api_key(),
        settings.provider.base_url.as_deref(),
        &settings.network.http_options(),
        settings.resolver_config(),
    )?)
}

fn print_preview(session: &ScanSession) {
    println!("Library: {}", session.root.display());
    for plan in &session.plans {
        println!("{}", preview_line(&session.root, plan));
    }
    println!("{}", session.summary());
}

fn preview_line(root: &Path, plan: &RenamePlan) -> String {
    let original = display(root, &plan.original_path);
    match plan.status {
        PlanStatus::Failed => format!(
            "  failed  {original}: {}",
            plan.failure_reason.as_deref().unwrap_or("unknown error")
        ),
        PlanStatus::Applied => format!("  done    {original}"),
        PlanStatus::Pending if plan.is_unresolved() => format!("  skip    {original} (no match)"),
        PlanStatus::Pending if plan.is_noop() => format!("  keep    {original}"),
        PlanStatus::Pending => format!(
            "  rename  {original}\n       -> {}",
            display(root, &plan.proposed_path)
        ),
    }
}

fn display(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}
