use anyhow::Context;
use clap::Parser;
use reelname::cli::{self, Cli, Command, ConfigCommand};
use reelname::settings::{self, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings_path = settings::settings_path(cli.config.as_deref())?;
    let settings = match Settings::load(&settings_path) {
        Ok(settings) => settings,
        // `config init --force` must be able to replace a broken file
        Err(e) if matches!(cli.command, Command::Config(ConfigCommand::Init { force: true, .. })) => {
            eprintln!("Ignoring unreadable settings: {e}");
            Settings::default()
        }
        Err(e) => {
            return Err(e).with_context(|| {
                format!("failed to load settings from {}", settings_path.display())
            });
        }
    };

    let _guard = reelname::logging::init(&settings.logging, cli.verbose)?;

    cli::run(cli, settings, settings_path).await
}
