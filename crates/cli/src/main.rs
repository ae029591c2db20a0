use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pype_settings_storage::SettingsConfig;

mod cli;
mod commands;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pype_settings=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = cli::Cli::parse();
    let config = SettingsConfig::from_env();
    tracing::debug!(
        studio_root = %config.studio_root.display(),
        defaults = %config.defaults_dir.display(),
        schemas = %config.schemas_dir.display(),
        "Loaded settings configuration",
    );

    commands::run(args.command, &config)
}
