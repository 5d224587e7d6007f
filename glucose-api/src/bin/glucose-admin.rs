use anyhow::Context;
use clap::Parser;

use glucose_api::admin::migrate;
use glucose_api::config::Config;

/// Glucose backend administration tools.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
enum Command {
    /// Migrate the database schema
    Migrate,
}

fn main() -> anyhow::Result<()> {
    glucose_api::utils::tracing::init();
    let command = Command::parse();
    let config = Config::from_env()?;

    tracing::debug!("Connecting to database");
    let mut conn = glucose_api::database::oneoff_connection(&config.database_url)
        .context("could not connect to the database")?;
    tracing::debug!("Connected to database");

    match command {
        Command::Migrate => {
            migrate::run(&mut conn)?;
        }
    }

    Ok(())
}
