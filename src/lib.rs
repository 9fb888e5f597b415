pub mod cli;
pub mod client;
pub mod core;
pub mod providers;

use crate::cli::ui;
use crate::client::TricountClient;
use crate::core::TargetMonth;
use crate::core::config::AppConfig;
use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    /// Net breakdown of each month, in order
    Breakdown { months: Vec<TargetMonth> },
    Users,
    Expenses { user_id: Option<String> },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Tricount report starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?.with_env_overrides(),
        None => AppConfig::load()?,
    };
    debug!(
        base_url = %config.tricount.base_url,
        currency = %config.currency,
        "Loaded config"
    );
    let client_config = config.client_config()?;

    let spinner = ui::new_spinner("Fetching tricount...");
    let client = TricountClient::connect(&client_config).await;
    spinner.finish_and_clear();
    let client = client?;

    match command {
        AppCommand::Breakdown { months } => {
            cli::breakdown::run(&client, &months, &client_config.currency).await
        }
        AppCommand::Users => cli::users::run(&client).await,
        AppCommand::Expenses { user_id } => {
            cli::expenses::run(&client, user_id.as_deref(), &client_config.currency).await
        }
    }
}
