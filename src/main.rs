use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tricount_report::core::TargetMonth;
use tricount_report::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display net amounts per category, person and payer for a month
    Breakdown {
        /// Month to report as YYYY-MM, repeatable (default: current month)
        #[arg(short, long = "month")]
        months: Vec<String>,
    },
    /// List the members of the tricount
    Users,
    /// List expense amounts, excluding refunds
    Expenses {
        /// Only show the share of the member with this id
        #[arg(short, long)]
        user: Option<String>,
    },
}

impl TryFrom<Commands> for tricount_report::AppCommand {
    type Error = anyhow::Error;

    fn try_from(cmd: Commands) -> Result<Self> {
        Ok(match cmd {
            Commands::Breakdown { months } => {
                let mut months = months
                    .iter()
                    .map(|m| m.parse::<TargetMonth>())
                    .collect::<Result<Vec<TargetMonth>>>()?;
                if months.is_empty() {
                    months.push(TargetMonth::current());
                }
                tricount_report::AppCommand::Breakdown { months }
            }
            Commands::Users => tricount_report::AppCommand::Users,
            Commands::Expenses { user } => tricount_report::AppCommand::Expenses { user_id: user },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => tricount_report::cli::setup::setup(cli.config_path.as_deref()),
        Some(cmd) => match cmd.try_into() {
            Ok(command) => tricount_report::run_command(command, cli.config_path.as_deref()).await,
            Err(e) => Err(e),
        },
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
