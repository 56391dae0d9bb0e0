use crate::infra::Ledger;
use crate::server;
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use lease_ledger::config::AppConfig;
use lease_ledger::error::AppError;
use lease_ledger::ledger::UserId;
use lease_ledger::reconciliation::Job;
use lease_ledger::telemetry;
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "Lease Ledger",
    about = "Run the lease ledger reconciliation service or its jobs from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the scheduler and HTTP service (default command)
    Serve(ServeArgs),
    /// Run reconciliation jobs once against the seed snapshot
    Jobs {
        #[command(subcommand)]
        command: JobsCommand,
    },
    /// Print a reputation score breakdown computed from the seed snapshot
    Score {
        #[command(subcommand)]
        command: ScoreCommand,
    },
}

#[derive(Subcommand, Debug)]
enum JobsCommand {
    /// Run one job: landlord-scores, tenant-scores, lease-expiration or payment-lateness
    Run(JobRunArgs),
}

#[derive(Subcommand, Debug)]
enum ScoreCommand {
    /// Landlord composite with rating, maintenance and behavior sub-scores
    Landlord { id: u64 },
    /// Tenant composite with payment and feedback sub-scores
    Tenant { id: u64 },
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
struct JobRunArgs {
    job: Job,
    /// Business date for the run (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    today: Option<NaiveDate>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Jobs {
            command: JobsCommand::Run(args),
        } => run_job(args),
        Command::Score { command } => run_score(command),
    }
}

/// Config, stderr logging and wiring shared by the one-shot commands.
fn prepare() -> Result<Ledger, AppError> {
    let config = AppConfig::load()?;
    telemetry::init_stderr(&config.telemetry)?;
    Ledger::wire(&config)
}

fn run_job(args: JobRunArgs) -> Result<(), AppError> {
    let ledger = prepare()?;

    let clock = Local::now().naive_local();
    let now = args
        .today
        .map_or(clock, |today| today.and_time(clock.time()));

    let summary = ledger.jobs.run(args.job, now)?;
    print_json(&summary);
    Ok(())
}

fn run_score(command: ScoreCommand) -> Result<(), AppError> {
    let ledger = prepare()?;

    match command {
        ScoreCommand::Landlord { id } => {
            print_json(&ledger.scoring.landlord_breakdown(UserId(id))?);
        }
        ScoreCommand::Tenant { id } => {
            print_json(&ledger.scoring.tenant_breakdown(UserId(id))?);
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(err) => eprintln!("output unavailable: {err}"),
    }
}
