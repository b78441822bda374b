use crate::report::{run_cities, run_classify, ClassifyArgs};
use crate::server;
use affordability_map::affordability::City;
use affordability_map::error::AppError;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Affordability Map",
    about = "Classify postal-code regions by what a buyer can afford and how close amenities are",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Classify every region of a city from local datasets and print a report
    Classify(ClassifyArgs),
    /// List the supported cities and their map centres
    Cities,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the configured dataset directory
    #[arg(long)]
    pub(crate) data_dir: Option<PathBuf>,
    /// Override the city loaded at startup
    #[arg(long)]
    pub(crate) city: Option<City>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Classify(args) => run_classify(args),
        Command::Cities => run_cities(),
    }
}
