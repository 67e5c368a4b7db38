pub mod assemble;
pub mod cli;
pub mod enrich;
pub mod extract;
pub mod generate;
pub mod headers;
pub mod ingest;
pub mod io_utils;
pub mod lookup;
pub mod mapping;
pub mod mapping_cmd;
pub mod output;
pub mod record;
pub mod report;
pub mod schema;
pub mod stats;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging(verbose: bool) {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            let level = if verbose {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            };
            builder.filter_module("onspd_enrich", level);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Commands::Build(args) => generate::execute_build(&args),
        Commands::Process(args) => generate::execute_process(&args),
        Commands::Mappings(args) => mapping_cmd::execute(&args),
    }
}
