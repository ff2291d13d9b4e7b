//! The main entrypoint for imagegen

use anyhow::Result;
use clap::Parser;
use imagegen_lib::GenerateOpts;
use tracing::level_filters::LevelFilter;

fn run() -> Result<()> {
    let opts = GenerateOpts::parse();

    let level = if opts.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    imagegen_utils::initialize_tracing(level);
    tracing::trace!("starting {}", env!("CARGO_PKG_NAME"));

    imagegen_lib::run(&opts)
}

fn main() {
    imagegen_utils::run_main(run)
}
