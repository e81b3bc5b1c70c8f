use clap::Parser;
use sharplua_cli::cli::Cli;
use sharplua_cli::pipeline;
use std::process;

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(error) = pipeline::run(&cli) {
        eprintln!("{}", error);
        process::exit(-1);
    }
}
