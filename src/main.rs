use clap::error::ErrorKind;
use clap::Parser;
use pantype::{
    cli::{init_verbose, Cli, FULL_VERSION},
    commands::genotype,
    utils::handle_error_and_exit,
};

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return;
        }
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };
    init_verbose(&cli);

    log::info!("Running {}-{}", env!("CARGO_PKG_NAME"), *FULL_VERSION);
    if let Err(e) = genotype::run(cli) {
        handle_error_and_exit(e);
    }
    log::info!("{} end", env!("CARGO_PKG_NAME"));
}
