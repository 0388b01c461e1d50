use std::process;

use clap::Parser;
use cli::Cli;

fn main() {
    let cli = Cli::parse();
    let verbosity = cli.verbose + u8::from(!cli.quiet);
    logger::Logger::init(verbosity);

    match vcf_validate::run(&cli) {
        Ok(has_errors) => process::exit(if has_errors { 1 } else { 0 }),
        Err(e) => {
            log::error!("{e:#}");
            process::exit(2);
        }
    }
}
