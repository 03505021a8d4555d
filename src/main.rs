use clap::Parser;
use ruleform::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    ruleform::logging::init(cli.verbose);
    run(cli)
}
