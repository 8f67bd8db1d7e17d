use diffgen::cli;
use diffgen::commands::generate::{generate, GenerateConfig};
use env_logger::Env;
use std::process;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    // Reconstructed before parsing so the generated header names the exact
    // invocation, flags and all.
    let invocation = std::env::args().skip(1).collect::<Vec<_>>().join(" ");

    let cli = cli::parse_args();
    let config = GenerateConfig {
        path: cli.path,
        type_name: cli.type_name,
        skip: cli.skip,
        methods: cli.methods,
        output: cli.output,
        invocation,
    };

    if let Err(err) = generate(config) {
        eprintln!("diffgen: {err:#}");
        process::exit(1);
    }
}
