mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use cliframe::config::{Config, LayeredEnv, ProcessEnv};
use cliframe::help::PlainHelp;
use cliframe::logging::{init_tracing, DEFAULT_FILTER};
use cliframe::{exit, App, TypeRegistry};

/// cliframe -- demo host for the command dispatch core.
#[derive(Parser, Debug)]
#[command(name = "cliframe", version, about, disable_help_flag = true)]
struct HostArgs {
    /// Config file (defaults to the platform config dir)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// tracing filter, overridden by RUST_LOG
    #[arg(long, value_name = "FILTER")]
    log: Option<String>,

    /// Command path and its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = HostArgs::parse();
    let code = run(args).await;
    ExitCode::from(u8::try_from(code).unwrap_or(exit::GENERAL_FAILURE as u8))
}

async fn run(args: HostArgs) -> i32 {
    let loaded = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            init_tracing(args.log.as_deref().unwrap_or(DEFAULT_FILTER));
            eprintln!("error: {}", e);
            return exit::CONFIG;
        }
    };
    init_tracing(args.log.as_deref().unwrap_or(&config.defaults.log_filter));

    let types = TypeRegistry::new();
    if let Err(e) = types.register_enum(commands::level_enum()) {
        eprintln!("error: {}", e);
        return exit::UNEXPECTED;
    }
    let registry = match commands::registry(config.env.clone()) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("error: {}", e);
            return e.exit_code();
        }
    };

    let env = LayeredEnv::new()
        .with(ProcessEnv)
        .with(config.env_source());
    let app = App::new(registry, types, env)
        .with_renderer(PlainHelp::new("cliframe"))
        .with_strict_shutdown(config.defaults.strict_shutdown);

    let signals = app.lifecycle().listen_for_signals();
    let code = app.run(&args.command).await;
    let code = app.finish(code).await;
    // Root token is cancelled by now, so the listener winds down on its own.
    if let Err(e) = signals.await {
        tracing::warn!(error = %e, "signal listener failed");
    }
    code
}
