mod commands;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use commands::{EXIT_SUCCESS, EXIT_USAGE};
use pkgbump_core::install_signal_handler;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "pkgbump",
    version,
    about = "Track upstream releases and republish package metadata",
    long_about = "Checks the latest upstream release of the package in PACKAGE_DIR, \
                  rewrites its version metadata when it changed, verifies the build, \
                  and publishes the result to the package registry."
)]
struct Cli {
    /// Package directory containing the manifest.
    package_dir: PathBuf,

    /// Update even if the declared version already matches upstream.
    #[arg(short, long, default_value_t = false)]
    force: bool,

    /// Commit in a scratch clone of the registry but never push.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Do not run the build verification step.
    #[arg(long, default_value_t = false)]
    skip_build: bool,

    /// Let the build prompt for confirmation even in automated environments.
    #[arg(long, default_value_t = false)]
    interactive: bool,

    /// Restore the previous manifest if checksum or metadata regeneration fails.
    #[arg(long, default_value_t = false)]
    restore_on_failure: bool,

    /// Output the run report as structured JSON.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false)]
    trace: bool,
}

fn parse_args() -> Result<Cli, ExitCode> {
    Cli::try_parse().map_err(|e| {
        let _ = e.print();
        match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::from(EXIT_SUCCESS),
            _ => ExitCode::from(EXIT_USAGE),
        }
    })
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = match parse_args() {
        Ok(cli) => cli,
        Err(code) => return code,
    };

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("PKGBUMP_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    install_signal_handler();

    let flags = commands::update::Flags {
        force: cli.force,
        dry_run: cli.dry_run,
        skip_build: cli.skip_build,
        interactive: cli.interactive,
        restore_on_failure: cli.restore_on_failure,
    };
    let usage = Cli::command().render_usage().to_string();

    match commands::update::run(&cli.package_dir, flags, cli.json) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            let code = e.exit_code();
            if cli.json {
                println!("{}", commands::error_json(&e));
            } else {
                eprintln!("{} {e}", commands::error_label());
                if code == EXIT_USAGE {
                    eprintln!("\n{usage}");
                }
            }
            ExitCode::from(code)
        }
    }
}
