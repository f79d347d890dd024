mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::exit_code_for;
use goblin_core::ReconcileOptions;
use goblin_schema::MANIFEST_FILE_NAME;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "goblin",
    version,
    about = "Install the binaries declared in a .goblin manifest and keep .goblin.lock in sync"
)]
struct Cli {
    /// Verify installed packages against the manifest and lock file without
    /// changing anything; exit 1 on any mismatch.
    #[arg(long, default_value_t = false)]
    check: bool,

    /// Do not download install scripts to resolve unpinned versions.
    #[arg(long, default_value_t = false)]
    no_fetch: bool,

    /// Directory containing the .goblin manifest.
    #[arg(short = 'C', long = "dir", default_value = ".")]
    dir: PathBuf,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
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

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("GOBLIN_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let result = match cli.command {
        Some(Commands::Completions { shell }) => commands::completions::run::<Cli>(shell),
        Some(Commands::ManPages { dir }) => commands::man_pages::run::<Cli>(&dir),
        None => {
            if !cli.check && std::env::var("GOBLIN_SKIP_PREREQS").as_deref() != Ok("1") {
                let missing = goblin_runtime::check_install_prereqs();
                if !missing.is_empty() {
                    tracing::warn!("{}", goblin_runtime::format_missing(&missing));
                }
            }
            let options = ReconcileOptions {
                check: cli.check,
                fetch: !cli.no_fetch,
            };
            let engine = commands::sync::default_engine();
            commands::sync::run(
                &engine,
                &cli.dir.join(MANIFEST_FILE_NAME),
                options,
                cli.json,
            )
        }
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(exit_code_for(&msg))
        }
    }
}
