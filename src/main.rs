use civicwatch::cli::commands::{self, CommandContext};
use civicwatch::cli::{Cli, Commands};
use civicwatch::config;
use civicwatch::logging::init_logging;
use civicwatch::{CivicError, StructuredError};
use clap::Parser;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.quiet, cli.log_json) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => handle_error(&CivicError::Io(e), cli.json),
    };

    let json = cli.json;
    if let Err(e) = runtime.block_on(run(cli)) {
        handle_error(&e, json);
    }
}

async fn run(cli: Cli) -> civicwatch::Result<()> {
    let overrides = build_cli_overrides(&cli);
    let project_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let ctx = CommandContext::load(&project_dir, &overrides, cli.json, cli.quiet)?;

    match cli.command {
        Commands::List(args) => commands::list::execute(&args, &ctx).await,
        Commands::Create(args) => commands::create::execute(&args, &ctx).await,
        Commands::Upvote { id } => commands::upvote::execute(&id, &ctx).await,
        Commands::Solve { id } => commands::status::execute(&id, true, &ctx).await,
        Commands::Unsolve { id } => commands::status::execute(&id, false, &ctx).await,
        Commands::Delete { id } => commands::delete::execute(&id, &ctx).await,
        Commands::Whoami => commands::whoami::execute(&ctx).await,
        Commands::Export(args) => commands::export::execute(&args, &ctx).await,
        Commands::Tags => commands::tags::execute(&ctx).await,
        Commands::Summary => commands::summary::execute(&ctx).await,
    }
}

/// Handle errors with structured output support.
///
/// When --json is set or stdout is not a TTY, outputs structured JSON to stderr.
/// Otherwise, outputs a human-readable error.
fn handle_error(err: &CivicError, json_mode: bool) -> ! {
    let structured = StructuredError::from_error(err);
    let exit_code = structured.code.exit_code();

    let use_json = json_mode || !io::stdout().is_terminal();

    if use_json {
        let json = structured.to_json();
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
        );
    } else {
        let use_color = io::stderr().is_terminal();
        eprintln!("{}", structured.to_human(use_color));
    }

    std::process::exit(exit_code);
}

fn build_cli_overrides(cli: &Cli) -> config::CliOverrides {
    config::CliOverrides {
        mode: cli.mode.clone(),
        db: cli.db.clone(),
        identity: cli.identity.clone(),
        role: cli.role.clone(),
    }
}
