use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;

use clap::Parser;
use quarry::sqlx::MySql;
use quarry::{ConnectionConfig, DatabaseManager};
use quarry_demo::{AppContext, DemoResult, UserQuery, print_banners, run_queries};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "quarry-demo")]
#[command(about = "Query the users table three ways: unprepared, prepared and through the User model", long_about = None)]
struct Cli {
    /// Log at debug level instead of info
    #[arg(short, long)]
    verbose: bool,
    /// Skip the library build banners
    #[arg(long)]
    no_banner: bool,
    /// Do not load a .env file from the working directory
    #[arg(long)]
    no_dotenv: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if !cli.no_dotenv {
        dotenvy::dotenv().ok();
    }

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .with_ansi(io::stderr().is_terminal())
        .with_writer(io::stderr)
        .init();

    let _context = AppContext::new();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> DemoResult<()> {
    let config = ConnectionConfig::mysql_from_env();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if !cli.no_banner {
        print_banners(&mut out)?;
        out.flush()?;
    }

    tracing::debug!(?config, "connecting");
    let manager = DatabaseManager::<MySql>::create(config).await?;

    run_queries(&manager, &UserQuery::default(), &mut out).await?;
    manager.close().await;
    Ok(())
}
