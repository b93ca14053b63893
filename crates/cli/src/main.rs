use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockai_core::ingest::provider::YahooFinanceProvider;
use stockai_core::llm::RecommendationRequester;
use stockai_core::pipeline::Analyzer;

mod report;

#[derive(Debug, Parser)]
#[command(name = "stockai", about = "Technical + fundamental snapshot with an LLM recommendation")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze one ticker and print the report.
    Analyze {
        /// Ticker symbol, e.g. AAPL.
        symbol: String,

        /// Print the full report as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = stockai_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    match args.command {
        Command::Analyze { symbol, json } => {
            let market = YahooFinanceProvider::from_settings(&settings)?;
            let requester = RecommendationRequester::from_settings(&settings).inspect_err(|e| {
                sentry_anyhow::capture_anyhow(e);
            })?;

            let report = match Analyzer::new(&market, &requester).analyze(&symbol).await {
                Ok(report) => report,
                Err(err) => {
                    eprintln!("error: {err}");
                    drop(_sentry_guard);
                    std::process::exit(1);
                }
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report::render_text(&report));
            }

            if let Err(err) = &report.recommendation {
                sentry::capture_error(err);
            }
        }
    }

    Ok(())
}

fn init_sentry(settings: &stockai_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
