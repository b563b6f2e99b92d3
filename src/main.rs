use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::select;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use coinwatch::favorites::Favorites;
use coinwatch::gecko::{Gecko, LOOKBACK_DAYS};
use coinwatch::tui::app::App;
use coinwatch::{AppEvent, FetchCommand};

#[derive(Parser, Debug)]
struct Args {
    /// Market listing page to fetch from the API.
    #[arg(long, default_value = "1")]
    page: u32,
    /// Coins per fetched page.
    #[arg(long, default_value = "100")]
    per_page: u32,
    #[arg(long, default_value = "favorites.json")]
    favorites_path: PathBuf,
    /// Log destination; logging to the terminal would corrupt the UI.
    #[arg(long, default_value = "coinwatch.log")]
    log_path: PathBuf,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_file = std::fs::File::create(&args.log_path).expect("could not open log file");
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("{}=info,reqwest=warn", env!("CARGO_CRATE_NAME")).into()
        }))
        .with(fmt::layer().with_ansi(false).with_writer(Arc::new(log_file)))
        .init();

    info!("starting coinwatch");

    let (tx, rx) = tokio::sync::mpsc::channel::<AppEvent>(100);
    let (tx_cmd, mut rx_cmd) = tokio::sync::mpsc::channel::<FetchCommand>(100);

    let favorites = Favorites::load(&args.favorites_path);
    let mut app = App::new(rx, tx_cmd, args.page, args.per_page, favorites);

    let fetch_task = tokio::task::spawn(async move {
        let gecko = Gecko::new();
        while let Some(cmd) = rx_cmd.recv().await {
            // one task per request, nothing coordinates overlapping
            // refetches: the last response applied wins
            tokio::task::spawn({
                let gecko = gecko.clone();
                let tx = tx.clone();
                async move {
                    let event = match cmd {
                        FetchCommand::Markets { page, per_page } => {
                            let result = gecko.markets(page, per_page).await;
                            if let Err(err) = &result {
                                error!("markets fetch failed: {err:#}");
                            }
                            AppEvent::Markets(result.map_err(|err| err.to_string()))
                        }
                        FetchCommand::Chart { coin_id } => {
                            let result = gecko.market_chart(&coin_id, LOOKBACK_DAYS).await;
                            if let Err(err) = &result {
                                error!("chart fetch for {coin_id} failed: {err:#}");
                            }
                            AppEvent::Chart {
                                coin_id,
                                result: result.map_err(|err| err.to_string()),
                            }
                        }
                    };
                    let _ = tx.send(event).await;
                }
            });
        }
    });

    let app_task = tokio::task::spawn(async move {
        if let Err(err) = app.run().await {
            error!("app error: {err:#}");
        }
    });

    select! {
        _ = app_task => {}
        _ = fetch_task => {}
    }

    ratatui::restore();
}
