mod config;
mod report;

use auth::ApiCredentials;
use binance_futures::BinanceFuturesGateway;
use clap::{Parser, Subcommand};
use config::{RunnerConfig, StartupError};
use connector_core::SharedGateway;
use execution_core::TimeInForce;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use strategy_core::{CancelReceiver, MetadataCache, SharedMetadataCache, StrategyError, TokioClock};
use strategy_runner::{
    DryRunGateway, GridParams, GridTrader, OcoMonitor, OcoResolution, OrderEntry, TwapExecutor,
    TwapParams, TwapPhase, TwapSchedule,
};
use tokio::sync::watch;
use tracing::{error, info};

const EXIT_FAILURE: u8 = 1;
const EXIT_VALIDATION: u8 = 2;

#[derive(Parser)]
#[command(
    name = "futures-bot",
    version,
    about = "Order entry, TWAP and grid strategies for Binance USDⓈ-M futures"
)]
struct Cli {
    /// Simulate order placement locally; prices and symbol filters still come from the exchange.
    #[arg(long, global = true, default_value_t = false)]
    dry_run: bool,

    /// Also write logs to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Market order.
    Market {
        symbol: String,
        side: String,
        quantity: Decimal,
    },
    /// Limit order.
    Limit {
        symbol: String,
        side: String,
        quantity: Decimal,
        price: Decimal,
        #[arg(long, default_value = "GTC", value_parser = parse_time_in_force)]
        tif: TimeInForce,
    },
    /// Stop-limit order: rests at LIMIT once the market crosses STOP.
    StopLimit {
        symbol: String,
        side: String,
        quantity: Decimal,
        stop: Decimal,
        limit: Decimal,
        #[arg(long, default_value = "GTC", value_parser = parse_time_in_force)]
        tif: TimeInForce,
    },
    /// Take-profit limit plus stop-loss stop-limit.
    Oco {
        symbol: String,
        side: String,
        quantity: Decimal,
        take_profit: Decimal,
        stop: Decimal,
        stop_limit: Decimal,
        /// Stay attached and cancel the remaining leg once the other fills.
        #[arg(long, default_value_t = false)]
        monitor: bool,
        /// Seconds between leg status checks while monitoring.
        #[arg(long, default_value_t = 1)]
        poll: u64,
    },
    /// Split QUANTITY into equal market chunks over time.
    Twap {
        symbol: String,
        side: String,
        quantity: Decimal,
        #[arg(long, default_value_t = 10)]
        chunks: u32,
        /// Total run time in minutes (fractions allowed), divided evenly between chunks.
        #[arg(long, conflicts_with = "interval", value_parser = parse_minutes)]
        duration: Option<Duration>,
        /// Seconds between chunk starts.
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Ladder of resting limits between LOWER and UPPER.
    Grid {
        symbol: String,
        lower: Decimal,
        upper: Decimal,
        /// Quantity of every grid order.
        #[arg(long)]
        quantity: Decimal,
        #[arg(long, default_value_t = strategy_runner::DEFAULT_GRID_LEVELS)]
        grids: usize,
        /// Seconds between fill checks.
        #[arg(long, default_value_t = 5)]
        interval: u64,
    },
}

fn parse_time_in_force(s: &str) -> Result<TimeInForce, String> {
    TimeInForce::from_binance_str(s).ok_or_else(|| format!("expected GTC, IOC or FOK, got '{}'", s))
}

fn parse_minutes(s: &str) -> Result<Duration, String> {
    let minutes: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("expected a number of minutes, got '{}'", s))?;
    if !minutes.is_finite() || minutes <= 0.0 {
        return Err(format!("duration must be positive, got '{}'", s));
    }
    Duration::try_from_secs_f64(minutes * 60.0).map_err(|e| format!("duration '{}': {}", s, e))
}

/// How a completed command maps to the process exit code.
enum RunStatus {
    Success,
    Aborted,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match RunnerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let log_file = cli.log_file.clone().or_else(|| config.log_file.clone());
    // Dropping the guard flushes the file writer.
    let _log_guard = common::init_logging(log_file.as_deref());

    info!(
        environment = %config.environment,
        dry_run = cli.dry_run,
        metadata_ttl_secs = config.metadata_ttl.as_secs(),
        "Starting futures bot"
    );

    let gateway = match build_gateway(&config, cli.dry_run).await {
        Ok(gateway) => gateway,
        Err(e) => {
            error!(error = %e, "Failed to set up gateway");
            return ExitCode::from(EXIT_FAILURE);
        }
    };
    let cache: SharedMetadataCache = Arc::new(MetadataCache::new(
        gateway.clone(),
        Arc::new(TokioClock),
        config.metadata_ttl,
    ));

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, stopping at next checkpoint");
            let _ = cancel_tx.send(true);
        }
    });

    match execute(cli.command, gateway, cache, cancel_rx).await {
        Ok(RunStatus::Success) => {
            info!("Done");
            ExitCode::SUCCESS
        }
        Ok(RunStatus::Aborted) => ExitCode::from(EXIT_FAILURE),
        Err(e) => {
            match &e {
                StrategyError::Validation(v) => {
                    error!(stage = v.stage(), error = %e, "Validation failed")
                }
                StrategyError::Gateway { stage, source } => {
                    error!(stage, kind = source.kind(), error = %e, "Gateway call failed")
                }
            }
            eprintln!("Error: {}", e);
            if e.is_validation() {
                ExitCode::from(EXIT_VALIDATION)
            } else {
                ExitCode::from(EXIT_FAILURE)
            }
        }
    }
}

async fn build_gateway(config: &RunnerConfig, dry_run: bool) -> Result<SharedGateway, StartupError> {
    let credentials = match ApiCredentials::from_env() {
        Ok(credentials) => credentials,
        // Symbol filters and prices are public, so a dry run can go without keys.
        Err(e) if dry_run => {
            info!(reason = %e, "No API credentials, dry run uses public endpoints only");
            ApiCredentials::new(String::new(), String::new())
        }
        Err(e) => return Err(e.into()),
    };

    let live = BinanceFuturesGateway::connect(credentials, &config.gateway_config()).await?;
    if dry_run {
        info!("Dry run: orders are simulated locally");
        Ok(Arc::new(DryRunGateway::new(Arc::new(live))))
    } else {
        Ok(Arc::new(live))
    }
}

async fn execute(
    command: Command,
    gateway: SharedGateway,
    cache: SharedMetadataCache,
    cancel: CancelReceiver,
) -> Result<RunStatus, StrategyError> {
    let clock = Arc::new(TokioClock);

    match command {
        Command::Market {
            symbol,
            side,
            quantity,
        } => {
            let outcome = OrderEntry::new(gateway, cache)
                .place_market_order(&symbol, &side, quantity)
                .await?;
            report::print_order(&outcome);
        }
        Command::Limit {
            symbol,
            side,
            quantity,
            price,
            tif,
        } => {
            let outcome = OrderEntry::new(gateway, cache)
                .place_limit_order(&symbol, &side, quantity, price, tif)
                .await?;
            report::print_order(&outcome);
        }
        Command::StopLimit {
            symbol,
            side,
            quantity,
            stop,
            limit,
            tif,
        } => {
            let outcome = OrderEntry::new(gateway, cache)
                .place_stop_limit_order(&symbol, &side, quantity, stop, limit, tif)
                .await?;
            report::print_order(&outcome);
        }
        Command::Oco {
            symbol,
            side,
            quantity,
            take_profit,
            stop,
            stop_limit,
            monitor,
            poll,
        } => {
            let oco = OrderEntry::new(gateway.clone(), cache)
                .place_oco_order(&symbol, &side, quantity, take_profit, stop, stop_limit)
                .await?;
            report::print_oco(&oco);
            if monitor {
                let resolution = OcoMonitor::new(gateway, clock, Duration::from_secs(poll))
                    .watch(&oco, cancel)
                    .await
                    .map_err(StrategyError::gateway("monitor_oco"))?;
                report::print_oco_resolution(&resolution);
                if let OcoResolution::Filled {
                    counterpart_closed: false,
                    ..
                } = resolution
                {
                    return Ok(RunStatus::Aborted);
                }
            }
        }
        Command::Twap {
            symbol,
            side,
            quantity,
            chunks,
            duration,
            interval,
        } => {
            let schedule = match duration {
                Some(total) => TwapSchedule::Duration(total),
                None => TwapSchedule::Interval(Duration::from_secs(interval.unwrap_or(60))),
            };
            let params = TwapParams {
                symbol,
                side,
                total_quantity: quantity,
                chunks,
                schedule,
            };
            let report = TwapExecutor::new(gateway, cache, clock)
                .run(&params, cancel)
                .await?;
            report::print_twap(&report);
            if report.phase == TwapPhase::Aborted {
                return Ok(RunStatus::Aborted);
            }
        }
        Command::Grid {
            symbol,
            lower,
            upper,
            quantity,
            grids,
            interval,
        } => {
            let params = GridParams {
                symbol,
                lower,
                upper,
                levels: grids,
                quantity,
                poll_interval: Duration::from_secs(interval),
            };
            let trader = GridTrader::initialize(gateway, &cache, clock, &params).await?;
            let report = trader.run(cancel).await;
            report::print_grid(&report);
            if report.aborted_by.is_some() {
                return Ok(RunStatus::Aborted);
            }
        }
    }

    Ok(RunStatus::Success)
}
