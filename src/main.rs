use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{interval, Duration};

use gridbot::backtest::{BacktestRunner, MarketScenario, SyntheticDataGenerator};
use gridbot::config::Settings;
use gridbot::exchange::{ExchangeClient, PaperExchange};
use gridbot::execution::TradeManager;
use gridbot::strategy::MakerScalpStrategy;
use gridbot::Result;

#[derive(Parser)]
#[command(name = "gridbot", about = "Grid trading bot with a deterministic backtester")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a synthetic market through the fill simulator
    Backtest {
        /// Market shape: uptrend, downtrend, sideways, volatile
        #[arg(long, default_value = "sideways")]
        scenario: String,
        /// Number of candles to generate
        #[arg(long, default_value_t = 600)]
        candles: usize,
        /// Seed for the synthetic series
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Run the executor grid against the paper venue
    Grid {
        /// Stop after this many ticks (0 = run until Ctrl-C)
        #[arg(long, default_value_t = 0)]
        ticks: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Backtest {
            scenario,
            candles,
            seed,
        } => run_backtest(&scenario, candles, seed),
        Commands::Grid { ticks } => run_grid(ticks).await,
    }
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gridbot=info".into()),
        )
        .init();
}

fn parse_scenario(name: &str) -> Result<MarketScenario> {
    match name {
        "uptrend" => Ok(MarketScenario::Uptrend),
        "downtrend" => Ok(MarketScenario::Downtrend),
        "sideways" => Ok(MarketScenario::Sideways),
        "volatile" => Ok(MarketScenario::Volatile),
        other => Err(format!("Unknown scenario: {}", other).into()),
    }
}

fn run_backtest(scenario: &str, candles: usize, seed: u64) -> Result<()> {
    let settings = Settings::load()?;
    let scenario = parse_scenario(scenario)?;

    let mut generator = SyntheticDataGenerator::new(seed);
    let series = generator.generate(scenario, candles, 5);

    let mut strategy = MakerScalpStrategy {
        leverage: settings.leverage,
        ..Default::default()
    };
    let runner = BacktestRunner::new(settings.initial_balance, settings.fee_rate);
    let report = runner.run(&mut strategy, series)?;
    report.print_report();
    Ok(())
}

async fn run_grid(max_ticks: u64) -> Result<()> {
    let settings = Settings::load()?;
    let grid = &settings.grid;
    let mid_price = (grid.min_price + grid.max_price) / 2.0;

    let mut venue = PaperExchange::new(mid_price, settings.initial_balance);
    venue.set_leverage(settings.leverage)?;

    let mut manager = TradeManager::new(
        venue,
        settings.state_path.clone(),
        settings.maker_offset_buy,
        settings.maker_offset_sell,
    );

    let recovery = manager.reconcile_after_crash()?;
    tracing::info!("Startup reconciliation: {:?}", recovery);

    if !manager.has_active_trades() {
        match grid.distribution.as_str() {
            "normal" => manager.create_normal_traders(
                grid.min_price,
                grid.max_price,
                grid.count,
                grid.profit_pct,
                grid.qty,
                grid.loop_trade,
                None,
                grid.sigma_factor,
                grid.seed,
            )?,
            _ => manager.create_linear_traders(
                grid.min_price,
                grid.max_price,
                grid.count,
                grid.profit_pct,
                grid.qty,
                grid.loop_trade,
            ),
        }
        tracing::info!("Created {} grid executors", manager.executor_count());
    }

    // Paper venue price drifts as a seeded random walk so the grid has
    // something to trade against
    let mut rng = StdRng::seed_from_u64(grid.seed);
    let mut ticker = interval(Duration::from_secs(settings.poll_interval_secs));
    let mut tick_count: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let price = manager.client_mut().get_current_price()?;
                let next = price * (1.0 + rng.gen_range(-0.002..0.002));
                manager.client_mut().advance_price(next);

                manager.process_tick();
                tick_count += 1;

                if max_ticks > 0 && tick_count >= max_ticks {
                    tracing::info!("Reached {} ticks, shutting down", max_ticks);
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl-C received, shutting down");
                break;
            }
        }
    }

    manager.stop_all_entries();
    manager.save_to_disk()?;
    tracing::info!(
        "Shutdown complete, {} executors still working a position",
        manager.executor_count()
    );
    Ok(())
}
