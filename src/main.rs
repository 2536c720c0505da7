use std::time::Duration;

use eyre::WrapErr;
use quotebook::{MarketSnapshot, QuoteRequest, Simulation, SimulationConfig, TickSize};

fn print_help() {
    eprintln!(
        r#"quotebook - headless market-making game

USAGE:
    quotebook [OPTIONS]

OPTIONS:
    --config <PATH>       Load configuration from JSON file
    --quote <QUOTE>       Resting quote as BID_PX,BID_SZ,ASK_PX,ASK_SZ
                          (default: fair value +/- 2 ticks, size 10)
    --duration <SECS>     How long to run (default: 30)
    --seed <N>            Seed the random source
    --help                Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG              Log level filter (default: quotebook=info)

EXAMPLES:
    quotebook --duration 10 --seed 42
    quotebook --config game.json --quote 4499.50,10,4500.50,10
"#
    );
}

struct Args {
    config_path: Option<String>,
    quote: Option<QuoteRequest>,
    duration: Duration,
    seed: Option<u64>,
}

fn parse_args() -> eyre::Result<Option<Args>> {
    let mut args = Args {
        config_path: None,
        quote: None,
        duration: Duration::from_secs(30),
        seed: None,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .ok_or_else(|| eyre::eyre!("{name} requires a value"))
        };

        match arg.as_str() {
            "--help" | "-h" => return Ok(None),
            "--config" | "-c" => args.config_path = Some(value("--config")?),
            "--quote" | "-q" => args.quote = Some(value("--quote")?.parse()?),
            "--duration" | "-d" => {
                let secs: u64 = value("--duration")?
                    .parse()
                    .wrap_err("--duration must be a whole number of seconds")?;
                args.duration = Duration::from_secs(secs);
            }
            "--seed" => {
                let seed = value("--seed")?
                    .parse()
                    .wrap_err("--seed must be an unsigned integer")?;
                args.seed = Some(seed);
            }
            other => return Err(eyre::eyre!("Unknown argument: {other}")),
        }
    }

    Ok(Some(args))
}

fn log_snapshot(snapshot: &MarketSnapshot) {
    log::info!(
        "tick {:>4}  fv {}  bid {}  ask {}  pos {:>4}  pnl {:.2}",
        snapshot.tick,
        snapshot.fair_value,
        snapshot.best_bid.map_or("-".to_string(), |p| p.to_string()),
        snapshot.best_ask.map_or("-".to_string(), |p| p.to_string()),
        snapshot.position,
        snapshot.pnl
    );

    if let Some(trade) = snapshot.trades.first() {
        log::debug!(
            "last trade #{} {:?} {} @ {}",
            trade.id,
            trade.side,
            trade.size,
            trade.price
        );
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("quotebook=info")).init();

    let Some(args) = parse_args().inspect_err(|_| print_help())? else {
        print_help();
        return Ok(());
    };

    let mut config = match &args.config_path {
        Some(path) => {
            log::info!("Loading configuration from: {path}");
            SimulationConfig::from_file(path)?
        }
        None => SimulationConfig::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    let tick_size = TickSize::new(config.tick_size)?;
    let quote = args
        .quote
        .unwrap_or_else(|| QuoteRequest::around(config.initial_price, tick_size, 2, 10));

    let sim = Simulation::new(config)?;
    sim.set_user_quote(quote)?;
    sim.start()?;

    let mut updates = sim.subscribe();
    let deadline = tokio::time::sleep(args.duration);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                log_snapshot(&snapshot);
            }
        }
    }

    sim.stop();

    let summary = serde_json::to_string_pretty(&*sim.snapshot()).wrap_err("Failed to serialize snapshot")?;
    println!("{summary}");

    Ok(())
}
