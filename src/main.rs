use clap::Parser;
use serde::Serialize;
use strikefinder::application::delta_strike::DeltaStrikeRequest;
use strikefinder::application::market_data::QuoteSide;
use strikefinder::cli::commands::{parse_date, parse_time, Cli, Commands};
use strikefinder::config::Config;
use strikefinder::domain::values::right::Right;
use strikefinder::StrikeFinder;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let finder = match Config::from_env().and_then(|config| StrikeFinder::new(&config)) {
        Ok(finder) => finder,
        Err(e) => {
            eprintln!("Error initializing strikefinder: {e}");
            std::process::exit(1);
        }
    };

    let result = run_command(finder, cli.command).await;
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_command(finder: StrikeFinder, cmd: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        Commands::DeltaStrike {
            root,
            expiration,
            right,
            delta,
            at,
            spot,
            chain,
        } => {
            let request = DeltaStrikeRequest {
                root,
                expiration: parse_date(&expiration)?,
                right: right.parse::<Right>()?,
                target_delta: delta,
                at_time: parse_time(&at)?,
                spot_price: spot,
            };
            let matched = if chain {
                finder.delta_strike_at_time(&request).await?
            } else {
                finder.delta_strike(&request).await?
            };
            print_json(&matched)?;
        }
        Commands::Greeks {
            contract,
            range,
            with_trades,
        } => {
            let rows = finder
                .option_greeks(&contract.to_contract()?, range.to_range()?, with_trades)
                .await?;
            print_json(&rows)?;
        }
        Commands::Quotes { contract, range } => {
            let rows = finder.option_quotes(&contract.to_contract()?, range.to_range()?).await?;
            print_json(&rows)?;
        }
        Commands::TradeQuotes { contract, range } => {
            let rows = finder
                .option_trade_quotes(&contract.to_contract()?, range.to_range()?)
                .await?;
            print_json(&rows)?;
        }
        Commands::StockQuotes { ticker, range } => {
            let rows = finder.stock_quotes(&ticker, range.to_range()?).await?;
            print_json(&rows)?;
        }
        Commands::PriceAt { contract, at, side } => {
            let side: QuoteSide = side.parse()?;
            let price = finder
                .price_at_time(&contract.to_contract()?, parse_time(&at)?, side)
                .await?;
            print_json(&price)?;
        }
        Commands::Snapshot { contract, at } => {
            let contract = contract.to_contract()?;
            let record = match at {
                Some(at) => finder.greeks_at(&contract, parse_time(&at)?).await?,
                None => finder.snapshot_greeks(&contract).await?,
            };
            print_json(&record)?;
        }
        Commands::OpenInterest { contract, range } => {
            let rows = finder.open_interest(&contract.to_contract()?, range.to_range()?).await?;
            print_json(&rows)?;
        }
        Commands::Expirations { root } => {
            print_json(&finder.expirations(&root).await?)?;
        }
        Commands::Strikes { root, expiration } => {
            let strikes = finder.strikes(&root, parse_date(&expiration)?).await?;
            let prices: Option<Vec<String>> = strikes.map(|s| s.iter().map(|k| k.to_string()).collect());
            print_json(&prices)?;
        }
        Commands::CacheDates { symbol } => match symbol {
            Some(symbol) => print_json(&finder.cached_dates(&symbol)?)?,
            None => print_json(&finder.cached_symbols()?)?,
        },
    }
    Ok(())
}
