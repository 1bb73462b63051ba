use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process;

use blockwright::blocks::countdown::AnchoredClock;
use blockwright::page::run_countdowns;
use blockwright::{
    BlockHandle, BlockResult, DecorateConfig, DecorateOptions, Page, PokeApi, PokemonSource,
};
use chrono::{DateTime, Utc};
use clap::Parser;
use log::info;

/// Decorate every authored block in an HTML page.
#[derive(Debug, Parser)]
#[command(name = "blocks-decorate", version)]
struct Args {
    /// HTML page to decorate; stdin when omitted
    input: Option<PathBuf>,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Evaluate countdowns at this RFC 3339 instant instead of the current time
    #[arg(long, value_parser = parse_instant)]
    now: Option<DateTime<Utc>>,

    /// Write the page here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Leave pokemon blocks loading instead of calling PokeAPI
    #[arg(long)]
    offline: bool,

    /// Tick countdowns until every one has expired before writing the page
    #[arg(long)]
    run: bool,
}

fn parse_instant(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {}", e))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("✗ failed to start runtime: {}", e);
            process::exit(1);
        }
    };

    match runtime.block_on(run(args)) {
        Ok((total, failed)) => {
            eprintln!("✓ decorated {} block(s), {} rendered an error", total, failed);
        }
        Err(e) => {
            eprintln!("✗ {}", e);
            process::exit(1);
        }
    }
}

async fn run(args: Args) -> BlockResult<(usize, usize)> {
    let config = match &args.config {
        Some(path) => DecorateConfig::load(path)?,
        None => DecorateConfig::default(),
    };
    let api = if args.offline {
        None
    } else {
        Some(PokeApi::from_config(&config)?)
    };
    let options = DecorateOptions::new(config, args.now.unwrap_or_else(Utc::now))?;

    let html = match &args.input {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut html = String::new();
            io::stdin().read_to_string(&mut html)?;
            html
        }
    };

    let page = Page::parse(&html);
    let source = api.as_ref().map(|api| api as &dyn PokemonSource);
    let decorated = page.decorate(&options, source).await;
    let total = decorated.len();
    let failed = decorated.iter().filter(|block| !block.is_ok()).count();
    info!("{} block(s) found", total);

    if args.run {
        let countdowns: Vec<_> = decorated
            .into_iter()
            .filter_map(|block| match block.result {
                Ok(BlockHandle::Countdown(countdown)) => Some(countdown),
                _ => None,
            })
            .collect();
        let period = options.config().tick_interval();
        info!("running {} countdown(s) every {:?}", countdowns.len(), period);
        let clock = AnchoredClock::starting_at(options.now());
        run_countdowns(countdowns, clock, period).await;
    }

    let output = page.to_html();
    match &args.output {
        Some(path) => fs::write(path, output)?,
        None => io::stdout().write_all(output.as_bytes())?,
    }
    Ok((total, failed))
}
