/// Story — generates text by walking a word chain.
///
/// Usage: story (--input <corpus.txt> | --snapshot <chain.ron> | --transitions <file.txt>)
///              [--order <1-5>] [--start <words>] [--limit <n>] [--seed <n>] [--config <config.ron>]
///
/// With --input or --snapshot the walk starts from --start, or from the
/// configured default start for the order. With --transitions the start
/// defaults to a random state of the table.
use std::path::Path;
use std::process;
use std::str::FromStr;

use rand::rngs::StdRng;
use word_chain::core::chain::{load_chain, ChainBuilder, MarkovChain, MarkovError};
use word_chain::core::config::ChainConfig;
use word_chain::core::corpus;
use word_chain::core::generator::{generate, random_start, render_states};
use word_chain::core::state::State;
use word_chain::core::transitions::load_table;

const USAGE: &str = "Usage: story (--input <corpus.txt> | --snapshot <chain.ron> | --transitions <file.txt>) \
[--order <1-5>] [--start <words>] [--limit <n>] [--seed <n>] [--config <config.ron>]";

enum Source {
    Corpus(String),
    Snapshot(String),
    Table(String),
}

fn main() {
    init_tracing();
    let args: Vec<String> = std::env::args().collect();

    let mut source = None;
    let mut order = None;
    let mut start = None;
    let mut limit = None;
    let mut seed = None;
    let mut config_path = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--input" if i + 1 < args.len() => {
                i += 1;
                source = Some(Source::Corpus(args[i].clone()));
            }
            "--snapshot" if i + 1 < args.len() => {
                i += 1;
                source = Some(Source::Snapshot(args[i].clone()));
            }
            "--transitions" if i + 1 < args.len() => {
                i += 1;
                source = Some(Source::Table(args[i].clone()));
            }
            "--order" if i + 1 < args.len() => {
                i += 1;
                order = Some(parse_number(&args[i], "--order"));
            }
            "--limit" if i + 1 < args.len() => {
                i += 1;
                limit = Some(parse_number(&args[i], "--limit"));
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = Some(parse_number(&args[i], "--seed"));
            }
            "--start" if i + 1 < args.len() => {
                i += 1;
                start = Some(args[i].clone());
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--help" | "-h" => {
                println!("{}", USAGE);
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                eprintln!("{}", USAGE);
                process::exit(1);
            }
        }
        i += 1;
    }

    let mut config = match config_path {
        Some(ref path) => ChainConfig::load_from_ron(Path::new(path)).unwrap_or_else(|e| {
            eprintln!("Error loading config '{}': {}", path, e);
            process::exit(1);
        }),
        None => ChainConfig::default(),
    };
    if seed.is_some() {
        config.seed = seed;
    }
    let mut rng = config.rng();

    let source = source.unwrap_or_else(|| {
        eprintln!("Error: one of --input, --snapshot or --transitions is required");
        eprintln!("{}", USAGE);
        process::exit(1);
    });

    let result = match source {
        Source::Corpus(path) => {
            let order = order.unwrap_or(config.order);
            let tokens = corpus::load_corpus(Path::new(&path)).unwrap_or_else(|e| {
                eprintln!("Error reading corpus '{}': {}", path, e);
                process::exit(1);
            });
            let chain = ChainBuilder::build(&tokens, order).unwrap_or_else(|e| fail(e));
            println!("Number of states in the chain: {}", chain.len());
            walk_chain(&chain, &config, start.as_deref(), limit, &mut rng)
        }
        Source::Snapshot(path) => {
            let chain = load_chain(Path::new(&path)).unwrap_or_else(|e| fail(e));
            walk_chain(&chain, &config, start.as_deref(), limit, &mut rng)
        }
        Source::Table(path) => {
            let report = load_table(Path::new(&path), &config.encodings).unwrap_or_else(|e| {
                eprintln!("Error loading transitions '{}': {}", path, e);
                process::exit(1);
            });
            let start = match start {
                Some(text) => State::parse(&text),
                None => random_start(&report.table, &mut rng).unwrap_or_else(|e| fail(e)),
            };
            generate(&report.table, &start, limit.unwrap_or(config.walk_limit), &mut rng)
        }
    };

    match result {
        Ok(walk) => println!("{}", render_states(&walk)),
        Err(e) => {
            if let Some(partial) = e.partial() {
                if !partial.is_empty() {
                    println!("{}", render_states(partial));
                }
            }
            fail(e);
        }
    }
}

fn walk_chain(
    chain: &MarkovChain,
    config: &ChainConfig,
    start: Option<&str>,
    limit: Option<usize>,
    rng: &mut StdRng,
) -> Result<Vec<State>, MarkovError> {
    let start = config.resolve_start(chain.order(), start)?;
    generate(chain, &start, limit.unwrap_or(config.story_limit), rng)
}

fn parse_number<T: FromStr>(value: &str, flag: &str) -> T {
    value.parse().unwrap_or_else(|_| {
        eprintln!("Error: {} must be a non-negative integer", flag);
        process::exit(1);
    })
}

fn fail(e: MarkovError) -> ! {
    eprintln!("Error: {}", e);
    process::exit(1);
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
