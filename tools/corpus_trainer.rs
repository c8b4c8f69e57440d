/// Corpus Trainer — builds a word chain from a text corpus.
///
/// Usage: corpus_trainer --input <corpus.txt> --output <transitions.txt> [--order <1-5>]
///                       [--snapshot <chain.ron>] [--config <config.ron>]
use std::path::Path;
use std::process;

use word_chain::core::chain::{save_chain, ChainBuilder};
use word_chain::core::config::ChainConfig;
use word_chain::core::corpus;
use word_chain::core::transitions::TransitionTable;

const USAGE: &str = "Usage: corpus_trainer --input <corpus.txt> --output <transitions.txt> \
[--order <1-5>] [--snapshot <chain.ron>] [--config <config.ron>]";

fn main() {
    init_tracing();
    let args: Vec<String> = std::env::args().collect();

    let mut input = None;
    let mut output = None;
    let mut snapshot = None;
    let mut order = None;
    let mut config_path = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--input" if i + 1 < args.len() => {
                i += 1;
                input = Some(args[i].clone());
            }
            "--output" if i + 1 < args.len() => {
                i += 1;
                output = Some(args[i].clone());
            }
            "--snapshot" if i + 1 < args.len() => {
                i += 1;
                snapshot = Some(args[i].clone());
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--order" if i + 1 < args.len() => {
                i += 1;
                order = Some(args[i].parse::<usize>().unwrap_or_else(|_| {
                    eprintln!("Error: --order must be a positive integer");
                    process::exit(1);
                }));
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

    let config = load_config(config_path.as_deref());

    let input_path = input.unwrap_or_else(|| {
        eprintln!("Error: --input is required");
        eprintln!("{}", USAGE);
        process::exit(1);
    });
    let output_path = output.unwrap_or_else(|| {
        eprintln!("Error: --output is required");
        eprintln!("{}", USAGE);
        process::exit(1);
    });

    let order = order.unwrap_or(config.order);
    if let Err(e) = config.check_order(order) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let tokens = corpus::load_corpus(Path::new(&input_path)).unwrap_or_else(|e| {
        eprintln!("Error reading input file '{}': {}", input_path, e);
        process::exit(1);
    });
    println!("Read {} words from '{}'", tokens.len(), input_path);

    println!("Training order-{} chain...", order);
    let chain = ChainBuilder::build(&tokens, order).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        process::exit(1);
    });
    println!(
        "Chain trained: {} states, {} transitions",
        chain.len(),
        chain.transition_count()
    );

    TransitionTable::from_chain(&chain)
        .save(Path::new(&output_path))
        .unwrap_or_else(|e| {
            eprintln!("Error writing transitions to '{}': {}", output_path, e);
            process::exit(1);
        });
    println!("Transitions saved to '{}'", output_path);

    if let Some(snapshot_path) = snapshot {
        save_chain(&chain, Path::new(&snapshot_path)).unwrap_or_else(|e| {
            eprintln!("Error saving chain to '{}': {}", snapshot_path, e);
            process::exit(1);
        });
        println!("Chain snapshot saved to '{}'", snapshot_path);
    }
}

fn load_config(path: Option<&str>) -> ChainConfig {
    match path {
        Some(path) => ChainConfig::load_from_ron(Path::new(path)).unwrap_or_else(|e| {
            eprintln!("Error loading config '{}': {}", path, e);
            process::exit(1);
        }),
        None => ChainConfig::default(),
    }
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
