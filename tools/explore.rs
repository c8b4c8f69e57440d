/// Explore — extracts a bounded subgraph around a state of a transition file.
///
/// Without --start a random state of the file is used.
///
/// Usage: explore --transitions <file.txt> [--start <words>] [--depth <n>]
///                [--branches <n>] [--json <out.json>] [--config <config.ron>]
use std::path::Path;
use std::process;

use word_chain::core::config::ChainConfig;
use word_chain::core::explore::extract;
use word_chain::core::generator::random_start;
use word_chain::core::state::State;
use word_chain::core::transitions::load_table;

const USAGE: &str = "Usage: explore --transitions <file.txt> [--start <words>] [--depth <n>] \
[--branches <n>] [--json <out.json>] [--config <config.ron>]";

fn main() {
    init_tracing();
    let args: Vec<String> = std::env::args().collect();

    let mut transitions = None;
    let mut start = None;
    let mut depth = None;
    let mut branches = None;
    let mut json_path = None;
    let mut config_path = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--transitions" if i + 1 < args.len() => {
                i += 1;
                transitions = Some(args[i].clone());
            }
            "--start" if i + 1 < args.len() => {
                i += 1;
                start = Some(args[i].clone());
            }
            "--depth" if i + 1 < args.len() => {
                i += 1;
                depth = Some(parse_count(&args[i], "--depth"));
            }
            "--branches" if i + 1 < args.len() => {
                i += 1;
                branches = Some(parse_count(&args[i], "--branches"));
            }
            "--json" if i + 1 < args.len() => {
                i += 1;
                json_path = Some(args[i].clone());
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

    let config = match config_path {
        Some(ref path) => ChainConfig::load_from_ron(Path::new(path)).unwrap_or_else(|e| {
            eprintln!("Error loading config '{}': {}", path, e);
            process::exit(1);
        }),
        None => ChainConfig::default(),
    };

    let transitions_path = transitions.unwrap_or_else(|| {
        eprintln!("Error: --transitions is required");
        eprintln!("{}", USAGE);
        process::exit(1);
    });

    let report = load_table(Path::new(&transitions_path), &config.encodings).unwrap_or_else(|e| {
        eprintln!("Error loading transitions '{}': {}", transitions_path, e);
        process::exit(1);
    });
    println!(
        "Loaded {} states using {} ({} malformed lines skipped)",
        report.table.len(),
        report.encoding,
        report.skipped.len()
    );

    let depth = depth.unwrap_or(config.depth);
    let branches = branches.unwrap_or(config.max_branches);
    let start = match start {
        Some(text) => State::parse(&text),
        None => random_start(&report.table, &mut config.rng()).unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            process::exit(1);
        }),
    };

    let graph = extract(&report.table, &start, depth, branches).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        process::exit(1);
    });

    if graph.substituted_start() {
        println!(
            "Start '{}' not found, exploring from '{}'",
            graph.requested_start(),
            graph.start()
        );
    }
    println!(
        "Chain from '{}' (depth: {}, max branches: {}): {} nodes, {} edges",
        graph.start(),
        graph.depth(),
        graph.max_branches(),
        graph.nodes().len(),
        graph.edges().len()
    );
    for node in graph.nodes() {
        let edges: Vec<String> = graph
            .outgoing(&node.state)
            .map(|edge| format!("{} ({:.2})", edge.to, edge.probability))
            .collect();
        if edges.is_empty() {
            println!("{:>width$}{}", "", node.state, width = node.depth * 2);
        } else {
            println!(
                "{:>width$}{} -> {}",
                "",
                node.state,
                edges.join(", "),
                width = node.depth * 2
            );
        }
    }

    if let Some(path) = json_path {
        let json = graph.to_json().unwrap_or_else(|e| {
            eprintln!("Error serializing subgraph: {}", e);
            process::exit(1);
        });
        std::fs::write(&path, json).unwrap_or_else(|e| {
            eprintln!("Error writing '{}': {}", path, e);
            process::exit(1);
        });
        println!("Subgraph written to '{}'", path);
    }
}

fn parse_count(value: &str, flag: &str) -> usize {
    value.parse().unwrap_or_else(|_| {
        eprintln!("Error: {} must be a non-negative integer", flag);
        process::exit(1);
    })
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
