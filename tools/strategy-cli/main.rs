use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Instant;
use strategy_graph::engine::IndicatorUpdated;
use strategy_graph::prelude::*;

/// Validate, compile and replay node-based trading strategies
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Optional engine config JSON file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every validation error and warning for a strategy graph
    Validate {
        /// Path to the strategy graph JSON file
        graph_path: String,
    },
    /// Compile a graph and print its execution order
    Compile {
        graph_path: String,
        #[arg(short, long, default_value = "BTC_USDT")]
        symbol: String,
    },
    /// Run a compiled graph over recorded `indicator.updated` events or a price series
    Replay {
        graph_path: String,
        /// JSON array of events: `{"symbol", "timestamp", ...fields}`
        #[arg(short, long, conflicts_with = "prices")]
        events: Option<String>,
        /// Comma-separated prices, one tick per `interval` seconds
        #[arg(short, long, value_delimiter = ',')]
        prices: Vec<f64>,
        /// Seconds between ticks that carry no `timestamp`
        #[arg(short, long, default_value_t = 1.0)]
        interval: f64,
        #[arg(short, long, default_value = "BTC_USDT")]
        symbol: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to load config: {}", e))),
        None => EngineConfig::default(),
    }
    .with_env_overrides()
    .unwrap_or_else(|e| exit_with_error(&e.to_string()));

    match cli.command {
        Command::Validate { graph_path } => run_validate(&graph_path, config),
        Command::Compile { graph_path, symbol } => run_compile(&graph_path, &symbol, config).await,
        Command::Replay {
            graph_path,
            events,
            prices,
            interval,
            symbol,
        } => {
            let events = match events {
                Some(path) => load_events(&path),
                None => synthesize_events(&symbol, &prices, interval),
            };
            run_replay(&graph_path, events, &symbol, interval, config).await
        }
    }
}

fn load_graph(path: &str) -> StrategyGraph {
    StrategyGraph::from_file(path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load graph '{}': {}", path, e)))
}

fn run_validate(graph_path: &str, config: EngineConfig) {
    let graph = load_graph(graph_path);
    let report = GraphValidator::from_config(&config).validate(&graph);

    println!("Validation of '{}'", graph.name);
    for issue in report.errors.iter().chain(&report.warnings) {
        println!("  {:?}: {}", issue.severity, issue);
    }
    if report.is_valid() {
        println!("OK ({} warning(s))", report.warnings.len());
    } else {
        exit_with_error(&format!("{} validation error(s)", report.errors.len()));
    }
}

async fn run_compile(graph_path: &str, symbol: &str, config: EngineConfig) {
    let graph = load_graph(graph_path);
    let compiler = GraphCompiler::builder().with_config(config).build();

    let start = Instant::now();
    let plan = compiler
        .compile(&graph, symbol)
        .await
        .unwrap_or_else(|e| exit_with_error(&describe_compile_error(e)));
    println!(
        "Compiled '{}' for {} in {:?}",
        plan.name,
        plan.symbol,
        start.elapsed()
    );
    for (i, id) in plan.execution_order.iter().enumerate() {
        if let Some(node) = plan.node(id) {
            println!("  {:>3}. {} ({})", i + 1, id, node.node.node_type);
        }
    }
    if !plan.state_machines.is_empty() {
        println!("Temporal nodes: {}", plan.state_machine_nodes().join(", "));
    }
}

fn load_events(path: &str) -> Vec<IndicatorUpdated> {
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to read events '{}': {}", path, e)));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse events: {}", e)))
}

fn synthesize_events(symbol: &str, prices: &[f64], interval: f64) -> Vec<IndicatorUpdated> {
    if prices.is_empty() {
        exit_with_error("Replay needs --events or --prices");
    }
    let start = chrono::Utc::now().timestamp() as f64;
    prices
        .iter()
        .enumerate()
        .map(|(i, price)| {
            let mut event = IndicatorUpdated::new(symbol).with_field("price", *price);
            event.timestamp = Some(start + i as f64 * interval);
            event
        })
        .collect()
}

async fn run_replay(
    graph_path: &str,
    events: Vec<IndicatorUpdated>,
    symbol: &str,
    interval: f64,
    config: EngineConfig,
) {
    let graph = load_graph(graph_path);

    let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
    let step = chrono::Duration::milliseconds((interval * 1000.0) as i64);
    let compiler = GraphCompiler::builder()
        .with_config(config)
        .with_clock(clock.clone())
        .build();
    let mut plan = compiler
        .compile(&graph, symbol)
        .await
        .unwrap_or_else(|e| exit_with_error(&describe_compile_error(e)));

    let start = Instant::now();
    let mut emitted = 0;
    for (i, event) in events.iter().filter(|e| e.symbol == symbol).enumerate() {
        match event
            .timestamp
            .and_then(|t| chrono::DateTime::from_timestamp_millis((t * 1000.0) as i64))
        {
            Some(at) => clock.set(at),
            None if i > 0 => clock.advance(step),
            None => {}
        }
        let outcome = compiler.execute_plan(&mut plan, &event.to_snapshot()).await;
        for failure in &outcome.failures {
            eprintln!("  ! {}: {}", failure.node_id, failure.error);
        }
        for signal in outcome.signals {
            emitted += 1;
            match serde_json::to_string(&signal) {
                Ok(line) => println!("{}", line),
                Err(e) => eprintln!("  ! could not encode signal: {}", e),
            }
        }
    }
    eprintln!(
        "Replayed {} event(s), {} signal(s) in {:?}",
        events.len(),
        emitted,
        start.elapsed()
    );
}

fn describe_compile_error(error: CompileError) -> String {
    match error {
        CompileError::Validation(report) => {
            let lines: Vec<String> = report.errors.iter().map(|e| format!("  {}", e)).collect();
            format!("Graph failed validation:\n{}", lines.join("\n"))
        }
        other => other.to_string(),
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
