use clap::{Parser, Subcommand};
use keiro::prelude::*;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

// --- Script Format ---
// A script is a JSON array of turns, each either a function call on the
// active node or a raw handler invocation.

#[derive(Deserialize)]
#[serde(untagged)]
enum ScriptTurn {
    Function {
        function: String,
        #[serde(default)]
        args: Map<String, Value>,
    },
    Invoke {
        handler: String,
        #[serde(default)]
        args: Map<String, Value>,
    },
}

/// Validate and dry-run tutoring flow configurations
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and validate a flow, then print its diagnostics
    Validate {
        /// Path to the flow configuration JSON file
        flow: PathBuf,
        /// Optional JSON file with initial session variables
        #[arg(long)]
        variables: Option<PathBuf>,
    },
    /// Drive a session through a scripted list of turns
    Run {
        /// Path to the flow configuration JSON file
        flow: PathBuf,
        /// Optional JSON file with initial session variables
        #[arg(long)]
        variables: Option<PathBuf>,
        /// JSON array of turns: {"function": ..., "args": {...}} or {"handler": ..., "args": {...}}
        #[arg(long)]
        script: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Validate { flow, variables } => run_validate(&flow, variables.as_deref()),
        Command::Run {
            flow,
            variables,
            script,
        } => run_script(&flow, variables.as_deref(), &script),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_validate(flow: &Path, variables: Option<&Path>) {
    let start = Instant::now();
    let (config, state) = load(flow, variables)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load '{}': {}", flow.display(), e)));
    let diagnostics = config.diagnostics();

    println!("\nFlow '{}' is valid.", diagnostics.name);
    println!("\n--- Diagnostics ---");
    println!("Initial Node:       {}", diagnostics.initial_node);
    println!("Nodes:              {}", diagnostics.node_count);
    println!("Stages:             {}", diagnostics.stage_count);
    println!("Function Schemas:   {}", diagnostics.schema_count);
    println!("Info Fields:        {}", state.info.len());
    println!("Session Variables:  {}", state.session_variables.len());
    println!("-----------------------------");
    println!("Validated in:       {:?}", start.elapsed());
    println!();
}

fn run_script(flow: &Path, variables: Option<&Path>, script_path: &Path) {
    let script_json = fs::read_to_string(script_path).unwrap_or_else(|e| {
        exit_with_error(&format!(
            "Failed to read script file '{}': {}",
            script_path.display(),
            e
        ))
    });
    let turns: Vec<ScriptTurn> = serde_json::from_str(&script_json)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse script JSON: {}", e)));

    let registry = Arc::new(Registry::new());
    let mut session = FlowSession::start(flow, variables, registry)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to start session: {}", e)));

    let entry = session
        .begin()
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to enter initial node: {}", e)));
    print_entry(&entry);

    for (index, turn) in turns.into_iter().enumerate() {
        if session.is_finished() {
            println!("\nSession finished after {} turns.", index);
            return;
        }
        match turn {
            ScriptTurn::Function { function, args } => {
                println!("\n[{}] {}({})", index, function, Value::Object(args.clone()));
                let outcome = session
                    .call_function(&function, &args)
                    .unwrap_or_else(|e| exit_with_error(&format!("Turn {} failed: {}", index, e)));
                println!("  -> {}", outcome.result.to_json());
                if let Some(transition) = outcome.transition {
                    println!("  -> Transition: {} -> {}", transition.from, transition.to);
                    print_entry(&transition.entry);
                }
            }
            ScriptTurn::Invoke { handler, args } => {
                println!("\n[{}] invoke {}({})", index, handler, Value::Object(args.clone()));
                let result = session
                    .invoke(&handler, &args)
                    .unwrap_or_else(|e| exit_with_error(&format!("Turn {} failed: {}", index, e)));
                println!("  -> {}", result.to_json());
            }
        }
    }

    println!("\n--- Final State ---");
    println!("Active Node: {}", session.current_node());
    println!("Finished:    {}", session.is_finished());
    match serde_json::to_string_pretty(session.state()) {
        Ok(state) => println!("{}", state),
        Err(e) => exit_with_error(&format!("Failed to render session state: {}", e)),
    }
}

fn print_entry(entry: &NodeEntry) {
    println!("\n== Node '{}' ==", entry.node);
    for message in &entry.messages {
        println!("  [{}] {}", message.role, message.content);
    }
    for tool in &entry.tools {
        if let Some(name) = tool.get("name").and_then(Value::as_str) {
            println!("  tool: {}", name);
        }
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
