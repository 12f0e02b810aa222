/// Rule DSL Tracer - Shows the flow through Tokens → Rules → JSON → DSL
///
/// Usage: cargo run --bin trace_rules <rules-file>
///
/// Log verbosity follows RUST_LOG (default: info).

use std::fs;
use std::process::ExitCode;
use tabrule_dsl::{serialize_rules_to_dsl, tokenize, validate_dsl, RuleSetCompiler};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: cargo run --bin trace_rules <rules-file>");
        eprintln!();
        eprintln!("Example:");
        eprintln!("  cargo run --bin trace_rules rules/cleanup.rules");
        return ExitCode::FAILURE;
    }

    let path = &args[1];

    println!("╔═══════════════════════════════════════════════════════════════");
    println!("║ RULE DSL TRACER");
    println!("╚═══════════════════════════════════════════════════════════════\n");

    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(path = %path, error = %e, "failed to read rules file");
            return ExitCode::FAILURE;
        }
    };

    println!("📝 INPUT:");
    println!("{}", source);
    println!();

    println!("🔍 TOKENS:");
    println!("─────────────────────────────────────────────────────────────");
    for token in tokenize(&source) {
        println!(
            "  {:>4}:{:<3} {}",
            token.span.line, token.span.column, token.kind
        );
    }
    println!();

    let result = validate_dsl(&source);
    let rules = match (result.valid, result.rules) {
        (true, Some(rules)) => rules,
        _ => {
            println!("❌ INVALID:");
            println!("  {}", result.error.unwrap_or_default());
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(rules = rules.len(), "rules validated");

    println!("📦 COMPILED JSON:");
    println!("─────────────────────────────────────────────────────────────");
    match serde_json::to_string_pretty(&rules) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize rules");
            return ExitCode::FAILURE;
        }
    }
    println!();

    println!("🔁 CANONICAL DSL:");
    println!("─────────────────────────────────────────────────────────────");
    print!("{}", serialize_rules_to_dsl(&rules));
    println!();

    match RuleSetCompiler::compile(rules) {
        Ok(set) => println!("✅ {} rule(s), fingerprint {}", set.len(), set.fingerprint()),
        Err(e) => {
            tracing::error!(error = %e, "rule set failed to compile");
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}
