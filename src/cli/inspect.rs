//! `obsweave scan` and `obsweave providers`

use super::util::{has_flag, option_arg, parse_output_arg, positional, write_output};
use obsweave::*;
use std::fs;

pub fn cmd_scan(args: &[String]) -> Result<()> {
    let path = positional(args, &["--output", "-o"])
        .ok_or("Usage: obsweave scan <file.cs> [--json] [--output <file>]")?;
    let source = fs::read_to_string(path).map_err(Error::Io)?;
    let nodes = scan_csharp(path, &source)?;
    let cancel = CancellationToken::new();

    let content = if has_flag(args, "--json") {
        serde_json::to_string_pretty(&nodes)?
    } else {
        nodes
            .iter()
            .map(|n| {
                format!(
                    "{}  {:?}  {}{}",
                    n.location,
                    n.kind,
                    n.callee.name().unwrap_or("<expr>"),
                    if is_candidate(n, &cancel) { "" } else { "  (skipped)" }
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    write_output(&parse_output_arg(args), &content)
}

pub fn cmd_providers(args: &[String]) -> Result<()> {
    let registry = match option_arg(args, "--config", None) {
        Some(path) => GeneratorConfig::load(path.as_ref())?.registry(),
        None => ProviderRegistry::builtin(),
    };

    let entries: Vec<&ProviderDefinition> = match option_arg(args, "--refs", None) {
        Some(refs) => {
            let refs: Vec<&str> = refs.split(',').map(str::trim).collect();
            registry.detect_providers(&refs)
        }
        None => registry.entries().iter().collect(),
    };

    if has_flag(args, "--json") {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for entry in entries {
        let category = match entry.category {
            ProviderCategory::GenAi => "genai",
            ProviderCategory::Database => "database",
        };
        println!(
            "{:<9} {:<24} {:<40} matcher={}",
            category, entry.id, entry.library, entry.matcher
        );
    }
    Ok(())
}
