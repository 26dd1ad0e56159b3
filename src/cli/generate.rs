//! `obsweave generate`

use super::util::{has_flag, option_arg, positional};
use chrono::Utc;
use obsweave::*;
use std::path::{Path, PathBuf};

const VALUED: &[&str] = &["--out", "-o", "--mode", "--config"];

pub fn cmd_generate(args: &[String]) -> Result<()> {
    let manifest_path = positional(args, VALUED).ok_or(
        "Usage: obsweave generate <manifest.yaml> [--out <dir>] [--mode <force|dry-run|skip-existing>] [--config <file>] [--stdout]",
    )?;

    let config = load_config(args)?;
    let host = ManifestHost::load(Path::new(manifest_path))?;
    let nodes = host.nodes()?;

    let pipeline = Pipeline::new(config);
    let output = pipeline.run(&host, &nodes, &CancellationToken::new())?;

    if has_flag(args, "--stdout") {
        for unit in &output.units {
            println!("// ---- {} ----", unit.hint_name);
            println!("{}", unit.source);
        }
        return Ok(());
    }

    let config = pipeline.config();
    let dir = option_arg(args, "--out", Some("-o"))
        .map(PathBuf::from)
        .unwrap_or_else(|| config.output.dir.clone());
    let mode = match option_arg(args, "--mode", None) {
        Some(m) => m.parse::<WriteMode>()?,
        None => config.output.mode,
    };
    let timestamp = (config.output.timestamp && !has_flag(args, "--no-timestamp")).then(Utc::now);

    let reports = write_units(&output.units, &dir, mode, timestamp)?;
    for report in &reports {
        println!("{:>12}  {}", report.outcome.to_string(), report.path.display());
    }
    println!(
        "{} fact(s) from {} candidate(s), {} meter class(es), {} unit(s)",
        output.facts,
        output.candidates,
        output.meter_classes,
        reports.len()
    );
    if output.faulted > 0 {
        eprintln!("warning: {} node(s) skipped after classification errors", output.faulted);
    }
    Ok(())
}

/// `--config <file>`, else `.obsweave.yaml` in the working directory
fn load_config(args: &[String]) -> Result<GeneratorConfig> {
    match option_arg(args, "--config", None) {
        Some(path) => GeneratorConfig::load(Path::new(path)),
        None => {
            let cwd = std::env::current_dir().map_err(Error::Io)?;
            GeneratorConfig::load_from_dir(&cwd)
        }
    }
}
