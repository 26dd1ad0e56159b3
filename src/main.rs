//! obsweave CLI - Command-line interface
//!
//! Commands:
//!   generate   - Generate interceptors and meter classes from a manifest
//!   scan       - List call sites found in a C# file
//!   providers  - Show the provider catalog
//!   schema     - Print JSON schema for the config or manifest format

mod cli;

use obsweave::telemetry::{init_logging, LogConfig};
use obsweave::VERSION;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    let verbose = args.iter().any(|a| a == "--verbose" || a == "-V");
    if let Err(e) = init_logging(&LogConfig::verbose(verbose)) {
        eprintln!("warning: {}", e);
    }

    let result = match args[1].as_str() {
        "generate" | "gen" => cli::cmd_generate(&args[2..]),
        "scan" => cli::cmd_scan(&args[2..]),
        "providers" => cli::cmd_providers(&args[2..]),
        "schema" => cli::cmd_schema(&args[2..]),
        "version" | "--version" | "-v" => {
            println!("obsweave {}", VERSION);
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            Err("Unknown command".into())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

fn print_usage() {
    println!(
        r#"
obsweave - Call-site interceptor synthesis

USAGE:
    obsweave <COMMAND> [OPTIONS]

COMMANDS:
    generate <manifest.yaml>         Generate interceptors and meter classes
    scan <file.cs>                   List call sites found in a C# file
    providers                        Show the provider catalog
    schema [config|manifest]         Print JSON schema for a file format
    version                          Print version

OPTIONS:
    --out, -o <dir>                  Output directory (generate; default from config)
    --mode <force|dry-run|skip-existing>
                                     Write mode (generate; default skip-existing)
    --config <file>                  Config file (default: ./.obsweave.yaml)
    --stdout                         Print generated units instead of writing them
    --no-timestamp                   Omit the "Generated:" line from written files
    --refs <a,b,...>                 Only providers among these libraries (providers)
    --json                           JSON output (scan, providers)
    --verbose, -V                    Debug logging to stderr (RUST_LOG overrides)

EXAMPLES:
    obsweave generate app.manifest.yaml --out obj/Generated
    obsweave generate app.manifest.yaml --mode dry-run
    obsweave scan src/Orders.cs
    obsweave providers --refs Npgsql,OpenAI
"#
    );
}
