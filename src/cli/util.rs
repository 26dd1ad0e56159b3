//! CLI utility helpers

use obsweave::{Error, Result};
use std::fs;
use std::path::PathBuf;

/// Value following `--name` (or its short form)
pub fn option_arg<'a>(args: &'a [String], long: &str, short: Option<&str>) -> Option<&'a str> {
    args.iter()
        .position(|a| a == long || Some(a.as_str()) == short)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

/// First argument that is neither a flag nor a flag's value
pub fn positional<'a>(args: &'a [String], valued: &[&str]) -> Option<&'a str> {
    let mut skip = false;
    for arg in args {
        if skip {
            skip = false;
            continue;
        }
        if valued.contains(&arg.as_str()) {
            skip = true;
            continue;
        }
        if !arg.starts_with('-') {
            return Some(arg);
        }
    }
    None
}

/// Parse --output argument to determine output file path
pub fn parse_output_arg(args: &[String]) -> Option<PathBuf> {
    option_arg(args, "--output", Some("-o")).map(PathBuf::from)
}

/// Write content to file or stdout
pub fn write_output(path: &Option<PathBuf>, content: &str) -> Result<()> {
    match path {
        Some(p) => {
            fs::write(p, content).map_err(Error::Io)?;
            eprintln!("Written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_positional_skips_flag_values() {
        let a = args(&["--mode", "force", "app.yaml", "--verbose"]);
        assert_eq!(positional(&a, &["--mode"]), Some("app.yaml"));
        assert_eq!(option_arg(&a, "--mode", None), Some("force"));
        assert!(has_flag(&a, "--verbose"));
        assert_eq!(parse_output_arg(&a), None);
    }
}
