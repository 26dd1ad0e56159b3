//! `obsweave schema`

use obsweave::*;

pub fn cmd_schema(args: &[String]) -> Result<()> {
    let schema_name = args.first().map(|s| s.as_str()).unwrap_or("list");

    let schema = match schema_name {
        "list" => {
            println!("Available schemas: config, manifest");
            return Ok(());
        }
        "config" => schemars::schema_for!(GeneratorConfig),
        "manifest" => schemars::schema_for!(Manifest),
        _ => return Err(format!("Unknown schema: {}", schema_name).into()),
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
