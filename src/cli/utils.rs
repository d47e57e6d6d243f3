use serde_json::Value;
use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: OutputFormat,
    message: &str,
    data: &Value,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output a record as `key: value` lines, or raw JSON
pub fn output_record(output_format: OutputFormat, data: &Value) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
        OutputFormat::Text => match data.as_object() {
            Some(object) => {
                for (key, value) in object {
                    match value {
                        Value::String(s) => println!("{}: {}", key, s),
                        other => println!("{}: {}", key, other),
                    }
                }
            }
            None => println!("{}", data),
        },
    }
    Ok(())
}

/// Read a JSON document from a path, or stdin when the path is `-`
pub fn read_json_input(path: &str) -> anyhow::Result<Value> {
    let raw = if path == "-" {
        std::io::read_to_string(std::io::stdin())?
    } else {
        std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path, e))?
    };
    serde_json::from_str(&raw).map_err(|e| anyhow::anyhow!("{} is not valid JSON: {}", path, e))
}
