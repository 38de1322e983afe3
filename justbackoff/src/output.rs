use anyhow::Result;
use serde_json::Value as JsonValue;
use std::io::{self, Write};

#[derive(Clone, Debug)]
pub enum OutputFormat {
    Yaml,
    Json,
    Raw,
}

pub fn emit_data(fmt: &OutputFormat, data: &JsonValue) -> Result<()> {
    let s = render(fmt, data)?;
    let mut out = io::stdout().lock();
    match fmt {
        OutputFormat::Raw => write!(out, "{}", s)?,
        _ => writeln!(out, "{}", s)?,
    }
    out.flush()?;
    Ok(())
}

pub fn render(fmt: &OutputFormat, data: &JsonValue) -> Result<String> {
    let s = match fmt {
        OutputFormat::Yaml => serde_yaml::to_string(data)?.trim_end().to_string(),
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::Raw => match data.as_str() {
            Some(s) => s.to_string(),
            None => serde_json::to_string(data)?,
        },
    };
    Ok(s)
}

/// Wraps a payload as `{data, meta}`; `meta` is omitted when `None`.
pub fn wrap_ok(data: &JsonValue, meta: Option<JsonValue>) -> JsonValue {
    let mut map = serde_json::Map::new();
    map.insert("data".into(), data.clone());
    if let Some(meta) = meta {
        map.insert("meta".into(), meta);
    }
    JsonValue::Object(map)
}

/// Structured form of an error chain: the outermost message plus its causes.
pub fn error_value(err: &anyhow::Error) -> JsonValue {
    let mut map = serde_json::Map::new();
    map.insert("error".into(), JsonValue::String(err.to_string()));
    let causes: Vec<JsonValue> = err
        .chain()
        .skip(1)
        .map(|c| JsonValue::String(c.to_string()))
        .collect();
    if !causes.is_empty() {
        map.insert("causes".into(), JsonValue::Array(causes));
    }
    JsonValue::Object(map)
}

pub fn emit_error(err: &anyhow::Error) -> Result<()> {
    let s = serde_yaml::to_string(&error_value(err))?;
    let _ = writeln!(io::stderr(), "{}", s.trim_end());
    Ok(())
}
