use color_eyre::eyre::{self, Result};
use serde::{Deserialize, Serialize};

/// A typed scalar cell as reported by the remote side. Page data, structure
/// metadata and query results all use this one representation, so nothing
/// downstream has to special-case a remote type system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
  Null,
  Boolean(bool),
  Number(f64),
  Bigint(i64),
  String(String),
  Bytes(Vec<u8>),
  Unknown(String),
}

impl Value {
  pub fn is_null(&self) -> bool {
    matches!(self, Value::Null)
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::String(s) | Value::Unknown(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Value::Boolean(b) => Some(*b),
      _ => None,
    }
  }

  /// Display rendering for table cells.
  pub fn render(&self) -> String {
    match self {
      Value::Null => "NULL".to_string(),
      Value::Boolean(b) => b.to_string(),
      Value::Number(n) => n.to_string(),
      Value::Bigint(i) => i.to_string(),
      Value::String(s) => s.clone(),
      Value::Bytes(bytes) => format!("\\x{}", hex_string(bytes)),
      Value::Unknown(s) => s.clone(),
    }
  }

  /// SQL literal rendering, used when assembling UPDATE statements.
  pub fn to_sql_literal(&self) -> String {
    match self {
      Value::Null => "NULL".to_string(),
      Value::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
      Value::Number(n) => n.to_string(),
      Value::Bigint(i) => i.to_string(),
      Value::String(s) | Value::Unknown(s) => quote_string(s),
      Value::Bytes(bytes) => format!("X'{}'", hex_string(bytes)),
    }
  }
}

/// Single-quoted SQL string literal with embedded quotes doubled.
pub fn quote_string(s: &str) -> String {
  format!("'{}'", s.replace('\'', "''"))
}

fn hex_string(bytes: &[u8]) -> String {
  bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Coerces a user-entered string (or null) back into a typed value using the
/// column's declared type and nullability. A null input is only accepted for
/// nullable columns; everything else is parsed according to the declared
/// type's affinity.
pub fn coerce(input: Option<&str>, declared_type: &str, nullable: bool) -> Result<Value> {
  let Some(text) = input else {
    if nullable {
      return Ok(Value::Null);
    }
    eyre::bail!("null is not allowed for non-nullable {declared_type} column");
  };

  let ty = declared_type.to_lowercase();
  if ty.contains("int") {
    let parsed: i64 = text.trim().parse().map_err(|e| eyre::eyre!("invalid integer {text:?}: {e}"))?;
    Ok(Value::Bigint(parsed))
  } else if ty.contains("bool") {
    match text.trim().to_lowercase().as_str() {
      "true" | "1" => Ok(Value::Boolean(true)),
      "false" | "0" => Ok(Value::Boolean(false)),
      other => eyre::bail!("invalid boolean {other:?}"),
    }
  } else if ["real", "floa", "doub", "num", "dec"].iter().any(|t| ty.contains(t)) {
    let parsed: f64 = text.trim().parse().map_err(|e| eyre::eyre!("invalid number {text:?}: {e}"))?;
    Ok(Value::Number(parsed))
  } else if ty.contains("blob") || ty.contains("binary") {
    let hex = text.trim().trim_start_matches("\\x").trim_start_matches("0x");
    Ok(Value::Bytes(decode_hex(hex)?))
  } else {
    // char/text/clob and anything we do not recognize keeps the raw text
    Ok(Value::String(text.to_string()))
  }
}

fn decode_hex(hex: &str) -> Result<Vec<u8>> {
  if hex.len() % 2 != 0 {
    eyre::bail!("odd-length hex string");
  }
  (0..hex.len())
    .step_by(2)
    .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| eyre::eyre!("invalid hex byte: {e}")))
    .collect()
}
