//! Cache key derivation.
//!
//! A fingerprint identifies one (profile, source version) pair. Every profile
//! field is written into a SHA-256 hasher in a fixed order as `name` followed
//! by its type-tagged text, then the tag `mtime` and the source modification
//! time in epoch seconds. The digest is truncated to 128 bits and hex encoded.
//!
//! Sequences (the raw `trim` arguments) are serialized structurally so that
//! `["a,b"]` and `["a", "b"]` never collide: strings inside a sequence are
//! quoted and escaped, nested arrays and tables keep their brackets.

use crate::config::ConfigError;
use crate::profile::{FieldValue, TransformProfile};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::time::SystemTime;
use toml::Value;

/// Bytes of the SHA-256 digest kept in the fingerprint.
const DIGEST_BYTES: usize = 16;

/// Derive the fingerprint for a profile and a source modification time.
pub fn fingerprint(profile: &TransformProfile, source_mtime: i64) -> Result<String, ConfigError> {
    let mut hasher = Sha256::new();

    for (name, value) in profile.fields() {
        hasher.update(name.as_bytes());
        hasher.update(serialize_field(name, value)?.as_bytes());
    }
    hasher.update(b"mtime");
    hasher.update(source_mtime.to_string().as_bytes());

    let digest = hasher.finalize();
    Ok(hex::encode(&digest[..DIGEST_BYTES]))
}

/// Seconds since the Unix epoch for a file timestamp.
pub fn epoch_seconds(time: SystemTime) -> i64 {
    DateTime::<Utc>::from(time).timestamp()
}

fn serialize_field(name: &str, value: FieldValue<'_>) -> Result<String, ConfigError> {
    Ok(match value {
        FieldValue::Bool(b) => b.to_string(),
        FieldValue::Integer(n) => n.to_string(),
        FieldValue::Str(s) => s.to_string(),
        FieldValue::Sequence(items) => {
            let mut out = String::new();
            write_array(name, items, &mut out)?;
            out
        }
    })
}

fn write_array(field: &str, items: &[Value], out: &mut String) -> Result<(), ConfigError> {
    out.push('[');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_value(field, item, out)?;
    }
    out.push(']');
    Ok(())
}

fn write_value(field: &str, value: &Value, out: &mut String) -> Result<(), ConfigError> {
    match value {
        Value::Boolean(b) => out.push_str(&b.to_string()),
        Value::Integer(n) => out.push_str(&n.to_string()),
        Value::Float(f) => out.push_str(&format!("{f:?}")),
        Value::String(s) => out.push_str(&format!("{s:?}")),
        Value::Array(items) => write_array(field, items, out)?,
        Value::Table(table) => {
            out.push('{');
            for (i, (key, item)) in table.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&format!("{key:?}:"));
                write_value(field, item, out)?;
            }
            out.push('}');
        }
        Value::Datetime(_) => {
            return Err(ConfigError::UnsupportedType {
                field: field.to_string(),
                kind: "datetime",
            });
        }
    }
    Ok(())
}
