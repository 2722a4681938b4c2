//! Config redaction: produce safe-to-log config snapshots by masking secrets.

use serde_json::Value;

use crate::schema::GroundwaterConfig;

/// Keys whose string values are secrets.
static SECRET_KEYS: &[&str] = &[
    "apiKey",
    "api_key",
    "razorpayKeySecret",
    "razorpay_key_secret",
    "secret",
    "token",
    "password",
];

fn is_secret_key(key: &str) -> bool {
    SECRET_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

/// Redact a config JSON value, keeping only a 4-character hint of each secret.
pub fn redact(value: &Value) -> Value {
    redact_recursive(value, "")
}

/// Redacted view of a typed config.
pub fn redact_config(config: &GroundwaterConfig) -> Value {
    serde_json::to_value(config)
        .map(|v| redact(&v))
        .unwrap_or(Value::Null)
}

fn redact_recursive(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) if is_secret_key(key) && !s.is_empty() => {
            let hint: String = s.chars().take(4).collect();
            if s.chars().count() > 4 {
                Value::String(format!("{hint}***"))
            } else {
                Value::String("***".to_string())
            }
        }
        Value::Array(arr) => Value::Array(arr.iter().map(|v| redact_recursive(v, key)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_recursive(v, k)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redacts_api_key() {
        let mut config = GroundwaterConfig::default();
        config.provider.api_key = Some("sk-or-v1-abcdef123456".into());
        let redacted = redact_config(&config);
        let key = redacted["provider"]["apiKey"].as_str().unwrap();
        assert_eq!(key, "sk-o***");
    }

    #[test]
    fn short_secrets_are_fully_masked() {
        let redacted = redact(&json!({"payments": {"razorpayKeySecret": "abc"}}));
        assert_eq!(redacted["payments"]["razorpayKeySecret"], "***");
    }

    #[test]
    fn passthrough_non_sensitive() {
        let redacted = redact(&json!({ "logging": { "level": "debug" } }));
        assert_eq!(redacted["logging"]["level"], "debug");
    }
}
