//! Masking of credentials in debug log output.

use serde_json::Value;

/// Placeholder written in place of any sensitive value.
pub const REDACTED: &str = "***";

/// Request/response headers whose values are never logged.
pub const SENSITIVE_HEADERS: &[&str] = &[
    "X-Auth-Token",
    "X-Auth-Key",
    "X-Subject-Token",
    "X-Service-Token",
];

/// JSON keys whose values are never logged.
pub const SENSITIVE_KEYS: &[&str] = &[
    "adminPass",
    "admin_pass",
    "admin_password",
    "auth_password",
    "auth_token",
    "chappassword",
    "configdrive",
    "encrypted_key",
    "new_pass",
    "password",
    "secret",
    "secret_uuid",
    "sys_pswd",
    "token",
];

/// Shortest value found under a sensitive key that is also scrubbed from
/// the rest of the output; shorter values would mangle unrelated text.
pub const MIN_SCRUB_LEN: usize = 4;

/// Returns `true` when the header value must be masked.
pub fn is_sensitive_header(name: &str) -> bool {
    SENSITIVE_HEADERS
        .iter()
        .any(|sensitive| sensitive.eq_ignore_ascii_case(name))
}

/// Returns `true` when the JSON value stored under `key` must be masked.
pub fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS
        .iter()
        .any(|sensitive| sensitive.eq_ignore_ascii_case(key))
}

/// Masks sensitive values and remembers them, so they can also be scrubbed
/// from any other text that ends up in the same log output.
#[derive(Debug, Default)]
pub struct Redactor {
    secrets: Vec<String>,
}

impl Redactor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a value that must never be logged, such as a cached token.
    ///
    /// The JSON-escaped form is registered as well, so the secret is also
    /// caught inside serialized bodies.
    pub fn add_secret(&mut self, secret: impl Into<String>) {
        let secret = secret.into();
        if secret.is_empty() {
            return;
        }
        if let Some(escaped) = json_escaped(&secret).filter(|escaped| *escaped != secret) {
            self.push_unique(escaped);
        }
        self.push_unique(secret);
    }

    fn push_unique(&mut self, secret: String) {
        if !self.secrets.contains(&secret) {
            self.secrets.push(secret);
        }
    }

    /// Returns the value to log for a header.
    pub fn header_value(&mut self, name: &str, value: &str) -> String {
        if is_sensitive_header(name) {
            self.add_secret(value);
            REDACTED.to_owned()
        } else {
            value.to_owned()
        }
    }

    /// Returns a copy of `value` with every sensitive field masked, at any depth.
    pub fn json(&mut self, value: &Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, nested)| {
                        let masked = if is_sensitive_key(key) {
                            self.collect_secrets(nested);
                            Value::String(REDACTED.to_owned())
                        } else {
                            self.json(nested)
                        };
                        (key.clone(), masked)
                    })
                    .collect(),
            ),
            Value::Array(items) => Value::Array(items.iter().map(|item| self.json(item)).collect()),
            other => other.clone(),
        }
    }

    /// Replaces every occurrence of a known secret in `line`.
    pub fn scrub(&self, line: &str) -> String {
        let mut secrets: Vec<&str> = self.secrets.iter().map(String::as_str).collect();
        // Longest first so a secret containing another is replaced whole.
        secrets.sort_by_key(|secret| std::cmp::Reverse(secret.len()));

        let mut scrubbed = line.to_owned();
        for secret in secrets {
            if scrubbed.contains(secret) {
                scrubbed = scrubbed.replace(secret, REDACTED);
            }
        }
        scrubbed
    }

    // Only strings long enough to be recognizable are scrubbed elsewhere;
    // the value under the sensitive key itself is always masked.
    fn collect_secrets(&mut self, value: &Value) {
        match value {
            Value::String(text) if text.chars().count() >= MIN_SCRUB_LEN => {
                self.add_secret(text.clone());
            }
            Value::Array(items) => items.iter().for_each(|item| self.collect_secrets(item)),
            Value::Object(map) => map.values().for_each(|nested| self.collect_secrets(nested)),
            Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Null => {}
        }
    }
}

/// JSON string encoding of `text` without the surrounding quotes.
fn json_escaped(text: &str) -> Option<String> {
    let encoded = serde_json::to_string(text).ok()?;
    encoded
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{REDACTED, Redactor, is_sensitive_header, is_sensitive_key};

    #[test]
    fn header_matching_ignores_case() {
        assert!(is_sensitive_header("x-auth-token"));
        assert!(is_sensitive_header("X-AUTH-KEY"));
        assert!(!is_sensitive_header("X-Auth-Project-Id"));
    }

    #[test]
    fn key_matching_is_exact_but_ignores_case() {
        assert!(is_sensitive_key("password"));
        assert!(is_sensitive_key("AdminPass"));
        assert!(is_sensitive_key("CHAPPASSWORD"));
        assert!(!is_sensitive_key("passwordCredentials"));
        assert!(!is_sensitive_key("username"));
    }

    #[test]
    fn nested_fields_are_masked_and_siblings_kept() {
        let mut redactor = Redactor::new();
        let body = json!({
            "auth": {
                "tenantName": "fakeService",
                "passwordCredentials": {"username": "fakeUser", "password": "fakePassword"}
            }
        });

        let masked = redactor.json(&body);

        assert_eq!(
            masked,
            json!({
                "auth": {
                    "tenantName": "fakeService",
                    "passwordCredentials": {"username": "fakeUser", "password": REDACTED}
                }
            })
        );
    }

    #[test]
    fn masking_inside_arrays() {
        let mut redactor = Redactor::new();
        let masked = redactor.json(&json!([{"password": "p1"}, {"name": "n"}]));
        assert_eq!(masked, json!([{"password": REDACTED}, {"name": "n"}]));
    }

    #[test]
    fn scrub_removes_collected_secrets_everywhere() {
        let mut redactor = Redactor::new();
        let _ = redactor.json(&json!({"token": {"id": "tok-123", "expires": "never"}}));
        let _ = redactor.header_value("X-Auth-Token", "MY_SECRET_AUTH_TOKEN");

        let line = "GET http://host/?t=tok-123 MY_SECRET_AUTH_TOKEN never";
        assert_eq!(redactor.scrub(line), format!("GET http://host/?t={REDACTED} {REDACTED} {REDACTED}"));
    }

    #[test]
    fn escaped_secret_is_scrubbed_from_serialized_body() {
        let mut redactor = Redactor::new();
        let body = json!({"password": "p\u{e9}\"q\\z", "note": "p\u{e9}\"q\\z", "username": "fakeUser"});

        let masked = redactor.json(&body).to_string();
        let line = redactor.scrub(&masked);

        assert!(!line.contains("p\u{e9}\\\"q"));
        assert!(line.contains(&format!("\"note\":\"{REDACTED}\"")));
        assert!(line.contains("fakeUser"));
    }

    #[test]
    fn short_and_numeric_values_are_not_scrubbed_elsewhere() {
        let mut redactor = Redactor::new();
        let masked = redactor.json(&json!({"token": 1, "secret": "abc", "username": "fakeUser1"}));

        assert_eq!(masked["token"], REDACTED);
        assert_eq!(masked["secret"], REDACTED);
        assert_eq!(
            redactor.scrub("http://127.0.0.1:5000 fakeUser1 abcd"),
            "http://127.0.0.1:5000 fakeUser1 abcd"
        );
    }

    #[test]
    fn input_value_is_untouched() {
        let mut redactor = Redactor::new();
        let body = json!({"password": "hunter2"});
        let _ = redactor.json(&body);
        assert_eq!(body["password"], "hunter2");
    }
}
