//! Client payload schema.
//!
//! The set of client fields is configuration (`[clients]` in `config.toml`),
//! not code. A [`ClientSchema`] is built once at startup and checks every
//! create/update body before the catalog service sees it.

use configs::{ClientsConfig, FieldKind, UnknownFields};
use serde_json::Value;

use crate::client::Fields;
use crate::errors::{FieldViolation, ModelError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub max_length: Option<usize>,
    pub unique: bool,
}

#[derive(Debug, Clone)]
pub struct ClientSchema {
    rules: Vec<FieldRule>,
    unknown_fields: UnknownFields,
}

impl Default for ClientSchema {
    fn default() -> Self {
        // ClientsConfig::default() always validates
        Self::build(&ClientsConfig::default())
    }
}

impl ClientSchema {
    pub fn from_config(cfg: &ClientsConfig) -> Result<Self, ModelError> {
        cfg.validate().map_err(|e| ModelError::Schema(e.to_string()))?;
        Ok(Self::build(cfg))
    }

    fn build(cfg: &ClientsConfig) -> Self {
        let rules = cfg
            .fields
            .iter()
            .map(|f| FieldRule {
                name: f.name.trim().to_string(),
                kind: f.kind,
                required: f.required,
                max_length: f.max_length,
                unique: f.unique,
            })
            .collect();
        Self { rules, unknown_fields: cfg.unknown_fields }
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    pub fn unique_fields(&self) -> impl Iterator<Item = &FieldRule> {
        self.rules.iter().filter(|r| r.unique)
    }

    /// Drop undeclared keys when the schema ignores them; a no-op otherwise.
    pub fn strip_unknown(&self, fields: &mut Fields) {
        if self.unknown_fields == UnknownFields::Ignore {
            fields.retain(|key, _| self.declares(key));
        }
    }

    fn declares(&self, key: &str) -> bool {
        self.rules.iter().any(|r| r.name == key)
    }

    /// Check a payload; every violation is collected, not just the first.
    pub fn validate(&self, fields: &Fields) -> Result<(), ModelError> {
        let mut violations = Vec::new();

        for rule in &self.rules {
            match fields.get(&rule.name) {
                None | Some(Value::Null) => {
                    if rule.required {
                        violations.push(FieldViolation::new(&rule.name, "must not be blank"));
                    }
                }
                Some(value) => {
                    if let Some(msg) = rule.check(value) {
                        violations.push(FieldViolation::new(&rule.name, msg));
                    }
                }
            }
        }

        if self.unknown_fields == UnknownFields::Reject {
            for key in fields.keys() {
                if !self.declares(key) {
                    violations.push(FieldViolation::new(key, "unknown field"));
                }
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ModelError::Validation(violations))
        }
    }
}

impl FieldRule {
    fn check(&self, value: &Value) -> Option<String> {
        match self.kind {
            FieldKind::String | FieldKind::Email => {
                let Some(s) = value.as_str() else {
                    return Some("must be a string".into());
                };
                if self.required && s.trim().is_empty() {
                    return Some("must not be blank".into());
                }
                if let Some(max) = self.max_length {
                    if s.chars().count() > max {
                        return Some(format!("size must be at most {max}"));
                    }
                }
                if self.kind == FieldKind::Email && !s.is_empty() && !is_email(s) {
                    return Some("must be a well-formed email address".into());
                }
                None
            }
            FieldKind::Integer => (!value.is_i64() && !value.is_u64()).then(|| "must be an integer".into()),
            FieldKind::Boolean => (!value.is_boolean()).then(|| "must be a boolean".into()),
        }
    }
}

fn is_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
