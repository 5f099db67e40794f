use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribute value
///
/// Untagged so that configuration files can write `value = "x"` or `value = 3`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::String(v) => f.write_str(v),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for AttributeValue {
    fn from(value: u64) -> Self {
        Self::Int(value.min(i64::MAX as u64) as i64)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

/// Key-value attribute attached to telemetry items and resources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: AttributeValue,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// The entity producing telemetry (service, instrumentation scope)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub attributes: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_url: Option<String>,
}

impl Resource {
    /// Look up an attribute value by key
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|attr| attr.key == key)
            .map(|attr| &attr.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_value_deserializes_untagged() {
        let attrs: Vec<Attribute> = serde_json::from_str(
            r#"[
                {"key":"a","value":"x"},
                {"key":"b","value":3},
                {"key":"c","value":true},
                {"key":"d","value":1.5}
            ]"#,
        )
        .unwrap();

        assert_eq!(attrs[0].value, AttributeValue::String("x".to_string()));
        assert_eq!(attrs[1].value, AttributeValue::Int(3));
        assert_eq!(attrs[2].value, AttributeValue::Bool(true));
        assert_eq!(attrs[3].value, AttributeValue::Double(1.5));
    }

    #[test]
    fn test_resource_lookup() {
        let resource = Resource {
            attributes: vec![Attribute::new("service.name", "checkout")],
            schema_url: None,
        };
        assert_eq!(
            resource.get("service.name").map(|v| v.to_string()),
            Some("checkout".to_string())
        );
        assert!(resource.get("missing").is_none());
    }
}
