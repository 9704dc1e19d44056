use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Application data carried by a block.
///
/// The ledger never looks inside a payload; it only needs a canonical byte
/// form for hashing. Objects are emitted with their keys sorted at every
/// depth, so two nodes holding the same logical value hash the same bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Value);

impl Payload {
    pub fn new(value: Value) -> Payload {
        Payload(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Compact JSON with sorted object keys
    pub fn canonical_json(&self) -> String {
        canonicalize(&self.0).to_string()
    }
}

impl Default for Payload {
    fn default() -> Self {
        Payload(Value::Null)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload(value)
    }
}

impl PartialEq<Value> for Payload {
    fn eq(&self, other: &Value) -> bool {
        &self.0 == other
    }
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key.as_str()]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_json_sorts_nested_keys() {
        let payload = Payload::from(json!({"b": [1, {"z": 1, "y": 2}], "a": "x"}));
        assert_eq!(
            payload.canonical_json(),
            r#"{"a":"x","b":[1,{"y":2,"z":1}]}"#
        );
    }

    #[test]
    fn test_payload_is_transparent_on_the_wire() {
        let payload = Payload::from(json!({"msg": "a"}));
        assert_eq!(serde_json::to_string(&payload).unwrap(), r#"{"msg":"a"}"#);
        assert_eq!(payload, json!({"msg": "a"}));
    }
}
