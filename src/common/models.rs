use serde_json::Value;

pub const NAMESPACE: &str = "http://vmware.com/labmanager";

/// Per-request authentication context, sent as a SOAP header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticationHeader<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub organization: &'a str,
    pub workspace: Option<&'a str>,
}

/// Sends a named remote operation and returns the nested response tree.
///
/// `params` are sent in order. An empty response is `Value::Null`.
pub trait Transport {
    fn call(
        &self,
        auth: &AuthenticationHeader<'_>,
        operation: &str,
        params: &[(&str, String)],
    ) -> super::Result<Value>;
}

/// Collapses the single-record vs. sequence ambiguity of XML derived trees.
pub(crate) fn one_or_many(value: Option<&Value>) -> Vec<&Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(record) => vec![record],
    }
}

/// Reads a scalar field as a string. Numbers and booleans are stringified.
pub(crate) fn scalar(record: &Value, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn one_or_many_shapes() {
        assert!(one_or_many(None).is_empty());
        assert!(one_or_many(Some(&Value::Null)).is_empty());
        assert!(one_or_many(Some(&json!([]))).is_empty());

        let single = json!({"name": "a"});
        assert_eq!(one_or_many(Some(&single)), vec![&single]);

        let many = json!([{"name": "a"}, {"name": "b"}]);
        let items = one_or_many(Some(&many));
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["name"], "b");
    }

    #[test]
    fn scalar_stringifies_numbers() {
        let record = json!({"id": 1150, "name": "web", "nested": {}});
        assert_eq!(scalar(&record, "id").as_deref(), Some("1150"));
        assert_eq!(scalar(&record, "name").as_deref(), Some("web"));
        assert_eq!(scalar(&record, "nested"), None);
        assert_eq!(scalar(&record, "missing"), None);
        assert_eq!(scalar(&Value::Null, "id"), None);
    }
}
