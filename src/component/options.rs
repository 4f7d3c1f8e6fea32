use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameter keys a composite passes down to its children by default.
///
/// Renderer and data-store handles live with the leaf collaborator; the only
/// universally inherited key at this layer is the debug flag.
pub const DEFAULT_HAND_ME_DOWNS: &[&str] = &["debug"];

/// Per-component configuration.
///
/// `id` is assigned by the enclosing composite during preparation; root
/// components keep whatever they were constructed with. `params` holds the
/// free-form presentation parameters (layout, debug flags, stimulus data)
/// that hand-me-downs copy between tree levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Options {
    pub id: Option<String>,
    /// Parameter keys this component hands down to its children.
    pub hand_me_downs: Vec<String>,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            id: None,
            hand_me_downs: DEFAULT_HAND_ME_DOWNS.iter().map(|k| k.to_string()).collect(),
            params: Map::new(),
        }
    }
}

impl Options {
    /// Options carrying an explicit id (typically for a root component).
    pub fn with_id<S: Into<String>>(id: S) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn set_param<V: Into<Value>>(&mut self, key: &str, value: V) -> &mut Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Whether the component has no usable value of its own for `key`.
    ///
    /// Absent entries, JSON null and empty strings count as vacant; an
    /// explicit `false` or `0` is a deliberate choice and blocks
    /// inheritance.
    fn is_vacant(&self, key: &str) -> bool {
        match self.params.get(key) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        }
    }

    /// Copy `key` from the parent's value unless this component already has
    /// its own.
    pub(crate) fn inherit(&mut self, key: &str, parent_value: Option<&Value>) {
        if self.is_vacant(key) {
            if let Some(value) = parent_value {
                self.params.insert(key.to_string(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inherit_fills_vacant_keys() {
        let mut child = Options::default();
        child.inherit("layout", Some(&json!("grid")));
        assert_eq!(child.param("layout"), Some(&json!("grid")));
    }

    #[test]
    fn test_inherit_respects_explicit_values() {
        let mut child = Options::default();
        child.set_param("layout", "rows");
        child.inherit("layout", Some(&json!("grid")));
        assert_eq!(child.param("layout"), Some(&json!("rows")));
    }

    #[test]
    fn test_null_and_empty_string_count_as_vacant() {
        let mut child = Options::default();
        child.set_param("layout", Value::Null);
        child.inherit("layout", Some(&json!("grid")));
        assert_eq!(child.param("layout"), Some(&json!("grid")));

        let mut child = Options::default();
        child.set_param("caption", "");
        child.inherit("caption", Some(&json!("hello")));
        assert_eq!(child.param("caption"), Some(&json!("hello")));
    }

    #[test]
    fn test_false_and_zero_block_inheritance() {
        let mut child = Options::default();
        child.set_param("debug", false);
        child.set_param("volume", 0);
        child.inherit("debug", Some(&json!(true)));
        child.inherit("volume", Some(&json!(11)));
        assert_eq!(child.param("debug"), Some(&json!(false)));
        assert_eq!(child.param("volume"), Some(&json!(0)));
    }

    #[test]
    fn test_inherit_without_parent_value_is_a_no_op() {
        let mut child = Options::default();
        child.inherit("layout", None);
        assert_eq!(child.param("layout"), None);
    }
}
