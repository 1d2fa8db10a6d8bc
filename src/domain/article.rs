use serde::{Deserialize, Serialize};

/// Read-only view of an article as provided by the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArticleSummary {
    /// Unique identifier of the article
    pub id: String,
    /// Display name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Reference to the article image
    pub image: String,
    /// Unit price
    pub price: f64,
    /// Units in stock
    pub stock: i64,
    /// Whether the article may currently be interacted with
    pub enabled: bool,
}

impl ArticleSummary {
    /// Creates an enabled article without description, image or stock
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            image: String::new(),
            price: 0.0,
            stock: 0,
            enabled: true,
        }
    }

    /// Returns a copy with the given enabled flag
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

#[cfg(test)]
mod does {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn serialize_with_camel_case_keys() {
        let article = ArticleSummary::new("X", "Widget");

        assert_eq!(
            serde_json::to_value(&article).unwrap(),
            json!({
                "id": "X",
                "name": "Widget",
                "description": "",
                "image": "",
                "price": 0.0,
                "stock": 0,
                "enabled": true
            })
        );
    }
}
