use serde::{Deserialize, Serialize};

/// Descriptor of the backend a query is sent to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataSource {
    /// Identity used to group queries into batches
    pub id: i64,
    pub name: String,
    /// Data-source type, used to resolve an executor
    #[serde(rename = "type")]
    pub plugin_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl DataSource {
    pub fn new(id: i64, name: impl Into<String>, plugin_id: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            plugin_id: plugin_id.into(),
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}
