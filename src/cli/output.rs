//! Result printing as relaxed extended JSON

use mongodb::bson::{Bson, Document};
use serde_json::Value as JsonValue;

/// JSON output formatter
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render(&self, value: &JsonValue) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_else(|_| value.to_string())
    }

    pub fn format_value(&self, value: Bson) -> String {
        self.render(&value.into_relaxed_extjson())
    }

    pub fn format_document(&self, doc: Document) -> String {
        self.format_value(Bson::Document(doc))
    }

    /// Documents as one JSON array
    pub fn format_documents(&self, docs: Vec<Document>) -> String {
        self.format_values(docs.into_iter().map(Bson::Document).collect())
    }

    pub fn format_values(&self, values: Vec<Bson>) -> String {
        self.format_value(Bson::Array(values))
    }
}
