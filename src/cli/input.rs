//! JSON arguments to BSON
//!
//! Arguments are MongoDB extended JSON, so `{"_id": {"$oid": "..."}}` and
//! `{"at": {"$date": "2024-01-01T00:00:00Z"}}` arrive as their BSON types.

use mongodb::bson::{Bson, Document};

use crate::error::{MongolinkError, Result};
use crate::executor::IndexHint;

fn parse_bson(what: &str, text: &str) -> Result<Bson> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| MongolinkError::InvalidInput(format!("{what} is not valid JSON: {e}")))?;

    Bson::try_from(value)
        .map_err(|e| MongolinkError::InvalidInput(format!("{what} is not valid extended JSON: {e}")))
}

/// Parse one JSON object
pub fn parse_document(what: &str, text: &str) -> Result<Document> {
    match parse_bson(what, text)? {
        Bson::Document(doc) => Ok(doc),
        other => Err(MongolinkError::InvalidInput(format!(
            "{what} must be a JSON object, got {:?}",
            other.element_type()
        ))),
    }
}

/// Parse a JSON array of objects
pub fn parse_document_array(what: &str, text: &str) -> Result<Vec<Document>> {
    match parse_bson(what, text)? {
        Bson::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Bson::Document(doc) => Ok(doc),
                _ => Err(MongolinkError::InvalidInput(format!(
                    "{what}[{i}] must be a JSON object"
                ))),
            })
            .collect(),
        _ => Err(MongolinkError::InvalidInput(format!(
            "{what} must be a JSON array"
        ))),
    }
}

/// Documents to insert: a single object or an array of objects
pub enum InsertBatch {
    One(Document),
    Many(Vec<Document>),
}

pub fn parse_insert(text: &str) -> Result<InsertBatch> {
    if text.trim_start().starts_with('[') {
        parse_document_array("documents", text).map(InsertBatch::Many)
    } else {
        parse_document("document", text).map(InsertBatch::One)
    }
}

/// A key pattern when the text looks like JSON, an index name otherwise
pub fn parse_hint(text: &str) -> Result<IndexHint> {
    if text.trim_start().starts_with('{') {
        parse_document("hint", text).map(IndexHint::Keys)
    } else {
        Ok(IndexHint::Name(text.trim().to_string()))
    }
}
