use mongodb::bson::{Bson, Document};
use serde::{Deserialize, Serialize};

/// Structured error information extracted from MongoDB errors.
///
/// Attached to every [`OperationError`](super::OperationError) so callers can
/// branch on the server code or ship the error to a log pipeline as JSON.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

/// Additional error details extracted from MongoDB error details document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<Document>,
}

impl ErrorInfo {
    /// Convert error info to compact JSON string (single line).
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// True when the server rejected a write because of a unique index.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self.code, Some(11000) | Some(11001))
    }
}

/// Extract structured information from a MongoDB error using the driver API.
pub fn extract_error_info(error: &mongodb::error::Error) -> ErrorInfo {
    use mongodb::error::{ErrorKind, WriteFailure};

    let mut info = ErrorInfo::default();

    match error.kind.as_ref() {
        ErrorKind::Write(write_failure) => {
            info.error_type = Some("mongo.write_error".to_string());

            match write_failure {
                WriteFailure::WriteError(write_error) => {
                    info.code = Some(write_error.code);
                    info.message = Some(write_error.message.clone());
                    info.name = error_name(write_error.code);
                    info.details = Some(details_from(&write_error.details, &write_error.message));
                }
                WriteFailure::WriteConcernError(wc_error) => {
                    info.code = Some(wc_error.code);
                    info.message = Some(wc_error.message.clone());
                    info.name = error_name(wc_error.code);
                }
                _ => {}
            }
        }
        ErrorKind::Command(command_error) => {
            info.error_type = Some("mongo.command_error".to_string());
            info.code = Some(command_error.code);
            info.message = Some(command_error.message.clone());
            info.name = error_name(command_error.code);
        }
        ErrorKind::InsertMany(insert_error) => {
            info.error_type = Some("mongo.insert_many_error".to_string());

            if let Some(first_error) = insert_error
                .write_errors
                .as_ref()
                .and_then(|errors| errors.first())
            {
                info.code = Some(first_error.code);
                info.message = Some(first_error.message.clone());
                info.name = error_name(first_error.code);
                info.details = Some(details_from(&first_error.details, &first_error.message));
            } else if let Some(wc_error) = &insert_error.write_concern_error {
                info.code = Some(wc_error.code);
                info.message = Some(wc_error.message.clone());
                info.name = error_name(wc_error.code);
            }
        }
        ErrorKind::Authentication { message, .. } => {
            info.error_type = Some("mongo.authentication_error".to_string());
            info.message = Some(message.clone());
        }
        ErrorKind::InvalidArgument { message, .. } => {
            info.error_type = Some("mongo.invalid_argument".to_string());
            info.message = Some(message.clone());
        }
        ErrorKind::ServerSelection { message, .. } => {
            info.error_type = Some("mongo.server_selection_error".to_string());
            info.message = Some(message.clone());
        }
        _ => {
            info.message = Some(error.to_string());
        }
    }

    info
}

/// Human-readable name for the server codes callers usually branch on.
fn error_name(code: i32) -> Option<String> {
    let name = match code {
        11000 | 11001 => "DuplicateKey",
        13 => "Unauthorized",
        18 => "AuthenticationFailed",
        26 => "NamespaceNotFound",
        50 => "MaxTimeMSExpired",
        112 => "WriteConflict",
        121 => "DocumentValidationFailure",
        _ => return None,
    };

    Some(name.to_string())
}

/// Pull namespace, index and key out of a write error.
///
/// The details document is preferred; the message is only scanned for the
/// fields the document did not carry.
fn details_from(error_details: &Option<Document>, message: &str) -> ErrorDetails {
    let mut details = ErrorDetails::default();

    if let Some(doc) = error_details {
        details.collection = string_field(doc, &["namespace", "ns"]);
        details.index = string_field(doc, &["index", "indexName"]);
        details.key = ["keyPattern", "keyValue"]
            .iter()
            .find_map(|field| match doc.get(*field) {
                Some(Bson::Document(key)) => Some(key.clone()),
                _ => None,
            });
    }

    if details.collection.is_none() {
        details.collection = word_after(message, "collection: ");
    }
    if details.index.is_none() {
        details.index = word_after(message, "index: ");
    }

    details
}

fn string_field(doc: &Document, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| match doc.get(*field) {
        Some(Bson::String(value)) => Some(value.clone()),
        _ => None,
    })
}

fn word_after(message: &str, marker: &str) -> Option<String> {
    let start = message.find(marker)? + marker.len();
    let rest = &message[start..];
    let end = rest.find(' ')?;
    Some(rest[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn test_error_name_lookup() {
        assert_eq!(error_name(11000).as_deref(), Some("DuplicateKey"));
        assert_eq!(error_name(112).as_deref(), Some("WriteConflict"));
        assert_eq!(error_name(9999), None);
    }

    #[test]
    fn test_details_prefer_document() {
        let details = details_from(
            &Some(doc! {
                "ns": "app.users",
                "indexName": "email_1",
                "keyValue": { "email": "a@b.c" },
            }),
            "E11000 duplicate key error collection: other.coll index: other_1 dup key",
        );
        assert_eq!(details.collection.as_deref(), Some("app.users"));
        assert_eq!(details.index.as_deref(), Some("email_1"));
        assert_eq!(details.key, Some(doc! { "email": "a@b.c" }));
    }

    #[test]
    fn test_details_fall_back_to_message() {
        let details = details_from(
            &None,
            "E11000 duplicate key error collection: app.users index: email_1 dup key",
        );
        assert_eq!(details.collection.as_deref(), Some("app.users"));
        assert_eq!(details.index.as_deref(), Some("email_1"));
        assert!(details.key.is_none());
    }

    #[test]
    fn test_duplicate_key_flag() {
        let info = ErrorInfo {
            code: Some(11000),
            ..Default::default()
        };
        assert!(info.is_duplicate_key());
        assert!(!ErrorInfo::default().is_duplicate_key());
    }
}
