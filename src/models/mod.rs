use crate::utils::validation::{KeyError, validate_object_key};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// Outcome of processing one uploaded file. Exactly one of `url` and `error` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl UploadResult {
    pub fn stored(file_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            url: Some(url.into()),
            error: None,
        }
    }

    pub fn failed(file_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            url: None,
            error: Some(error.into()),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_success(&self) -> bool {
        self.url.is_some()
    }
}

/// Key of a stored object: a random token plus an optional extension.
///
/// Keys live in a flat namespace, so a valid key never contains a path
/// separator, never starts with a dot and is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Fresh key from a v4 UUID. `extension` is either empty or starts with a dot.
    pub fn generate(extension: &str) -> Self {
        Self(format!("{}{}", Uuid::new_v4(), extension))
    }

    /// Parse a key received from a client.
    pub fn parse(raw: &str) -> Result<Self, KeyError> {
        validate_object_key(raw)?;
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extension without the leading dot, if any.
    pub fn extension(&self) -> Option<&str> {
        self.0
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
