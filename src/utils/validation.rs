use thiserror::Error;

/// Longest extension carried over from a client filename, dot excluded
pub const MAX_EXTENSION_LEN: usize = 16;

/// Longest object key accepted on the read path
pub const MAX_KEY_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("Invalid file ID")]
    Empty,

    #[error("Invalid file ID: too long")]
    TooLong,

    #[error("Invalid file ID: contains forbidden characters")]
    ForbiddenCharacters,

    #[error("Invalid file ID: hidden names are not allowed")]
    Hidden,
}

/// Validates a key in the flat storage namespace.
pub fn validate_object_key(key: &str) -> Result<(), KeyError> {
    if key.is_empty() {
        return Err(KeyError::Empty);
    }

    if key.len() > MAX_KEY_LEN {
        return Err(KeyError::TooLong);
    }

    if key.contains("..")
        || key
            .chars()
            .any(|c| c == '/' || c == '\\' || c == ':' || c.is_control())
    {
        tracing::warn!("Path traversal attempt detected: {:?}", key);
        return Err(KeyError::ForbiddenCharacters);
    }

    // Partial writes live under dot-prefixed names
    if key.starts_with('.') {
        return Err(KeyError::Hidden);
    }

    Ok(())
}

/// Extension of a client filename including the leading dot, or an empty
/// string when there is none or it is not safe to put into a key.
pub fn original_extension(filename: &str) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or("");

    match name.rfind('.') {
        Some(idx) => {
            let ext = &name[idx + 1..];
            if !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
            {
                format!(".{}", ext)
            } else {
                String::new()
            }
        }
        None => String::new(),
    }
}
