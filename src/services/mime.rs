use crate::models::ObjectKey;
use std::collections::HashMap;

/// Content-type lookup by extension.
///
/// Explicit registrations take precedence over the `mime_guess` table, so
/// types a platform registry lacks can be pinned at startup.
#[derive(Debug, Clone, Default)]
pub struct MimeRegistry {
    overrides: HashMap<String, String>,
}

impl MimeRegistry {
    /// Registry with no explicit registrations
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the registrations the CDN relies on
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register("webp", "image/webp");
        registry
    }

    pub fn register(&mut self, extension: &str, content_type: &str) {
        self.overrides.insert(
            extension.trim_start_matches('.').to_ascii_lowercase(),
            content_type.to_string(),
        );
    }

    pub fn lookup(&self, extension: &str) -> Option<String> {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        if extension.is_empty() {
            return None;
        }

        self.overrides.get(&extension).cloned().or_else(|| {
            mime_guess::from_ext(&extension)
                .first_raw()
                .map(str::to_string)
        })
    }

    /// Content type to advertise for an object, `application/octet-stream` if unknown.
    pub fn content_type_for(&self, key: &ObjectKey) -> String {
        key.extension()
            .and_then(|ext| self.lookup(ext))
            .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string())
    }
}
