use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::pipeline::extraction::DocumentType;

/// Key of one document in the combined document: `<type>_<sanitized name>`.
///
/// Distinct names that sanitize to the same string map to the same key, so
/// the later scan overwrites the earlier one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentKey(String);

impl DocumentKey {
    /// Derive from a document type and a file name or path. Only the final
    /// path component is used.
    pub fn derive(doc_type: DocumentType, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let base = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        Self(format!("{}_{}", doc_type.as_str(), sanitize(&base)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DocumentKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Replace every character that is not an ASCII letter or digit with `_`.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
