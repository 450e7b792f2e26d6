//! List documents and their encrypted form.
//!
//! A list is `{ name, ideas }`. Only those two fields ever cross the codec:
//! writes project the document down to them, and reads narrow whatever was
//! decrypted back to them, rejecting payloads that do not fit the schema.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crypto::{decrypt_json, encrypt_json, KeyMaterial};
use crate::error::{Result, VaultError};
use crate::fs::write_atomic;

/// Extension of encrypted list files (without the dot).
pub const LIST_FILE_EXTENSION: &str = "list";

/// A single idea in a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Idea(String);

impl Idea {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn text(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Idea {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Idea {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl std::fmt::Display for Idea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named, ordered list of ideas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListDocument {
    pub name: String,
    pub ideas: Vec<Idea>,
}

impl ListDocument {
    /// Create an empty list.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ideas: Vec::new(),
        }
    }

    /// Builder-style: set the ideas.
    pub fn with_ideas<I, T>(mut self, ideas: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Idea>,
    {
        self.ideas = ideas.into_iter().map(Into::into).collect();
        self
    }

    /// Append an idea to the end of the list.
    pub fn push(&mut self, idea: impl Into<Idea>) {
        self.ideas.push(idea.into());
    }

    /// Remove the idea at `index`, if present.
    pub fn remove(&mut self, index: usize) -> Option<Idea> {
        if index < self.ideas.len() {
            Some(self.ideas.remove(index))
        } else {
            None
        }
    }

    /// Rename the list.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn len(&self) -> usize {
        self.ideas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ideas.is_empty()
    }
}

/// Outgoing wire shape: borrowed projection of a list.
#[derive(Serialize)]
struct ListWire<'a> {
    name: &'a str,
    ideas: &'a [Idea],
}

/// Incoming wire shape; fields other than these are dropped.
#[derive(Deserialize)]
struct ListWireOwned {
    name: String,
    ideas: Vec<Idea>,
}

/// Encrypt a list, carrying only its name and ideas.
pub fn encrypt_list(material: &KeyMaterial, doc: &ListDocument) -> Result<Vec<u8>> {
    let wire = ListWire {
        name: &doc.name,
        ideas: &doc.ideas,
    };
    encrypt_json(material, &wire)
}

/// Decrypt a list, narrowing the payload to its name and ideas.
///
/// # Errors
///
/// - `VaultError::Authentication` if the blob does not authenticate
/// - `VaultError::Format` if the payload is not a list
pub fn decrypt_list(material: &KeyMaterial, blob: &[u8]) -> Result<ListDocument> {
    let wire: ListWireOwned = decrypt_json(material, blob)?;
    Ok(ListDocument {
        name: wire.name,
        ideas: wire.ideas,
    })
}

/// File name for a list, e.g. `cs-strats.list`.
pub fn list_file_name(name: &str) -> String {
    let slug: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let slug = slug
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    let slug = if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    };
    format!("{}.{}", slug, LIST_FILE_EXTENSION)
}

/// Encrypt a list and write it atomically to `path`.
pub fn write_list_file(path: &Path, material: &KeyMaterial, doc: &ListDocument) -> Result<()> {
    let blob = encrypt_list(material, doc)?;
    write_atomic(path, &blob, false)?;
    tracing::debug!(path = %path.display(), ideas = doc.len(), "wrote list file");
    Ok(())
}

/// Read and decrypt the list stored at `path`.
pub fn read_list_file(path: &Path, material: &KeyMaterial) -> Result<ListDocument> {
    let blob = fs::read(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => {
            VaultError::NotFound(format!("List file {}", path.display()))
        }
        _ => VaultError::from(err),
    })?;
    decrypt_list(material, &blob)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::encrypt_json;
    use serde_json::json;
    use tempfile::tempdir;

    fn cs_strats() -> ListDocument {
        ListDocument::new("CS Strats").with_ideas(["smoke A", "flash B"])
    }

    #[test]
    fn test_list_round_trip() {
        let material = KeyMaterial::generate().unwrap();
        let doc = cs_strats();

        let blob = encrypt_list(&material, &doc).unwrap();
        let decrypted = decrypt_list(&material, &blob).unwrap();
        assert_eq!(decrypted, doc);
    }

    #[test]
    fn test_corrupted_list_fails_authentication() {
        let material = KeyMaterial::generate().unwrap();
        let mut blob = encrypt_list(&material, &cs_strats()).unwrap();

        let len = blob.len();
        blob[len / 2] ^= 0xFF;

        let result = decrypt_list(&material, &blob);
        assert!(matches!(result, Err(VaultError::Authentication)));
    }

    #[test]
    fn test_decrypt_narrows_extra_fields() {
        let material = KeyMaterial::generate().unwrap();
        let payload = json!({ "name": "CS Strats", "ideas": ["smoke A"], "extra": 1 });
        let blob = encrypt_json(&material, &payload).unwrap();

        let doc = decrypt_list(&material, &blob).unwrap();
        let value = serde_json::to_value(&doc).unwrap();
        let object = value.as_object().unwrap();

        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["ideas", "name"]);
        assert_eq!(doc.ideas, vec![Idea::from("smoke A")]);
    }

    #[test]
    fn test_encrypt_carries_only_name_and_ideas() {
        let material = KeyMaterial::generate().unwrap();
        let blob = encrypt_list(&material, &cs_strats()).unwrap();

        let raw: serde_json::Value = crate::crypto::decrypt_json(&material, &blob).unwrap();
        assert_eq!(raw, json!({ "name": "CS Strats", "ideas": ["smoke A", "flash B"] }));
    }

    #[test]
    fn test_missing_ideas_is_format_error() {
        let material = KeyMaterial::generate().unwrap();
        let blob = encrypt_json(&material, &json!({ "name": "no ideas" })).unwrap();

        let result = decrypt_list(&material, &blob);
        assert!(matches!(result, Err(VaultError::Format(_))));
    }

    #[test]
    fn test_wrongly_typed_ideas_is_format_error() {
        let material = KeyMaterial::generate().unwrap();
        let blob = encrypt_json(&material, &json!({ "name": "n", "ideas": [1, 2] })).unwrap();

        let result = decrypt_list(&material, &blob);
        assert!(matches!(result, Err(VaultError::Format(_))));
    }

    #[test]
    fn test_push_remove_rename() {
        let mut doc = ListDocument::new("Groceries");
        assert!(doc.is_empty());

        doc.push("milk");
        doc.push(String::from("eggs"));
        assert_eq!(doc.len(), 2);

        assert_eq!(doc.remove(0), Some(Idea::from("milk")));
        assert_eq!(doc.remove(5), None);
        assert_eq!(doc.ideas, vec![Idea::from("eggs")]);

        doc.rename("Shopping");
        assert_eq!(doc.name, "Shopping");
    }

    #[test]
    fn test_list_file_name_slug() {
        assert_eq!(list_file_name("CS Strats"), "cs-strats.list");
        assert_eq!(list_file_name("  weird // name!! "), "weird-name.list");
        assert_eq!(list_file_name("***"), "untitled.list");
    }

    #[test]
    fn test_write_then_read_list_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lists").join("cs-strats.list");
        let material = KeyMaterial::generate().unwrap();

        write_list_file(&path, &material, &cs_strats()).unwrap();
        assert!(path.exists());

        let doc = read_list_file(&path, &material).unwrap();
        assert_eq!(doc, cs_strats());
    }

    #[test]
    fn test_read_missing_list_file_is_not_found() {
        let dir = tempdir().unwrap();
        let material = KeyMaterial::generate().unwrap();

        let result = read_list_file(&dir.path().join("missing.list"), &material);
        assert!(matches!(result, Err(VaultError::NotFound(_))));
    }
}
