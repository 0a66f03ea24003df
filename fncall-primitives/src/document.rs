//! Schema documents: the persisted `functions.json` build artifact.

use serde::{Deserialize, Serialize};

use crate::declaration::Declaration;
use crate::error::{Error, Result};

/// Ordered set of declarations keyed by name.
///
/// Serialized as a JSON array so the file can be handed to an LLM provider
/// unchanged. Insertion order is preserved and is the listing order of the
/// sources that produced the document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaDocument {
    declarations: Vec<Declaration>,
}

impl SchemaDocument {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a declaration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateDeclaration`] if the name is already present.
    pub fn insert(&mut self, declaration: Declaration) -> Result<()> {
        if self.get(declaration.name()).is_some() {
            return Err(Error::DuplicateDeclaration {
                name: declaration.name().to_owned(),
            });
        }
        self.declarations.push(declaration);
        Ok(())
    }

    /// Looks up a declaration by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.name() == name)
    }

    /// Iterates over declarations in document order.
    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter()
    }

    /// Returns the number of declarations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Returns `true` when the document holds no declarations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Encodes the document as pretty-printed JSON terminated by a newline.
    ///
    /// # Errors
    ///
    /// Propagates serialization failures from `serde_json`.
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut encoded = serde_json::to_string_pretty(self)?;
        encoded.push('\n');
        Ok(encoded)
    }

    /// Decodes a document, rejecting duplicate names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] or [`Error::InvalidDocument`] when the input is
    /// not a valid array of declarations, and [`Error::DuplicateDeclaration`]
    /// when two entries share a name.
    pub fn from_json_str(input: &str) -> Result<Self> {
        let declarations: Vec<Declaration> = serde_json::from_str(input)?;
        let mut document = Self::new();
        for declaration in declarations {
            document.insert(declaration)?;
        }
        Ok(document)
    }
}

impl<'a> IntoIterator for &'a SchemaDocument {
    type Item = &'a Declaration;
    type IntoIter = std::slice::Iter<'a, Declaration>;

    fn into_iter(self) -> Self::IntoIter {
        self.declarations.iter()
    }
}
