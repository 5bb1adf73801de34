//! Engine recipes.
//!
//! A recipe is the JSON document that tells the correlation engine how to
//! bin raw time tags. Its contents belong to the engine; this crate only
//! loads it and passes it through together with [`RecipeParams`].
//!
//! [`RecipeParams`]: photonrig_core::RecipeParams

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::{Error, Result};

/// A loaded engine recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    source: Option<PathBuf>,
    document: Value,
}

impl Recipe {
    /// Load a recipe from a JSON file.
    ///
    /// # Errors
    /// Returns [`Error::Recipe`] if the file is missing or is not a JSON object.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Recipe(format!("{}: {e}", path.display())))?;
        let document: Value = serde_json::from_str(&text)
            .map_err(|e| Error::Recipe(format!("{}: {e}", path.display())))?;
        let mut recipe = Self::from_value(document)?;
        recipe.source = Some(path.to_path_buf());
        Ok(recipe)
    }

    /// Wrap an in-memory recipe document.
    ///
    /// # Errors
    /// Returns [`Error::Recipe`] if `document` is not a JSON object.
    pub fn from_value(document: Value) -> Result<Self> {
        if !document.is_object() {
            return Err(Error::Recipe("recipe must be a JSON object".to_string()));
        }
        Ok(Self {
            source: None,
            document,
        })
    }

    /// File the recipe was loaded from, if any.
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// The raw recipe document.
    #[must_use]
    pub fn document(&self) -> &Value {
        &self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"version": 3, "groups": ["main"]}}"#).unwrap();
        let recipe = Recipe::from_file(file.path()).unwrap();
        assert_eq!(recipe.source(), Some(file.path()));
        assert_eq!(recipe.document()["version"], 3);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Recipe::from_file("/nonexistent/recipe.eta"),
            Err(Error::Recipe(_))
        ));
    }

    #[test]
    fn test_rejects_non_object() {
        assert!(matches!(
            Recipe::from_value(json!([1, 2, 3])),
            Err(Error::Recipe(_))
        ));
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(Recipe::from_file(file.path()), Err(Error::Recipe(_))));
    }
}
