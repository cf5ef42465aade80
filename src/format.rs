use std::fmt;
use std::path::Path;

use crate::error::TreeqError;

/// Document encodings the loader and printer understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "yaml" | "yml" | "y" => Some(Format::Yaml),
            "json" | "j" => Some(Format::Json),
            _ => None,
        }
    }

    /// Pick the format for a file by its extension (`.yaml`, `.yml`, `.json`).
    pub fn from_extension(path: &Path) -> Result<Self, TreeqError> {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return Err(TreeqError::NoExtension);
        };
        match ext.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Format::Yaml),
            "json" => Ok(Format::Json),
            _ => Err(TreeqError::UnknownExtension(ext.to_string())),
        }
    }

    /// Format named on the command line, e.g. `-p json`.
    pub fn from_str_name(s: &str) -> Result<Self, TreeqError> {
        Self::from_name(s).ok_or_else(|| TreeqError::UnsupportedFormat(s.to_string()))
    }

    /// Guess the format of stdin content. Only input that opens with a brace or
    /// bracket and is valid JSON throughout counts as JSON; flow-style YAML such
    /// as `[cat, dog]` falls back to YAML.
    pub fn detect(input: &str) -> Self {
        let trimmed = input.trim_start();
        if !trimmed.starts_with(['{', '[']) {
            return Format::Yaml;
        }
        let valid_json = serde_json::Deserializer::from_str(trimmed)
            .into_iter::<serde_json::Value>()
            .all(|value| value.is_ok());
        if valid_json {
            Format::Json
        } else {
            Format::Yaml
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Yaml => "yaml",
            Format::Json => "json",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_case_insensitive() {
        for (name, expected) in [
            ("pets.yaml", Format::Yaml),
            ("pets.YML", Format::Yaml),
            ("pets.json", Format::Json),
            ("dir/pets.Json", Format::Json),
        ] {
            assert_eq!(Format::from_extension(Path::new(name)).unwrap(), expected, "{name}");
        }
    }

    #[test]
    fn missing_or_foreign_extension() {
        assert!(matches!(
            Format::from_extension(Path::new("Makefile")),
            Err(TreeqError::NoExtension)
        ));
        assert!(matches!(
            Format::from_extension(Path::new("data.toml")),
            Err(TreeqError::UnknownExtension(ref e)) if e == "toml"
        ));
    }

    #[test]
    fn flag_names() {
        assert_eq!(Format::from_str_name("y").unwrap(), Format::Yaml);
        assert_eq!(Format::from_str_name("JSON").unwrap(), Format::Json);
        assert!(matches!(
            Format::from_str_name("xml"),
            Err(TreeqError::UnsupportedFormat(_))
        ));
        assert_eq!(Format::Json.to_string(), "json");
    }

    #[test]
    fn detect_from_content() {
        assert_eq!(Format::detect("  {\"a\": 1}"), Format::Json);
        assert_eq!(Format::detect("[1, 2]\n[3]"), Format::Json);
        assert_eq!(Format::detect("a: 1"), Format::Yaml);
        assert_eq!(Format::detect("[cat, dog]"), Format::Yaml);
        assert_eq!(Format::detect("{a: 1}"), Format::Yaml);
    }
}
