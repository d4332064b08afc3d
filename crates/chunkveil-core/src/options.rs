//! Obfuscator options.
//!
//! Options are an opaque JSON object handed to the engine as-is. Only two
//! fields are read by the plugin itself: `sourceMap` and `sourceMapMode`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

/// Key requesting source map generation
pub const SOURCE_MAP_KEY: &str = "sourceMap";

/// Key selecting how the source map is emitted
pub const SOURCE_MAP_MODE_KEY: &str = "sourceMapMode";

/// How the engine emits a requested source map
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceMapMode {
    /// Map embedded in the obfuscated code
    Inline,
    /// Map returned next to the code
    Separate,
    /// Any other engine-defined mode
    Other(String),
}

impl SourceMapMode {
    /// Returns the engine's name for this mode
    pub fn as_str(&self) -> &str {
        match self {
            Self::Inline => "inline",
            Self::Separate => "separate",
            Self::Other(mode) => mode,
        }
    }
}

impl From<&str> for SourceMapMode {
    fn from(mode: &str) -> Self {
        match mode {
            "inline" => Self::Inline,
            "separate" => Self::Separate,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for SourceMapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options forwarded verbatim to the obfuscation engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObfuscatorOptions {
    values: Map<String, Value>,
}

impl ObfuscatorOptions {
    /// Creates an empty option set
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses options from a JSON object string
    pub fn from_json_str(json: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(json)? {
            Value::Object(values) => Ok(Self { values }),
            other => Err(Error::invalid_options(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Reads options from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        Self::from_json_str(&json)
    }

    /// Sets an option, replacing any previous value
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Requests a source map emitted in the given mode
    pub fn with_source_map(self, mode: SourceMapMode) -> Self {
        let mode = mode.as_str().to_string();
        self.set(SOURCE_MAP_KEY, true)
            .set(SOURCE_MAP_MODE_KEY, mode)
    }

    /// Returns the raw value of an option
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Number of options set
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no options are set
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether a source map was requested. Only a JSON `true` counts.
    pub fn source_map(&self) -> bool {
        matches!(self.values.get(SOURCE_MAP_KEY), Some(Value::Bool(true)))
    }

    /// The requested source map mode, if set to a string
    pub fn source_map_mode(&self) -> Option<SourceMapMode> {
        self.values
            .get(SOURCE_MAP_MODE_KEY)
            .and_then(Value::as_str)
            .map(SourceMapMode::from)
    }

    /// Whether the plugin should hand a separate map back to the host.
    ///
    /// True only when a map was requested and the mode is not inline. An
    /// unset mode is not inline.
    pub fn wants_separate_map(&self) -> bool {
        self.source_map() && self.source_map_mode() != Some(SourceMapMode::Inline)
    }

    /// Serializes the options as the engine's JSON config
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.values)?)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_default_is_empty() {
        let options = ObfuscatorOptions::default();
        assert!(options.is_empty());
        assert!(!options.source_map());
        assert_eq!(options.source_map_mode(), None);
        assert!(!options.wants_separate_map());
    }

    #[test]
    fn test_separate_map_rule() {
        let separate = ObfuscatorOptions::new().with_source_map(SourceMapMode::Separate);
        assert!(separate.wants_separate_map());

        let inline = ObfuscatorOptions::new().with_source_map(SourceMapMode::Inline);
        assert!(!inline.wants_separate_map());

        let disabled = ObfuscatorOptions::new()
            .set(SOURCE_MAP_KEY, false)
            .set(SOURCE_MAP_MODE_KEY, "separate");
        assert!(!disabled.wants_separate_map());

        let no_mode = ObfuscatorOptions::new().set(SOURCE_MAP_KEY, true);
        assert!(no_mode.wants_separate_map());

        let custom = ObfuscatorOptions::new()
            .with_source_map(SourceMapMode::Other("external".to_string()));
        assert!(custom.wants_separate_map());
    }

    #[test]
    fn test_source_map_must_be_boolean() {
        let options = ObfuscatorOptions::new().set(SOURCE_MAP_KEY, "true");
        assert!(!options.source_map());
    }

    #[test]
    fn test_source_map_mode_parse() {
        assert_eq!(SourceMapMode::from("inline"), SourceMapMode::Inline);
        assert_eq!(SourceMapMode::from("separate"), SourceMapMode::Separate);
        assert_eq!(
            SourceMapMode::from("external"),
            SourceMapMode::Other("external".to_string())
        );
        assert_eq!(SourceMapMode::Separate.to_string(), "separate");
    }

    #[test]
    fn test_from_json_str_preserves_unknown_fields() {
        let options = ObfuscatorOptions::from_json_str(
            r#"{"compact": true, "controlFlowFlatteningThreshold": 0.75, "stringArray": true}"#,
        )
        .unwrap();

        assert_eq!(options.len(), 3);
        assert_eq!(options.get("compact"), Some(&json!(true)));
        assert_eq!(
            options.get("controlFlowFlatteningThreshold"),
            Some(&json!(0.75))
        );
    }

    #[test]
    fn test_from_json_str_rejects_non_object() {
        let err = ObfuscatorOptions::from_json_str("[1, 2]").unwrap_err();
        assert!(matches!(err, Error::InvalidOptions(_)));
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_serializes_transparently() {
        let options = ObfuscatorOptions::new()
            .set("compact", true)
            .with_source_map(SourceMapMode::Separate);
        let value = serde_json::to_value(&options).unwrap();
        assert_eq!(
            value,
            json!({"compact": true, "sourceMap": true, "sourceMapMode": "separate"})
        );
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obfuscator.json");
        std::fs::write(&path, r#"{"deadCodeInjection": true}"#).unwrap();

        let options = ObfuscatorOptions::from_path(&path).unwrap();
        assert_eq!(options.get("deadCodeInjection"), Some(&json!(true)));

        let missing = ObfuscatorOptions::from_path(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(Error::FileRead { .. })));
    }
}
