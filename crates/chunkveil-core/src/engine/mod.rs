//! Obfuscation engine abstraction.
//!
//! The engine is a black box: it takes a chunk of code plus the options and
//! hands back obfuscated code and, when asked for, a source map.
//!
//! ## Extensibility
//!
//! Any `Fn(&str, &ObfuscatorOptions) -> Result<ObfuscationResult>` closure is
//! an engine, which keeps stubs short:
//!
//! ```
//! use chunkveil_core::{ObfuscationEngine, ObfuscationResult, ObfuscatorOptions};
//!
//! let engine = |code: &str, _options: &ObfuscatorOptions| -> chunkveil_core::Result<_> {
//!     Ok(ObfuscationResult::new(format!("/*veiled*/{code}")))
//! };
//! let result = engine.obfuscate("let a = 1;", &ObfuscatorOptions::default())?;
//! assert_eq!(result.obfuscated_code(), "/*veiled*/let a = 1;");
//! # Ok::<(), chunkveil_core::Error>(())
//! ```

mod command;

use crate::error::Result;
use crate::options::ObfuscatorOptions;

pub use command::{CommandEngine, DEFAULT_ENGINE_PROGRAM};

#[cfg(test)]
pub(crate) use command::fake;

/// Output of a single engine run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObfuscationResult {
    code: String,
    source_map: Option<String>,
}

impl ObfuscationResult {
    /// Creates a result without a source map
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            source_map: None,
        }
    }

    /// Attaches a source map
    pub fn with_source_map(mut self, map: impl Into<String>) -> Self {
        self.source_map = Some(map.into());
        self
    }

    /// The obfuscated code
    pub fn obfuscated_code(&self) -> &str {
        &self.code
    }

    /// The source map, if the engine produced one
    pub fn source_map(&self) -> Option<&str> {
        self.source_map.as_deref()
    }

    /// Splits the result into code and map
    pub fn into_parts(self) -> (String, Option<String>) {
        (self.code, self.source_map)
    }
}

/// Trait for the external obfuscation engine
///
/// Implementations must not retain per-call state: the plugin may call
/// `obfuscate` concurrently from several threads.
pub trait ObfuscationEngine: Send + Sync {
    /// Obfuscate one chunk of code
    fn obfuscate(&self, code: &str, options: &ObfuscatorOptions) -> Result<ObfuscationResult>;

    /// Short name used in log output
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> ObfuscationEngine for F
where
    F: Fn(&str, &ObfuscatorOptions) -> Result<ObfuscationResult> + Send + Sync,
{
    fn obfuscate(&self, code: &str, options: &ObfuscatorOptions) -> Result<ObfuscationResult> {
        self(code, options)
    }
}
