//! # chunkveil-core
//!
//! A render-chunk plugin that passes bundler output through an external
//! JavaScript obfuscator.
//!
//! The plugin does very little on its own. It:
//! - hands each finished chunk and the configured options to an engine
//! - returns the engine's code, plus its source map when one was requested
//!   in a non-inline mode
//! - turns any engine failure into a single logged diagnostic and an
//!   "unchanged" outcome, so one bad chunk never stops the build
//!
//! ## Architecture
//!
//! - [`options`]: Opaque engine options and the two fields the plugin reads
//! - [`engine`]: The engine trait and the `javascript-obfuscator` process engine
//! - [`plugin`]: The render-chunk hook itself
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```
//! use chunkveil_core::{
//!     ObfuscationResult, ObfuscatorOptions, ObfuscatorPlugin, RenderedChunk, SourceMapMode,
//! };
//!
//! let engine = |code: &str, _options: &ObfuscatorOptions| -> chunkveil_core::Result<_> {
//!     Ok(ObfuscationResult::new(format!("(function(){{{code}}})();")).with_source_map("{}"))
//! };
//! let options = ObfuscatorOptions::new().with_source_map(SourceMapMode::Separate);
//! let plugin = ObfuscatorPlugin::with_engine(options, engine);
//!
//! match plugin.transform("function test() { return 42; }") {
//!     RenderedChunk::Transformed(chunk) => assert!(chunk.map.is_some()),
//!     RenderedChunk::Unchanged => unreachable!(),
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod engine;
pub mod error;
pub mod options;
pub mod plugin;

// Re-export primary types for convenience
pub use engine::{CommandEngine, ObfuscationEngine, ObfuscationResult, DEFAULT_ENGINE_PROGRAM};
pub use error::{Error, Result};
pub use options::{ObfuscatorOptions, SourceMapMode};
pub use plugin::{
    ChunkInfo, Enforce, ObfuscatorPlugin, RenderChunkHook, RenderedChunk, TransformedChunk,
    PLUGIN_NAME,
};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
