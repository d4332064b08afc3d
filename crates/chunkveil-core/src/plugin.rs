//! The render-chunk plugin.
//!
//! [`ObfuscatorPlugin`] sits at the bundler's render-chunk hook. It runs each
//! finished chunk through an [`ObfuscationEngine`] and reports back either the
//! transformed chunk or [`RenderedChunk::Unchanged`]. Engine failures never
//! reach the host: they are logged once and the chunk ships as it was.

use crate::engine::{CommandEngine, ObfuscationEngine};
use crate::options::ObfuscatorOptions;
use tracing::{debug, error};

/// Name under which the plugin registers with the host
pub const PLUGIN_NAME: &str = "javascript-obfuscator";

/// Tag prefixed to the diagnostic line logged on engine failure
pub const ERROR_TAG: &str = "[Obfuscator Error]";

/// Log target for plugin diagnostics
pub const LOG_TARGET: &str = "chunkveil::obfuscator";

/// Ordering hint for hosts that sort plugins around their own transforms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enforce {
    /// Run before the host's normal plugins
    Pre,
    /// Run after the host's normal plugins
    Post,
}

impl Enforce {
    /// The host's name for this ordering
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pre => "pre",
            Self::Post => "post",
        }
    }
}

/// Metadata the host passes along with a chunk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkInfo {
    /// Output file name of the chunk, used to name it in diagnostics
    pub file_name: String,
}

impl ChunkInfo {
    /// Creates chunk metadata for the given output file
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }
}

/// An obfuscated chunk handed back to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedChunk {
    /// Obfuscated code
    pub code: String,
    /// Separate source map, present only when requested and not inline
    pub map: Option<String>,
}

/// Outcome of the render-chunk hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedChunk {
    /// The chunk was obfuscated
    Transformed(TransformedChunk),
    /// Nothing was done; the host keeps the chunk as it was
    Unchanged,
}

impl RenderedChunk {
    /// Returns the transformed chunk, if any
    pub fn transformed(&self) -> Option<&TransformedChunk> {
        match self {
            Self::Transformed(chunk) => Some(chunk),
            Self::Unchanged => None,
        }
    }

    /// Returns true if the host should keep the chunk as it was
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }
}

/// The hook contract a bundler expects from a render-chunk plugin
pub trait RenderChunkHook: Send + Sync {
    /// Registry name of the plugin
    fn name(&self) -> &'static str;

    /// Requested position relative to the host's other plugins
    fn enforce(&self) -> Option<Enforce> {
        None
    }

    /// Called once per finished chunk
    fn render_chunk(&self, code: &str, chunk: &ChunkInfo) -> RenderedChunk;
}

/// Render-chunk plugin that obfuscates every chunk it is given
#[derive(Debug, Clone)]
pub struct ObfuscatorPlugin<E = CommandEngine> {
    options: ObfuscatorOptions,
    engine: E,
    enforce: Option<Enforce>,
}

impl Default for ObfuscatorPlugin {
    fn default() -> Self {
        Self::new(ObfuscatorOptions::default())
    }
}

impl ObfuscatorPlugin {
    /// Creates a plugin that runs `javascript-obfuscator` with the given options
    pub fn new(options: ObfuscatorOptions) -> Self {
        Self::with_engine(options, CommandEngine::new())
    }
}

impl<E: ObfuscationEngine> ObfuscatorPlugin<E> {
    /// Creates a plugin backed by a custom engine
    pub fn with_engine(options: ObfuscatorOptions, engine: E) -> Self {
        Self {
            options,
            engine,
            enforce: None,
        }
    }

    /// Sets the ordering hint reported to the host
    pub fn with_enforce(mut self, enforce: Enforce) -> Self {
        self.enforce = Some(enforce);
        self
    }

    /// Registry name of the plugin
    pub fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    /// Options forwarded to the engine
    pub fn options(&self) -> &ObfuscatorOptions {
        &self.options
    }

    /// The engine in use
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Requested ordering, if any
    pub fn enforce(&self) -> Option<Enforce> {
        self.enforce
    }

    /// Obfuscates one chunk.
    ///
    /// Never fails: an engine error is logged and reported as
    /// [`RenderedChunk::Unchanged`].
    pub fn transform(&self, code: &str) -> RenderedChunk {
        self.run(code, None)
    }

    fn run(&self, code: &str, chunk: Option<&ChunkInfo>) -> RenderedChunk {
        let file_name = chunk.map(|c| c.file_name.as_str()).unwrap_or("<chunk>");
        debug!(
            target: LOG_TARGET,
            "Obfuscating {} ({} bytes) with {}",
            file_name,
            code.len(),
            self.engine.name()
        );

        match self.engine.obfuscate(code, &self.options) {
            Ok(result) => {
                let (code, map) = result.into_parts();
                let map = if self.options.wants_separate_map() {
                    map
                } else {
                    None
                };
                RenderedChunk::Transformed(TransformedChunk { code, map })
            }
            Err(e) => {
                // One line per failure; engines may report multi-line stack traces.
                let detail = e.to_string();
                let mut lines = detail.lines().map(str::trim).filter(|l| !l.is_empty());
                let summary = lines.next().unwrap_or("obfuscation failed");
                error!(target: LOG_TARGET, "{} {}: {}", ERROR_TAG, file_name, summary);
                if lines.next().is_some() {
                    debug!(target: LOG_TARGET, "Engine output for {}:\n{}", file_name, detail);
                }
                RenderedChunk::Unchanged
            }
        }
    }
}

impl<E: ObfuscationEngine> RenderChunkHook for ObfuscatorPlugin<E> {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn enforce(&self) -> Option<Enforce> {
        self.enforce
    }

    fn render_chunk(&self, code: &str, chunk: &ChunkInfo) -> RenderedChunk {
        self.run(code, Some(chunk))
    }
}
