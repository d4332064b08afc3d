//! Error types for the chunkveil-core library.
//!
//! Every failure the obfuscation engine can raise is represented here. The
//! plugin never lets these escape to the host; they are logged and turned
//! into [`RenderedChunk::Unchanged`](crate::RenderedChunk::Unchanged).

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Result type alias for chunkveil operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all chunkveil operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        /// Path to the file that failed to write
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a directory
    #[error("failed to create directory '{path}': {source}")]
    DirectoryCreate {
        /// Path to the directory that failed to create
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Options could not be parsed or serialized
    #[error("invalid obfuscator options: {0}")]
    InvalidOptions(String),

    /// The engine process could not be started
    #[error("failed to spawn obfuscation engine '{program}': {source}")]
    EngineSpawn {
        /// Program that was executed
        program: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The engine ran but reported a failure
    #[error("obfuscation engine exited with {status}: {stderr}")]
    EngineExit {
        /// Exit status of the engine process
        status: ExitStatus,
        /// Captured standard error, trimmed
        stderr: String,
    },

    /// The engine rejected the input code
    #[error("obfuscation engine rejected input: {0}")]
    EngineRejected(String),
}

impl Error {
    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new file write error
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates a new directory creation error
    pub fn directory_create(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryCreate {
            path: path.into(),
            source,
        }
    }

    /// Creates a new invalid options error
    pub fn invalid_options(msg: impl Into<String>) -> Self {
        Self::InvalidOptions(msg.into())
    }

    /// Creates a new engine spawn error
    pub fn engine_spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::EngineSpawn {
            program: program.into(),
            source,
        }
    }

    /// Creates a new engine exit error
    pub fn engine_exit(status: ExitStatus, stderr: impl AsRef<str>) -> Self {
        Self::EngineExit {
            status,
            stderr: stderr.as_ref().trim().to_string(),
        }
    }

    /// Creates a new engine rejection error
    pub fn engine_rejected(msg: impl Into<String>) -> Self {
        Self::EngineRejected(msg.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidOptions(err.to_string())
    }
}
