//! Engine backed by the `javascript-obfuscator` command line tool.

use super::{ObfuscationEngine, ObfuscationResult};
use crate::error::{Error, Result};
use crate::options::ObfuscatorOptions;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, trace};

/// Program run when no other is configured
pub const DEFAULT_ENGINE_PROGRAM: &str = "javascript-obfuscator";

const INPUT_FILE: &str = "chunk.js";
const OUTPUT_FILE: &str = "chunk.obfuscated.js";
const CONFIG_FILE: &str = "obfuscator.config.json";

/// Runs the obfuscator as a child process, once per chunk.
///
/// Each call gets its own scratch directory holding the chunk, the options
/// as a JSON config file, and whatever the tool writes back. The directory
/// is removed when the call returns.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: OsString,
    args: Vec<OsString>,
}

impl Default for CommandEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandEngine {
    /// Creates an engine that runs `javascript-obfuscator` from `PATH`
    pub fn new() -> Self {
        Self {
            program: DEFAULT_ENGINE_PROGRAM.into(),
            args: Vec::new(),
        }
    }

    /// Sets the program to run
    pub fn program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// Adds an argument placed before the input file
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Returns the configured program
    pub fn get_program(&self) -> &OsStr {
        &self.program
    }

    fn command(&self, input: &Path, output: &Path, config: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(input)
            .arg("--output")
            .arg(output)
            .arg("--config")
            .arg(config);
        cmd
    }
}

impl ObfuscationEngine for CommandEngine {
    fn obfuscate(&self, code: &str, options: &ObfuscatorOptions) -> Result<ObfuscationResult> {
        let scratch = tempfile::Builder::new()
            .prefix("chunkveil-")
            .tempdir()
            .map_err(|e| Error::directory_create(std::env::temp_dir(), e))?;

        let input = scratch.path().join(INPUT_FILE);
        let output = scratch.path().join(OUTPUT_FILE);
        let config = scratch.path().join(CONFIG_FILE);

        fs::write(&input, code).map_err(|e| Error::file_write(&input, e))?;
        fs::write(&config, options.to_json_string()?).map_err(|e| Error::file_write(&config, e))?;

        let mut cmd = self.command(&input, &output, &config);
        debug!(
            "Running {} on {} bytes",
            self.program.to_string_lossy(),
            code.len()
        );

        let result = cmd
            .output()
            .map_err(|e| Error::engine_spawn(self.program.to_string_lossy(), e))?;

        if !result.status.success() {
            return Err(Error::engine_exit(
                result.status,
                String::from_utf8_lossy(&result.stderr),
            ));
        }

        let obfuscated = fs::read_to_string(&output).map_err(|e| Error::file_read(&output, e))?;

        let map_path = map_path_for(&output);
        if !map_path.is_file() {
            return Ok(ObfuscationResult::new(obfuscated));
        }

        let map = fs::read_to_string(&map_path).map_err(|e| Error::file_read(&map_path, e))?;
        trace!("Engine wrote source map ({} bytes)", map.len());

        // The tool links the code to its scratch map file; the host names the map itself.
        let code = strip_map_url(&obfuscated, &map_file_name(&output)).to_string();
        Ok(ObfuscationResult::new(code).with_source_map(map))
    }

    fn name(&self) -> &str {
        DEFAULT_ENGINE_PROGRAM
    }
}

/// The tool writes separate maps next to the output as `<output>.map`
fn map_path_for(output: &Path) -> PathBuf {
    let mut path = output.as_os_str().to_owned();
    path.push(".map");
    PathBuf::from(path)
}

fn map_file_name(output: &Path) -> String {
    map_path_for(output)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Drops a trailing `//# sourceMappingURL=` comment pointing at `map_file`
fn strip_map_url<'a>(code: &'a str, map_file: &str) -> &'a str {
    let trimmed = code.trim_end();
    let (body, last_line) = match trimmed.rfind('\n') {
        Some(pos) => (&trimmed[..pos], &trimmed[pos + 1..]),
        None => ("", trimmed),
    };

    match last_line.trim().strip_prefix("//# sourceMappingURL=") {
        Some(url) if !map_file.is_empty() && url.ends_with(map_file) => body.trim_end_matches('\r'),
        _ => code,
    }
}
