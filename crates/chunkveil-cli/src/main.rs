//! chunkveil - Obfuscate bundled JavaScript chunks
//!
//! This tool plays the bundler's part for already-built output: it feeds
//! each chunk through the `javascript-obfuscator` render-chunk plugin and
//! writes back whatever the plugin returns.

use anyhow::{bail, Context, Result};
use chunkveil_core::{
    ChunkInfo, CommandEngine, ObfuscatorOptions, ObfuscatorPlugin, RenderChunkHook,
    RenderedChunk, SourceMapMode, DEFAULT_ENGINE_PROGRAM,
};
use clap::{Args, Parser, ValueEnum};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Obfuscate bundled JavaScript chunks with javascript-obfuscator
#[derive(Parser, Debug)]
#[command(name = "chunkveil")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Output directory (default: rewrite chunks in place)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON file with javascript-obfuscator options
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Request a source map (overrides the config file)
    #[arg(long)]
    source_map: bool,

    /// Source map mode (overrides the config file)
    #[arg(long, value_enum)]
    source_map_mode: Option<MapMode>,

    /// Obfuscator executable to run
    #[arg(long, env = "CHUNKVEIL_ENGINE", default_value = DEFAULT_ENGINE_PROGRAM)]
    engine: PathBuf,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Dry run - obfuscate but don't write anything
    #[arg(long)]
    dry_run: bool,

    /// Overwrite existing files in the output directory
    #[arg(long)]
    force: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a single chunk
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a build output directory
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

/// How a requested source map is emitted
#[derive(Debug, Clone, Copy, ValueEnum)]
enum MapMode {
    /// Embedded in the obfuscated code
    Inline,
    /// Written next to the chunk as `<chunk>.map`
    Separate,
}

impl From<MapMode> for SourceMapMode {
    fn from(mode: MapMode) -> Self {
        match mode {
            MapMode::Inline => SourceMapMode::Inline,
            MapMode::Separate => SourceMapMode::Separate,
        }
    }
}

#[derive(Debug, Default)]
struct RunStats {
    transformed: usize,
    unchanged: usize,
    written: usize,
    maps: usize,
}

impl RunStats {
    fn print_summary(&self) {
        info!(
            "Summary: {} transformed, {} unchanged, {} written, {} source maps",
            self.transformed, self.unchanged, self.written, self.maps
        );
    }
}

/// Where results go
struct Sink<'a> {
    output: Option<&'a Path>,
    dry_run: bool,
    force: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    let options = load_options(&cli)?;
    let engine = CommandEngine::new().program(&cli.engine);
    let plugin = ObfuscatorPlugin::with_engine(options, engine);

    let sink = Sink {
        output: cli.output.as_deref(),
        dry_run: cli.dry_run,
        force: cli.force,
    };

    let stats = if let Some(ref file) = cli.input.file {
        process_single_file(&plugin, file, &sink)?
    } else if let Some(ref directory) = cli.input.directory {
        process_directory(&plugin, directory, &sink)?
    } else {
        bail!("Either --file or --directory must be specified")
    };

    if !cli.dry_run {
        stats.print_summary();
    }

    Ok(())
}

/// Options from the config file, with command line overrides applied
fn load_options(cli: &Cli) -> Result<ObfuscatorOptions> {
    let mut options = match cli.config {
        Some(ref path) => ObfuscatorOptions::from_path(path)
            .with_context(|| format!("Failed to load options: {}", path.display()))?,
        None => ObfuscatorOptions::default(),
    };

    if cli.source_map {
        options = options.set("sourceMap", true);
    }
    if let Some(mode) = cli.source_map_mode {
        options = options.set("sourceMapMode", SourceMapMode::from(mode).as_str());
    }

    debug!("Loaded {} obfuscator option(s)", options.len());
    Ok(options)
}

/// Process a single chunk
fn process_single_file(
    plugin: &impl RenderChunkHook,
    file: &Path,
    sink: &Sink<'_>,
) -> Result<RunStats> {
    if !file.exists() {
        bail!("Input file does not exist: {}", file.display());
    }
    if !file.is_file() {
        bail!("Input path is not a file: {}", file.display());
    }

    let name = file
        .file_name()
        .map(PathBuf::from)
        .context("Input file has no file name")?;

    let mut stats = RunStats::default();
    process_chunk(plugin, file, &name, sink, &mut stats)?;
    Ok(stats)
}

/// Process every chunk under a build output directory
fn process_directory(
    plugin: &impl RenderChunkHook,
    directory: &Path,
    sink: &Sink<'_>,
) -> Result<RunStats> {
    if !directory.exists() {
        bail!("Directory does not exist: {}", directory.display());
    }
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    // Results written under the scanned tree must not be picked up again
    let skip_dir = match sink.output {
        Some(output) if !sink.dry_run => {
            fs::create_dir_all(output)
                .with_context(|| format!("Failed to create directory: {}", output.display()))?;
            Some(
                fs::canonicalize(output)
                    .with_context(|| format!("Failed to resolve: {}", output.display()))?,
            )
        }
        _ => None,
    };

    let mut stats = RunStats::default();

    for entry in WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_output_dir(e.path(), skip_dir.as_deref()))
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        if !is_chunk_file(path) {
            trace!("Skipping non-chunk: {}", path.display());
            continue;
        }

        let relative = path.strip_prefix(directory).unwrap_or(path);
        if let Err(e) = process_chunk(plugin, path, relative, sink, &mut stats) {
            // Log error but continue with other chunks
            warn!("Error processing {}: {}", path.display(), e);
        }
    }

    Ok(stats)
}

fn is_output_dir(path: &Path, output: Option<&Path>) -> bool {
    match output {
        Some(output) if path.is_dir() => fs::canonicalize(path)
            .map(|p| p.as_path() == output)
            .unwrap_or(false),
        _ => false,
    }
}

/// JavaScript output, skipping hidden files and emitted maps
fn is_chunk_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.starts_with('.') || name.ends_with(".map") {
        return false;
    }

    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("js" | "mjs" | "cjs")
    )
}

/// Output path for a chunk: mirrored under the output dir, or in place
fn destination(source: &Path, relative: &Path, output: Option<&Path>) -> PathBuf {
    match output {
        Some(dir) => dir.join(relative),
        None => source.to_path_buf(),
    }
}

fn map_destination(destination: &Path) -> PathBuf {
    let mut path = destination.as_os_str().to_owned();
    path.push(".map");
    PathBuf::from(path)
}

/// Run one chunk through the plugin and write the outcome
fn process_chunk(
    plugin: &impl RenderChunkHook,
    source: &Path,
    relative: &Path,
    sink: &Sink<'_>,
    stats: &mut RunStats,
) -> Result<()> {
    trace!("Reading {}", source.display());
    let code = fs::read_to_string(source)
        .with_context(|| format!("Failed to read chunk: {}", source.display()))?;

    let chunk = ChunkInfo::new(relative.to_string_lossy());
    let dest = destination(source, relative, sink.output);
    let in_place = sink.output.is_none();

    match plugin.render_chunk(&code, &chunk) {
        RenderedChunk::Transformed(transformed) => {
            stats.transformed += 1;
            if sink.dry_run {
                println!("Would write: {}", dest.display());
                return Ok(());
            }

            write_file(&dest, &transformed.code, in_place || sink.force)?;
            stats.written += 1;
            println!("Wrote {}", dest.display());

            if let Some(map) = transformed.map {
                let map_path = map_destination(&dest);
                write_file(&map_path, &map, in_place || sink.force)?;
                stats.maps += 1;
                debug!("Wrote source map {}", map_path.display());
            }
        }
        RenderedChunk::Unchanged => {
            stats.unchanged += 1;
            debug!("Leaving {} unchanged", source.display());
            if !in_place && !sink.dry_run {
                write_file(&dest, &code, sink.force)?;
                stats.written += 1;
            }
        }
    }

    Ok(())
}

/// Write a file, creating parent directories
fn write_file(path: &Path, content: &str, overwrite: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    if path.exists() && !overwrite {
        bail!(
            "File already exists: {} (use --force to overwrite)",
            path.display()
        );
    }

    let mut file = fs::File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;

    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write file: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkveil_core::{Error, ObfuscationResult};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    type StubEngine = fn(&str, &ObfuscatorOptions) -> chunkveil_core::Result<ObfuscationResult>;

    fn stub_engine(
        code: &str,
        _options: &ObfuscatorOptions,
    ) -> chunkveil_core::Result<ObfuscationResult> {
        if code.contains("syntax error") {
            return Err(Error::engine_rejected("Unexpected token"));
        }
        Ok(ObfuscationResult::new(format!("/*veiled*/{code}")).with_source_map("{\"version\":3}"))
    }

    fn stub_plugin(options: ObfuscatorOptions) -> ObfuscatorPlugin<StubEngine> {
        ObfuscatorPlugin::with_engine(options, stub_engine as StubEngine)
    }

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_is_chunk_file() {
        assert!(is_chunk_file(Path::new("dist/index.js")));
        assert!(is_chunk_file(Path::new("dist/vendor.mjs")));
        assert!(is_chunk_file(Path::new("dist/server.cjs")));
        assert!(!is_chunk_file(Path::new("dist/index.js.map")));
        assert!(!is_chunk_file(Path::new("dist/.hidden.js")));
        assert!(!is_chunk_file(Path::new("dist/style.css")));
        assert!(!is_chunk_file(Path::new("dist/index.html")));
    }

    #[test]
    fn test_destination() {
        let source = Path::new("/build/dist/assets/app.js");
        let relative = Path::new("assets/app.js");

        assert_eq!(destination(source, relative, None), source);
        assert_eq!(
            destination(source, relative, Some(Path::new("/out"))),
            PathBuf::from("/out/assets/app.js")
        );
        assert_eq!(
            map_destination(Path::new("/out/assets/app.js")),
            PathBuf::from("/out/assets/app.js.map")
        );
    }

    #[test]
    fn test_directory_in_place() {
        let dist = TempDir::new().unwrap();
        write(dist.path(), "index.js", "console.log(1);");
        write(dist.path(), "assets/broken.js", "syntax error here");
        write(dist.path(), "index.html", "<html></html>");

        let plugin = stub_plugin(ObfuscatorOptions::default());
        let sink = Sink {
            output: None,
            dry_run: false,
            force: false,
        };
        let stats = process_directory(&plugin, dist.path(), &sink).unwrap();

        assert_eq!(stats.transformed, 1);
        assert_eq!(stats.unchanged, 1);
        assert_eq!(stats.maps, 0);
        assert_eq!(
            fs::read_to_string(dist.path().join("index.js")).unwrap(),
            "/*veiled*/console.log(1);"
        );
        assert_eq!(
            fs::read_to_string(dist.path().join("assets/broken.js")).unwrap(),
            "syntax error here"
        );
        assert!(!dist.path().join("index.js.map").exists());
    }

    #[test]
    fn test_directory_to_output_with_maps() {
        let dist = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write(dist.path(), "assets/app.js", "let a = 1;");
        write(dist.path(), "assets/broken.js", "syntax error");

        let options = ObfuscatorOptions::new().with_source_map(SourceMapMode::Separate);
        let plugin = stub_plugin(options);
        let sink = Sink {
            output: Some(out.path()),
            dry_run: false,
            force: false,
        };
        let stats = process_directory(&plugin, dist.path(), &sink).unwrap();

        assert_eq!(stats.transformed, 1);
        assert_eq!(stats.unchanged, 1);
        assert_eq!(stats.written, 2);
        assert_eq!(stats.maps, 1);
        assert_eq!(
            fs::read_to_string(out.path().join("assets/app.js.map")).unwrap(),
            "{\"version\":3}"
        );
        // Unchanged chunks are copied through untouched
        assert_eq!(
            fs::read_to_string(out.path().join("assets/broken.js")).unwrap(),
            "syntax error"
        );
        // Sources are left alone
        assert_eq!(
            fs::read_to_string(dist.path().join("assets/app.js")).unwrap(),
            "let a = 1;"
        );
    }

    #[test]
    fn test_existing_output_requires_force() {
        let dist = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let chunk = write(dist.path(), "app.js", "let a = 1;");
        write(out.path(), "app.js", "old");

        let plugin = stub_plugin(ObfuscatorOptions::default());
        let sink = Sink {
            output: Some(out.path()),
            dry_run: false,
            force: false,
        };
        let mut stats = RunStats::default();
        let result = process_chunk(&plugin, &chunk, Path::new("app.js"), &sink, &mut stats);
        assert!(result.is_err());

        let sink = Sink { force: true, ..sink };
        process_chunk(&plugin, &chunk, Path::new("app.js"), &sink, &mut stats).unwrap();
        assert_eq!(
            fs::read_to_string(out.path().join("app.js")).unwrap(),
            "/*veiled*/let a = 1;"
        );
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let dist = TempDir::new().unwrap();
        let chunk = write(dist.path(), "app.js", "let a = 1;");

        let plugin = stub_plugin(ObfuscatorOptions::default());
        let sink = Sink {
            output: None,
            dry_run: true,
            force: false,
        };
        let stats = process_single_file(&plugin, &chunk, &sink).unwrap();

        assert_eq!(stats.transformed, 1);
        assert_eq!(stats.written, 0);
        assert_eq!(fs::read_to_string(&chunk).unwrap(), "let a = 1;");
    }

    #[test]
    fn test_load_options_overrides() {
        let dir = TempDir::new().unwrap();
        let config = write(
            dir.path(),
            "obfuscator.json",
            r#"{"compact": true, "sourceMap": false, "sourceMapMode": "inline"}"#,
        );

        let cli = Cli::parse_from([
            "chunkveil",
            "--file",
            "dist/app.js",
            "--config",
            config.to_str().unwrap(),
            "--source-map",
            "--source-map-mode",
            "separate",
        ]);
        let options = load_options(&cli).unwrap();

        assert_eq!(options.get("compact"), Some(&serde_json::json!(true)));
        assert!(options.wants_separate_map());
    }

    #[test]
    fn test_load_options_without_config() {
        let cli = Cli::parse_from(["chunkveil", "--directory", "dist"]);
        let options = load_options(&cli).unwrap();
        assert!(options.is_empty());
    }

    #[test]
    fn test_engine_flag() {
        let cli = Cli::try_parse_from([
            "chunkveil",
            "--directory",
            "dist",
            "--engine",
            "/opt/obfuscator/bin/javascript-obfuscator",
        ])
        .unwrap();
        assert_eq!(
            cli.engine,
            PathBuf::from("/opt/obfuscator/bin/javascript-obfuscator")
        );
    }

    #[test]
    fn test_output_inside_directory_is_not_rescanned() {
        let dist = TempDir::new().unwrap();
        let out = dist.path().join("obfuscated");
        write(dist.path(), "app.js", "let a = 1;");
        write(dist.path(), "assets/vendor.js", "let b = 2;");
        write(&out, "stale.js", "let c = 3;");

        let plugin = stub_plugin(ObfuscatorOptions::default());
        let sink = Sink {
            output: Some(out.as_path()),
            dry_run: false,
            force: false,
        };
        let stats = process_directory(&plugin, dist.path(), &sink).unwrap();

        assert_eq!(stats.transformed, 2);
        assert_eq!(stats.written, 2);
        assert_eq!(
            fs::read_to_string(out.join("app.js")).unwrap(),
            "/*veiled*/let a = 1;"
        );
        assert_eq!(
            fs::read_to_string(out.join("assets/vendor.js")).unwrap(),
            "/*veiled*/let b = 2;"
        );
        assert_eq!(fs::read_to_string(out.join("stale.js")).unwrap(), "let c = 3;");
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
