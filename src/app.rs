//! Application entry logic shared by the binary and integration tests.
//!
//! [`run_app`] takes parsed CLI arguments, layers them over the loaded
//! configuration, runs the requested subcommand, and returns the exit code.
//! Fatal errors (unsupported algorithm, unreadable pool or config file,
//! pool build failure) come back as `Err`; per-file failures are part of the result.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::cli::{Cli, Commands, OutputFormat, ScanArgs};
use crate::config::Config;
use crate::duplicates::{DigestFinder, FinderConfig, ScanResult};
use crate::error::ExitCode;
use crate::logging::init_logging;
use crate::output::{JsonOutput, TextOutput};
use crate::progress::Progress;
use crate::scanner::{DigestAlgorithm, MAX_AUTO_WORKERS};
use crate::signal::install_handler;

/// Run hashmatch with parsed arguments.
///
/// # Errors
///
/// Returns an error for failures that stop the whole run.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    // An explicit file must load; the platform default may be absent.
    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from(Some(path))
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::load(None),
    };
    log::debug!("Effective configuration: {:?}", config);

    match cli.command {
        Commands::Algorithms => {
            let mut stdout = io::stdout().lock();
            write_algorithms(&mut stdout)?;
            Ok(ExitCode::Success)
        }
        Commands::Scan(ref args) => {
            let settings = ScanSettings::resolve(args, &config)?;
            let show_progress = settings.progress && !cli.quiet;
            let result = run_scan(args.paths.clone(), &settings, show_progress, cli.accessible)?;
            let exit_code = ExitCode::from_result(&result);

            let mut stdout = io::stdout().lock();
            match settings.output {
                OutputFormat::Json => JsonOutput::new(&result, exit_code)
                    .write_to(&mut stdout, true)
                    .context("Failed to write JSON output")?,
                OutputFormat::Text => TextOutput::new(&result, exit_code)
                    .write_to(&mut stdout)
                    .context("Failed to write report")?,
            }

            Ok(exit_code)
        }
    }
}

/// Scan options after CLI flags are applied over the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    /// Resolved digest algorithm
    pub algorithm: DigestAlgorithm,
    /// Requested workers, 0 for automatic sizing
    pub workers: usize,
    /// Read buffer size in bytes
    pub buffer_size: usize,
    /// Output format
    pub output: OutputFormat,
    /// Whether to draw a progress bar
    pub progress: bool,
    /// Reference digests; `Some` selects pool matching
    pub references: Option<Vec<String>>,
}

impl ScanSettings {
    /// Merge `args` over `config`.
    ///
    /// # Errors
    ///
    /// Fails if the algorithm is unsupported or the pool file cannot be read.
    pub fn resolve(args: &ScanArgs, config: &Config) -> anyhow::Result<Self> {
        let algorithm_name = args.algorithm.as_deref().unwrap_or(&config.algorithm);
        let algorithm: DigestAlgorithm = algorithm_name.parse()?;

        let output = args.output.unwrap_or(config.output);

        let references = if args.has_pool() {
            let mut references = args.references.clone();
            if let Some(ref pool_file) = args.pool_file {
                references.extend(read_pool_file(pool_file)?);
            }
            Some(references)
        } else {
            None
        };

        let buffer_size = match args.buffer_size {
            Some(size) => usize::try_from(size).context("Buffer size too large")?,
            None => config.buffer_size,
        };

        Ok(Self {
            algorithm,
            workers: args.workers.unwrap_or(config.workers),
            buffer_size,
            output,
            progress: config.progress && !args.no_progress && output == OutputFormat::Text,
            references,
        })
    }
}

/// Read reference digests, one per line. Blank lines and `#` comments are
/// skipped.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn read_pool_file(path: &Path) -> anyhow::Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read pool file {}", path.display()))?;

    let references: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();

    log::debug!(
        "Loaded {} reference digests from {}",
        references.len(),
        path.display()
    );
    Ok(references)
}

fn run_scan(
    paths: Vec<PathBuf>,
    settings: &ScanSettings,
    show_progress: bool,
    accessible: bool,
) -> anyhow::Result<ScanResult> {
    let handler = install_handler()?;

    let mut finder_config = FinderConfig::default()
        .with_algorithm(settings.algorithm)
        .with_workers(settings.workers)
        .with_buffer_size(settings.buffer_size)
        .with_shutdown_flag(handler.get_flag());
    if let Some(ref references) = settings.references {
        finder_config = finder_config.with_references(references.clone());
    }
    if show_progress {
        let progress = Progress::with_accessible(false, accessible);
        finder_config = finder_config.with_progress_callback(Arc::new(progress));
    }

    let finder = DigestFinder::new(finder_config);
    log::debug!(
        "Scan settings: {} paths, {} workers, {} byte buffer, pool mode: {}",
        paths.len(),
        finder.worker_count(),
        settings.buffer_size,
        settings.references.is_some()
    );

    Ok(finder.find(paths)?)
}

fn write_algorithms<W: Write>(w: &mut W) -> io::Result<()> {
    for algorithm in DigestAlgorithm::ALL {
        let marker = if algorithm == DigestAlgorithm::default() {
            " (default)"
        } else {
            ""
        };
        writeln!(w, "{:<8} {} hex digits{}", algorithm.as_str(), algorithm.hex_len(), marker)?;
    }
    writeln!(w, "automatic worker limit: {}", MAX_AUTO_WORKERS)
}
