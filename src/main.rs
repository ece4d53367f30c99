use clap::Parser;
use colored::Colorize;
use keepgraph::config::Config;
use keepgraph::parser::xml::ComponentKind;
use keepgraph::report::{self, KeepReport, Reporter};
use keepgraph::watch::FileWatcher;
use keepgraph::{Program, ReachabilityEngine};
use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// keepgraph - Compute which classes, methods and fields an optimizer must keep
#[derive(Parser, Debug)]
#[command(name = "keepgraph")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON dump of the program to analyze
    program: PathBuf,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Unpacked apk holding AndroidManifest.xml, res/ and lib/
    #[arg(long, value_name = "DIR")]
    apk_dir: Option<PathBuf>,

    /// Package prefix whose classes are kept by name (can be specified multiple times)
    #[arg(long = "keep-package", value_name = "PREFIX")]
    keep_packages: Vec<String>,

    /// Annotation type that keeps what carries it (can be specified multiple times)
    #[arg(long = "keep-annotation", value_name = "TYPE")]
    keep_annotations: Vec<String>,

    /// Component kind to prune when unexported (can be specified multiple times)
    #[arg(long = "prune-unexported", value_name = "KIND", value_parser = parse_component_kind)]
    prune_unexported: Vec<ComponentKind>,

    /// Skip manifest and layout reachability
    #[arg(long)]
    no_xml: bool,

    /// Skip scanning native libraries for class names
    #[arg(long)]
    no_native_libs: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "terminal")]
    format: OutputFormat,

    /// Output file (for json format)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only report entities whose name contains this text
    #[arg(long, value_name = "NAME")]
    explain: Option<String>,

    /// Watch mode - recompute layout reachability when the apk directory changes
    #[arg(long)]
    watch: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode - only output results
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default)]
enum OutputFormat {
    #[default]
    Terminal,
    Json,
}

impl From<OutputFormat> for report::ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Terminal => report::ReportFormat::Terminal,
            OutputFormat::Json => report::ReportFormat::Json,
        }
    }
}

fn parse_component_kind(value: &str) -> Result<ComponentKind, String> {
    ComponentKind::from_tag(value).ok_or_else(|| {
        format!(
            "unknown component kind '{}' (expected activity, activity-alias, receiver, service or provider)",
            value
        )
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    info!("keepgraph v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;

    let start_time = Instant::now();
    let program = Program::from_json_file(&cli.program)?;
    info!(
        "Loaded {} classes, {} methods, {} fields in {:?}",
        program.class_count(),
        program.method_count(),
        program.field_count(),
        start_time.elapsed()
    );

    let engine = ReachabilityEngine::new(&program, config);
    engine.init_reachable_classes().into_diagnostic()?;

    let reporter = Reporter::new(cli.format.into(), cli.output.clone());
    reporter.report(&KeepReport::build(&program, cli.explain.as_deref()))?;

    if cli.watch {
        run_watch_mode(&engine, &reporter, &cli)?;
    }

    Ok(())
}

fn run_watch_mode(engine: &ReachabilityEngine<'_>, reporter: &Reporter, cli: &Cli) -> Result<()> {
    if !engine.config().has_apk_dir() {
        return Err(miette::miette!(
            "--watch needs an apk directory (--apk-dir or apk_dir in the config)"
        ));
    }

    let apk_dir = engine.config().apk_dir.clone();
    let program = engine.program();
    let mut first = true;

    FileWatcher::new()
        .watch(&apk_dir, || {
            // The report for the initial computation is already printed
            if std::mem::take(&mut first) {
                return true;
            }

            let result = engine
                .recompute_reachable_from_xml_layouts()
                .into_diagnostic()
                .and_then(|()| reporter.report(&KeepReport::build(program, cli.explain.as_deref())));

            match result {
                Ok(()) => {
                    println!();
                    println!("{}", "Recomputed. Waiting for changes...".green());
                }
                Err(e) => eprintln!("{}: {:?}", "Recompute error".red(), e),
            }
            true
        })
        .map_err(|e| miette::miette!("Watch error: {}", e))?;

    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    // Reports own stdout
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else {
        Config::from_default_locations(config_dir(&cli.program))?
    };

    // Override with CLI arguments
    if let Some(apk_dir) = &cli.apk_dir {
        config.apk_dir = apk_dir.clone();
    }
    config.keep_packages.extend(cli.keep_packages.iter().cloned());
    config.keep_annotations.extend(cli.keep_annotations.iter().cloned());
    config
        .prune_unexported_components
        .extend(cli.prune_unexported.iter().copied());
    if cli.no_xml {
        config.compute_xml_reachability = false;
    }
    if cli.no_native_libs {
        config.analyze_native_lib_reachability = false;
    }

    Ok(config)
}

/// Directory holding the program dump, probed for a config file
fn config_dir(program: &Path) -> &Path {
    match program.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
