use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use omero_plate_annotator::app::{AnnotateOptions, App};
use omero_plate_annotator::config::{Credentials, ServerConfig, ServerOverrides};
use omero_plate_annotator::error::AnnotateError;
use omero_plate_annotator::loader::load_table;
use omero_plate_annotator::omero::OmeroHttpClient;
use omero_plate_annotator::output::JsonOutput;

#[derive(Parser)]
#[command(name = "annotate-plate")]
#[command(about = "Annotate an OMERO plate from a csv file")]
#[command(version, author)]
struct Cli {
    /// Path to csv file containing plate metadata
    csv: Utf8PathBuf,

    /// Overwrite existing MapAnnotations with the same namespace
    #[arg(long)]
    force: bool,

    /// OMERO server hostname
    #[arg(long)]
    host: Option<String>,

    /// OMERO server port
    #[arg(long)]
    port: Option<u16>,

    /// Connect over plain http
    #[arg(long)]
    insecure: bool,

    /// OMERO group to log in to
    #[arg(long)]
    group: Option<String>,

    /// Namespace for the map annotations
    #[arg(long)]
    namespace: Option<String>,

    /// OMERO username (password comes from OMERO_PASSWORD)
    #[arg(long)]
    user: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(annotate) = report.downcast_ref::<AnnotateError>() {
            return ExitCode::from(annotate.exit_code());
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let overrides = ServerOverrides {
        host: cli.host,
        port: cli.port,
        insecure: cli.insecure,
        group: cli.group,
        namespace: cli.namespace,
    };
    // miette::Report::new keeps the concrete AnnotateError so main can
    // downcast it for the exit code; into_diagnostic would hide it behind
    // miette's own wrapper type.
    let config = ServerConfig::resolve(&overrides).map_err(miette::Report::new)?;
    let credentials = Credentials::resolve(cli.user.as_deref()).map_err(miette::Report::new)?;

    // Validate the CSV in full before opening a session.
    let table = load_table(&cli.csv).map_err(miette::Report::new)?;

    let client = OmeroHttpClient::connect(&config, &credentials).map_err(miette::Report::new)?;
    let app = App::new(client, config.namespace.clone());
    let result = app
        .annotate(&table, &AnnotateOptions { force: cli.force })
        .map_err(miette::Report::new)?;

    JsonOutput::print_summary(&result).into_diagnostic()?;
    Ok(())
}
