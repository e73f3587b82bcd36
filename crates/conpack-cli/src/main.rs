use std::{path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use conpack_core::error::ExportError;
use conpack_core::package::{PackRequest, Packager};
use conpack_core::scaffold::{default_directory, generate_scaffold, ScaffoldSpec};
use conpack_core::verify::{NodeVerifier, Verification, Verifier};
use tracing_subscriber::{fmt, EnvFilter};

const EXIT_MISSING_FACTORY: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "conpack", author, version, about = "Connector packaging and scaffolding toolkit")]
struct Cli {
    /// Sets the log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Prints the full error chain instead of a one-line summary.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bundle a connector source tree and emit its distribution manifest.
    Pack(PackArgs),
    /// Generate a new connector source tree from the built-in templates.
    Scaffold(ScaffoldArgs),
    /// Load a bundled artifact and report on its factory export.
    Inspect {
        #[arg(value_name = "BUNDLE")]
        bundle: PathBuf,
    },
}

#[derive(Args, Debug)]
struct PackArgs {
    /// Connector source root.
    #[arg(long, value_name = "DIR")]
    src: PathBuf,

    /// Connector name (letters, digits, `_`, `-`).
    #[arg(long)]
    name: String,

    /// Connector type token.
    #[arg(long = "type", value_name = "TYPE")]
    connector_type: String,

    /// Semantic version of the connector.
    #[arg(long)]
    version: String,

    /// Entry module, relative to --src.
    #[arg(long, value_name = "PATH")]
    entry: PathBuf,

    /// Optional config module, relative to --src.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Optional instances file: a JSON array or {"instances": [...]}.
    #[arg(long, value_name = "FILE")]
    instances: Option<PathBuf>,

    /// Minify the bundled output.
    #[arg(long)]
    minify: bool,

    /// Output root; artifacts land under <DIR>/<name>/.
    #[arg(long, value_name = "DIR", default_value = "dist")]
    dist: PathBuf,
}

#[derive(Args, Debug)]
struct ScaffoldArgs {
    /// Connector name (e.g. salesforce).
    #[arg(long)]
    name: String,

    /// Initial version.
    #[arg(long, default_value = "1.0.0")]
    version: String,

    /// Connector type; defaults to the connector name.
    #[arg(long = "type", value_name = "TYPE")]
    connector_type: Option<String>,

    /// Target directory; defaults to ./src/<name>-<version>.
    #[arg(long, value_name = "DIR")]
    directory: Option<PathBuf>,

    /// Comma-separated operation verbs.
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "CREATE,GET,UPDATE,DELETE,SEARCH"
    )]
    operations: Vec<String>,

    /// Comma-separated object classes.
    #[arg(
        long = "object-classes",
        value_delimiter = ',',
        default_value = "__ACCOUNT__,__GROUP__"
    )]
    object_classes: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    match run(cli.command).await {
        Ok(code) => code,
        Err(err) => {
            if cli.debug {
                eprintln!("error: {err:?}");
            } else {
                eprintln!("error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).try_init().ok();
}

async fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Pack(args) => handle_pack(args).await,
        Commands::Scaffold(args) => handle_scaffold(args).await,
        Commands::Inspect { bundle } => handle_inspect(bundle).await,
    }
}

async fn handle_pack(args: PackArgs) -> Result<ExitCode> {
    let request = PackRequest {
        src: args.src,
        name: args.name,
        connector_type: args.connector_type,
        version: args.version,
        entry: args.entry,
        config: args.config,
        instances: args.instances,
        minify: args.minify,
    };
    println!(
        "packing connector `{}` (type `{}`)",
        request.name, request.connector_type
    );
    let report = Packager::with_default_toolchain()
        .pack(&request, &args.dist)
        .await?;
    for artifact in &report.artifacts {
        println!("  - {}", artifact.display());
    }
    println!(
        "connector `{}` ready at {}",
        report.manifest.id,
        report.out_dir.display()
    );
    println!("next: start the host with --connectors {}", args.dist.display());
    Ok(ExitCode::SUCCESS)
}

async fn handle_scaffold(args: ScaffoldArgs) -> Result<ExitCode> {
    let connector_type = args.connector_type.unwrap_or_else(|| args.name.clone());
    let directory = args
        .directory
        .unwrap_or_else(|| default_directory(&args.name, &args.version));
    let spec = ScaffoldSpec {
        name: args.name,
        version: args.version,
        connector_type,
        directory,
        operations: args.operations,
        object_classes: args.object_classes,
    };
    let written = generate_scaffold(&spec).await?;
    for path in &written {
        println!("created {}", path.display());
    }
    println!(
        "next: implement the TODO sections, then run `conpack pack --src {} --name {} --type {} --version {} --entry ./index.ts --config ./config.ts`",
        spec.directory.display(),
        spec.name,
        spec.connector_type,
        spec.version
    );
    Ok(ExitCode::SUCCESS)
}

async fn handle_inspect(bundle: PathBuf) -> Result<ExitCode> {
    match NodeVerifier::new().verify(&bundle).await {
        Ok(Verification::Verified) => {
            println!("{}: callable factory export found", bundle.display());
            Ok(ExitCode::SUCCESS)
        }
        Ok(Verification::Inconclusive) => {
            eprintln!(
                "{}: could not be loaded for inspection (see warnings above)",
                bundle.display()
            );
            Ok(ExitCode::FAILURE)
        }
        Err(ExportError::MissingFactoryExport { path }) => {
            eprintln!("{}: no callable factory export", path.display());
            Ok(ExitCode::from(EXIT_MISSING_FACTORY))
        }
    }
}
