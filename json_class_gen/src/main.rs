//! Binary to infer classes from an example JSON document and generate Rust for them.
//!
//! Usage: `jsonclassgen data/boutique.json --out-dir src/generated`
//!
//! Prints the inferred schema and the materialized root object to stdout.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use json_class_gen::{
    GenerateSettings, JsonClassGenError, PipelineOutput, ShapeMerge, namespace_from_path,
    root_name_from_path, run_pipeline, write_artifacts,
};
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "jsonclassgen",
    about = "Generate Rust structs from an example JSON document",
    version
)]
struct Cli {
    /// Example JSON document
    input: PathBuf,

    /// Directory to write the generated modules into
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Namespace of the generated classes (derived from --out-dir if omitted)
    #[arg(long, value_name = "NS")]
    namespace: Option<String>,

    /// Root class name (derived from the input file name if omitted)
    #[arg(long, value_name = "NAME")]
    root: Option<String>,

    /// Union the shapes of repeated fragments instead of keeping the last one
    #[arg(long)]
    union_shapes: bool,

    /// Fail when the inferred schema has issues instead of warning
    #[arg(long)]
    deny_schema_issues: bool,

    /// Print the inferred schema as JSON
    #[arg(long)]
    emit_schema: bool,

    /// Increase verbosity (-v INFO, -vv DEBUG, -vvv TRACE)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn settings(&self) -> GenerateSettings {
        GenerateSettings {
            shape_merge: if self.union_shapes {
                ShapeMerge::Union
            } else {
                ShapeMerge::Overwrite
            },
            deny_schema_issues: self.deny_schema_issues,
        }
    }
}

/// Initialize tracing on stderr. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let base_filter: String = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        match verbose {
            0 => "warn",
            1 => "warn,json_class_gen=info",
            2 => "warn,json_class_gen=debug",
            _ => "debug,json_class_gen=trace",
        }
        .to_string()
    });
    let filter = EnvFilter::try_new(&base_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

fn run(cli: &Cli) -> Result<(), JsonClassGenError> {
    let root_name: String = match &cli.root {
        Some(root) => root.clone(),
        None => root_name_from_path(&cli.input).ok_or_else(|| {
            JsonClassGenError::GenericError(format!(
                "cannot derive a root class name from '{}'; pass --root",
                cli.input.display()
            ))
        })?,
    };
    let namespace: String = match (&cli.namespace, &cli.out_dir) {
        (Some(namespace), _) => namespace.clone(),
        (None, Some(out_dir)) => namespace_from_path(out_dir),
        (None, None) => String::new(),
    };

    let document_json: String = std::fs::read_to_string(&cli.input)?;
    let document: serde_json::Value = serde_json::from_str(&document_json)?;
    let output: PipelineOutput = run_pipeline(&root_name, &document, &namespace, &cli.settings())?;

    if let Some(out_dir) = &cli.out_dir {
        for path in write_artifacts(out_dir, &namespace, &output.artifacts)? {
            eprintln!("wrote {}", path.display());
        }
    }

    if cli.emit_schema {
        let schema: String = serde_json::to_string_pretty(&output.registry.to_json()?)?;
        println!("{schema}");
    } else {
        print!("{}", output.registry);
    }
    println!("Top object: {}", output.root);
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
