//! Infer classes from an example JSON document, generate Rust structs for
//! them, and materialize the document as a graph of live instances.
//!
//! The pipeline runs four stages over one shared [`SchemaRegistry`]:
//! inference, code generation, loading, and materialization.

mod codegen;
mod error;
mod infer;
mod instance;
mod json_pointer;
mod loader;
mod materialize;
mod paths;
mod registry;
mod relationship;
mod schema;
mod settings;
mod validate;

pub use codegen::{
    Artifact, MOD_FILE_NAME, generate_all, generate_artifact, generate_mod_file,
    generate_to_writer, write_artifacts,
};
pub use error::{JsonClassGenError, SchemaIssue, SchemaIssueKind, SchemaValidationError};
pub use infer::{SchemaInferrer, infer_document};
pub use instance::{EMPTY_DUMP, Instance, RelationIter, index_key, render_value};
pub use json_pointer::JsonPointer;
pub use loader::{LoadedType, Parameters, TypeHandle, TypeLoader};
pub use materialize::{materialize, materialize_document};
pub use paths::{namespace_from_path, root_name_from_path};
pub use registry::SchemaRegistry;
pub use relationship::{Multiplicity, Relationship, StorageShape};
pub use schema::{ArtifactRef, AttributeKind, SchemaClass};
pub use settings::{GenerateSettings, ShapeMerge};
pub use validate::validate_registry;

use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Everything one pipeline run produces.
#[derive(Debug)]
pub struct PipelineOutput {
    /// The frozen registry, with artifact refs and type handles recorded.
    pub registry: SchemaRegistry,
    pub loader: TypeLoader,
    pub artifacts: Vec<Artifact>,
    /// The document materialized as an instance of the root class.
    pub root: Instance,
}

/// Run inference, validation, code generation, loading and materialization
/// over `document`, in that order.
///
/// # Errors
///
/// Returns `JsonClassGenError` from the first failing stage. Validation
/// issues only fail the run when `settings.deny_schema_issues` is set.
pub fn run_pipeline(
    root_name: &str,
    document: &Value,
    namespace: &str,
    settings: &GenerateSettings,
) -> Result<PipelineOutput, JsonClassGenError> {
    let mut registry: SchemaRegistry =
        infer_document(root_name, document, namespace, settings.shape_merge)?;
    registry.freeze();

    if let Err(validation_error) = validate_registry(&registry) {
        if settings.deny_schema_issues {
            return Err(validation_error.into());
        }
        for issue in &validation_error.issues {
            warn!(%issue, "schema issue");
        }
    }

    let artifacts: Vec<Artifact> = generate_all(&mut registry)?;
    let mut loader = TypeLoader::new();
    loader.load_all(&mut registry)?;
    let root: Instance = materialize_document(&registry, document)?;
    info!(
        root = root_name,
        classes = registry.len(),
        "pipeline finished"
    );
    Ok(PipelineOutput {
        registry,
        loader,
        artifacts,
        root,
    })
}

/// Run the pipeline on a JSON file and write the artifacts into `output_dir`.
///
/// The root class is named after the input file, the namespace after the
/// output directory (see [`root_name_from_path`] and [`namespace_from_path`]).
/// Returns the pipeline output and the written file paths.
///
/// # Errors
///
/// Returns `JsonClassGenError` if reading or parsing the input fails, the
/// root name cannot be derived, any pipeline stage fails, or writing fails.
pub fn generate_from_file(
    input_path: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    settings: &GenerateSettings,
) -> Result<(PipelineOutput, Vec<PathBuf>), JsonClassGenError> {
    let input_path: &Path = input_path.as_ref();
    let output_dir: &Path = output_dir.as_ref();
    let root_name: String = root_name_from_path(input_path).ok_or_else(|| {
        JsonClassGenError::GenericError(format!(
            "cannot derive a root class name from '{}'",
            input_path.display()
        ))
    })?;
    let namespace: String = namespace_from_path(output_dir);

    let document_json: String = std::fs::read_to_string(input_path)?;
    let document: Value = serde_json::from_str(&document_json)?;
    let output: PipelineOutput = run_pipeline(&root_name, &document, &namespace, settings)?;
    let written: Vec<PathBuf> = write_artifacts(output_dir, &namespace, &output.artifacts)?;
    Ok((output, written))
}
