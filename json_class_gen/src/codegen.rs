use crate::error::JsonClassGenError;
use crate::registry::SchemaRegistry;
use crate::relationship::{Relationship, StorageShape};
use crate::schema::{ArtifactRef, AttributeKind, SchemaClass};
use heck::{ToSnakeCase, ToUpperCamelCase};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Strict and reserved Rust keywords that cannot be used as plain identifiers.
const RUST_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// Keywords that are not allowed as raw identifiers either.
const NON_RAW_KEYWORDS: &[&str] = &["crate", "self", "super", "Self"];

/// Type names a generated struct must not shadow: the prelude types and
/// traits, plus the names generated modules use unqualified.
const RESERVED_TYPE_NAMES: &[&str] = &[
    "AsMut", "AsRef", "Box", "Clone", "Copy", "Default", "DoubleEndedIterator", "Drop", "Eq",
    "Err", "ExactSizeIterator", "Extend", "Fn", "FnMut", "FnOnce", "From", "FromIterator",
    "IndexMap", "Into", "IntoIterator", "Iterator", "None", "Ok", "Option", "Ord", "PartialEq",
    "PartialOrd", "Result", "Self", "Send", "Sized", "Some", "String", "Sync", "ToOwned",
    "ToString", "TryFrom", "TryInto", "Unpin", "Vec",
];

/// Name of the module file declaring every generated class.
pub const MOD_FILE_NAME: &str = "mod.rs";

/// Generated source for one class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub class_name: String,
    pub type_name: String,
    pub module_name: String,
    pub module_path: String,
    pub file_name: String,
    pub source: String,
}

impl Artifact {
    #[must_use]
    pub fn artifact_ref(&self) -> ArtifactRef {
        ArtifactRef {
            module_path: self.module_path.clone(),
            file_name: self.file_name.clone(),
        }
    }
}

/// Convert a class name to a Rust type identifier (`UpperCamelCase`).
/// Examples: `"ligne_commande"` -> `"LigneCommande"`, `"option"` -> `"OptionClass"`.
pub(crate) fn type_name(class_name: &str) -> String {
    let camel: String = class_name.to_upper_camel_case();
    if camel.is_empty() || camel.starts_with(|c: char| c.is_ascii_digit()) {
        format!("C{camel}")
    } else if RESERVED_TYPE_NAMES.contains(&camel.as_str()) {
        format!("{camel}Class")
    } else {
        camel
    }
}

/// Convert a member or class name to a Rust field/module identifier
/// (`snake_case`), escaping keywords as raw identifiers.
/// Examples: `"prixUnitaire"` -> `"prix_unitaire"`, `"type"` -> `"r#type"`.
pub(crate) fn field_ident(name: &str) -> String {
    let snake: String = name.to_snake_case();
    if snake.is_empty() || snake.starts_with(|c: char| c.is_ascii_digit()) {
        format!("f_{snake}")
    } else if NON_RAW_KEYWORDS.contains(&snake.as_str()) {
        format!("{snake}_")
    } else if RUST_KEYWORDS.contains(&snake.as_str()) {
        format!("r#{snake}")
    } else {
        snake
    }
}

/// The identifier without its raw prefix, for use inside other names.
fn bare_ident(ident: &str) -> &str {
    ident.strip_prefix("r#").unwrap_or(ident)
}

pub(crate) fn module_name(class_name: &str) -> String {
    field_ident(class_name)
}

fn module_path(namespace: &str, module: &str) -> String {
    if namespace.is_empty() {
        module.to_string()
    } else {
        format!("{namespace}::{module}")
    }
}

/// Escape a JSON name for use inside a generated `format!` string literal.
fn escape_format_literal(text: &str) -> String {
    let mut escaped: String = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '{' => escaped.push_str("{{"),
            '}' => escaped.push_str("}}"),
            other => escaped.extend(other.escape_debug()),
        }
    }
    escaped
}

/// Rust type of the field storing a relationship.
fn storage_type(relationship: &Relationship) -> String {
    let target: String = type_name(relationship.target_class());
    match relationship.storage_shape() {
        StorageShape::Single => format!("Option<Box<{target}>>"),
        StorageShape::Sequence => format!("Vec<{target}>"),
        StorageShape::Indexed { .. } => format!("IndexMap<String, {target}>"),
    }
}

/// Expression building the empty storage of a relationship.
fn storage_init(relationship: &Relationship) -> &'static str {
    match relationship.storage_shape() {
        StorageShape::Single => "None",
        StorageShape::Sequence => "Vec::new()",
        StorageShape::Indexed { .. } => "IndexMap::new()",
    }
}

/// Kind of the index field on the target class, if the target declares it.
fn index_field_kind(
    registry: &SchemaRegistry,
    relationship: &Relationship,
) -> Option<AttributeKind> {
    let index_field: &str = relationship.index_field()?;
    registry
        .get(relationship.target_class())
        .and_then(|target| target.attribute_kind(index_field))
}

/// Expression computing the mapping key of `item` from its index field.
/// Absent values map to the empty key, as does an index field the target
/// class does not declare.
fn index_key_expr(item: &str, index_field: &str, kind: Option<AttributeKind>) -> String {
    let field: String = field_ident(index_field);
    match kind {
        Some(AttributeKind::String) => format!("{item}.{field}.clone().unwrap_or_default()"),
        Some(AttributeKind::Number | AttributeKind::Boolean) => {
            format!("{item}.{field}.map(|value| value.to_string()).unwrap_or_default()")
        }
        Some(AttributeKind::Any) => {
            format!("{item}.{field}.as_ref().map(render_value).unwrap_or_default()")
        }
        None => "String::new()".to_string(),
    }
}

/// True if the artifact needs the `render_value` helper.
fn needs_render_value(class: &SchemaClass, registry: &SchemaRegistry) -> bool {
    class
        .attributes()
        .iter()
        .any(|(_, kind)| *kind == AttributeKind::Any)
        || class
            .relationships()
            .iter()
            .any(|r| index_field_kind(registry, r) == Some(AttributeKind::Any))
}

fn emit_header<W: Write>(class: &SchemaClass, writer: &mut W) -> std::io::Result<()> {
    writeln!(
        writer,
        "//! Generated by json-class-gen. Do not edit manually."
    )?;
    writeln!(writer, "//!")?;
    writeln!(writer, "//! Class `{}`.", class.fully_qualified_name())?;
    writeln!(writer)?;
    Ok(())
}

/// Emit `use` lines: crates first, then one import per distinct related class.
fn emit_imports<W: Write>(class: &SchemaClass, writer: &mut W) -> std::io::Result<()> {
    if class.relationships().iter().any(Relationship::is_indexed) {
        writeln!(writer, "use indexmap::IndexMap;")?;
    }
    writeln!(writer, "use std::fmt;")?;

    let mut targets: Vec<&str> = Vec::new();
    for relationship in class.relationships() {
        let target: &str = relationship.target_class();
        if target != class.name() && !targets.contains(&target) {
            targets.push(target);
        }
    }
    if !targets.is_empty() {
        writeln!(writer)?;
        for target in targets {
            writeln!(
                writer,
                "use super::{}::{};",
                module_name(target),
                type_name(target)
            )?;
        }
    }
    writeln!(writer)?;
    Ok(())
}

/// Emit the struct: one optional field per attribute, one storage field per relationship.
fn emit_struct<W: Write>(class: &SchemaClass, writer: &mut W) -> std::io::Result<()> {
    writeln!(writer, "#[derive(Debug, Clone, PartialEq)]")?;
    writeln!(writer, "pub struct {} {{", type_name(class.name()))?;
    for (name, kind) in class.attributes() {
        writeln!(
            writer,
            "    pub {}: Option<{}>,",
            field_ident(name),
            kind.rust_type()
        )?;
    }
    for relationship in class.relationships() {
        writeln!(
            writer,
            "    pub {}: {},",
            field_ident(&relationship.storage_key()),
            storage_type(relationship)
        )?;
    }
    writeln!(writer, "}}")?;
    writeln!(writer)?;
    Ok(())
}

/// Emit `new`: one parameter per attribute in insertion order, empty relationships.
fn emit_constructor<W: Write>(class: &SchemaClass, writer: &mut W) -> std::io::Result<()> {
    let parameters: Vec<String> = class
        .attributes()
        .iter()
        .map(|(name, kind)| format!("{}: Option<{}>", field_ident(name), kind.rust_type()))
        .collect();
    writeln!(
        writer,
        "    /// Creates a `{}` from its attribute values.",
        class.name()
    )?;
    writeln!(writer, "    #[must_use]")?;
    writeln!(writer, "    pub fn new({}) -> Self {{", parameters.join(", "))?;
    writeln!(writer, "        Self {{")?;
    for (name, _) in class.attributes() {
        writeln!(writer, "            {},", field_ident(name))?;
    }
    for relationship in class.relationships() {
        writeln!(
            writer,
            "            {}: {},",
            field_ident(&relationship.storage_key()),
            storage_init(relationship)
        )?;
    }
    writeln!(writer, "        }}")?;
    writeln!(writer, "    }}")?;
    Ok(())
}

fn emit_single_accessors<W: Write>(
    relationship: &Relationship,
    writer: &mut W,
) -> std::io::Result<()> {
    let field: String = field_ident(&relationship.storage_key());
    let suffix: String = bare_ident(&field_ident(relationship.name())).to_string();
    let target: String = type_name(relationship.target_class());
    let item: String = format!("a_{suffix}");

    writeln!(writer)?;
    writeln!(
        writer,
        "    pub fn add_{suffix}(&mut self, {item}: {target}) {{"
    )?;
    writeln!(writer, "        self.{field} = Some(Box::new({item}));")?;
    writeln!(writer, "    }}")?;
    writeln!(writer)?;
    writeln!(
        writer,
        "    pub fn remove_{suffix}(&mut self, {item}: &{target}) {{"
    )?;
    writeln!(writer, "        if self.{field}.as_deref() == Some({item}) {{")?;
    writeln!(writer, "            self.{field} = None;")?;
    writeln!(writer, "        }}")?;
    writeln!(writer, "    }}")?;
    writeln!(writer)?;
    writeln!(
        writer,
        "    pub fn iter_{suffix}(&self) -> impl Iterator<Item = &{target}> + '_ {{"
    )?;
    writeln!(writer, "        self.{field}.as_deref().into_iter()")?;
    writeln!(writer, "    }}")?;
    Ok(())
}

fn emit_sequence_accessors<W: Write>(
    relationship: &Relationship,
    writer: &mut W,
) -> std::io::Result<()> {
    let field: String = field_ident(&relationship.storage_key());
    let suffix: String = bare_ident(&field_ident(relationship.name())).to_string();
    let target: String = type_name(relationship.target_class());
    let item: String = format!("a_{suffix}");

    writeln!(writer)?;
    writeln!(
        writer,
        "    pub fn add_{suffix}(&mut self, {item}: {target}) {{"
    )?;
    writeln!(writer, "        self.{field}.push({item});")?;
    writeln!(writer, "    }}")?;
    writeln!(writer)?;
    writeln!(
        writer,
        "    pub fn remove_{suffix}(&mut self, {item}: &{target}) {{"
    )?;
    writeln!(
        writer,
        "        if let Some(position) = self.{field}.iter().position(|item| item == {item}) {{"
    )?;
    writeln!(writer, "            self.{field}.remove(position);")?;
    writeln!(writer, "        }}")?;
    writeln!(writer, "    }}")?;
    writeln!(writer)?;
    writeln!(
        writer,
        "    pub fn iter_{suffix}(&self) -> impl Iterator<Item = &{target}> + '_ {{"
    )?;
    writeln!(writer, "        self.{field}.iter()")?;
    writeln!(writer, "    }}")?;
    Ok(())
}

fn emit_indexed_accessors<W: Write>(
    relationship: &Relationship,
    index_field: &str,
    index_kind: Option<AttributeKind>,
    writer: &mut W,
) -> std::io::Result<()> {
    let field: String = field_ident(&relationship.storage_key());
    let suffix: String = bare_ident(&field_ident(relationship.name())).to_string();
    let index_suffix: String = bare_ident(&field_ident(index_field)).to_string();
    let target: String = type_name(relationship.target_class());
    let item: String = format!("a_{suffix}");
    // Without a declared index field the key ignores the item entirely.
    let removed: String = if index_kind.is_some() {
        item.clone()
    } else {
        format!("_{item}")
    };
    let add_key: String = index_key_expr(&item, index_field, index_kind);
    let remove_key: String = index_key_expr(&removed, index_field, index_kind);

    writeln!(writer)?;
    writeln!(
        writer,
        "    pub fn add_{suffix}(&mut self, {item}: {target}) {{"
    )?;
    writeln!(writer, "        let key: String = {add_key};")?;
    writeln!(writer, "        self.{field}.insert(key, {item});")?;
    writeln!(writer, "    }}")?;
    writeln!(writer)?;
    writeln!(
        writer,
        "    pub fn remove_{suffix}(&mut self, {removed}: &{target}) {{"
    )?;
    writeln!(writer, "        let key: String = {remove_key};")?;
    writeln!(writer, "        self.{field}.shift_remove(&key);")?;
    writeln!(writer, "    }}")?;
    writeln!(writer)?;
    writeln!(
        writer,
        "    pub fn iter_{suffix}(&self) -> impl Iterator<Item = &{target}> + '_ {{"
    )?;
    writeln!(writer, "        self.{field}.values()")?;
    writeln!(writer, "    }}")?;
    writeln!(writer)?;
    writeln!(writer, "    #[must_use]")?;
    writeln!(
        writer,
        "    pub fn get_{suffix}_with_{index_suffix}(&self, key: &str) -> Option<&{target}> {{"
    )?;
    writeln!(writer, "        self.{field}.get(key)")?;
    writeln!(writer, "    }}")?;
    Ok(())
}

/// Emit the accessors of one relationship, chosen by its storage shape.
fn emit_relationship_accessors<W: Write>(
    relationship: &Relationship,
    registry: &SchemaRegistry,
    writer: &mut W,
) -> std::io::Result<()> {
    match relationship.storage_shape() {
        StorageShape::Single => emit_single_accessors(relationship, writer),
        StorageShape::Sequence => emit_sequence_accessors(relationship, writer),
        StorageShape::Indexed { index_field } => emit_indexed_accessors(
            relationship,
            index_field,
            index_field_kind(registry, relationship),
            writer,
        ),
    }
}

/// Emit `impl fmt::Display`, the textual dump of an instance.
fn emit_display<W: Write>(class: &SchemaClass, writer: &mut W) -> std::io::Result<()> {
    writeln!(writer)?;
    writeln!(
        writer,
        "impl fmt::Display for {} {{",
        type_name(class.name())
    )?;
    writeln!(
        writer,
        "    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {{"
    )?;
    if class.is_empty() {
        writeln!(writer, "        let parts: Vec<String> = Vec::new();")?;
    } else {
        writeln!(writer, "        let mut parts: Vec<String> = Vec::new();")?;
    }
    for (name, kind) in class.attributes() {
        let field: String = field_ident(name);
        let label: String = escape_format_literal(name);
        if *kind == AttributeKind::Any {
            writeln!(
                writer,
                "        if let Some(value) = self.{field}.as_ref().filter(|value| !value.is_null()) {{"
            )?;
            writeln!(
                writer,
                "            parts.push(format!(\"{label}: {{}}\", render_value(value)));"
            )?;
        } else {
            writeln!(writer, "        if let Some(value) = &self.{field} {{")?;
            writeln!(writer, "            parts.push(format!(\"{label}: {{value}}\"));")?;
        }
        writeln!(writer, "        }}")?;
    }
    for relationship in class.relationships() {
        let field: String = field_ident(&relationship.storage_key());
        let label: String = escape_format_literal(relationship.name());
        let elements: &str = match relationship.storage_shape() {
            StorageShape::Single | StorageShape::Sequence => "iter()",
            StorageShape::Indexed { .. } => "values()",
        };
        writeln!(
            writer,
            "        let items: Vec<String> = self.{field}.{elements}.map(|item| format!(\"{{{{{{item}}}}}}\")).collect();"
        )?;
        writeln!(writer, "        if !items.is_empty() {{")?;
        writeln!(
            writer,
            "            parts.push(format!(\"{label}: [{{}}]\", items.join(\", \")));"
        )?;
        writeln!(writer, "        }}")?;
    }
    writeln!(writer, "        if parts.is_empty() {{")?;
    writeln!(
        writer,
        "            return f.write_str(\"Empty JSONClass Object\");"
    )?;
    writeln!(writer, "        }}")?;
    writeln!(writer, "        f.write_str(&parts.join(\", \"))")?;
    writeln!(writer, "    }}")?;
    writeln!(writer, "}}")?;
    Ok(())
}

/// Emit the helper rendering untyped values the same way the dump does.
fn emit_render_value<W: Write>(writer: &mut W) -> std::io::Result<()> {
    writeln!(writer)?;
    writeln!(writer, "fn render_value(value: &serde_json::Value) -> String {{")?;
    writeln!(writer, "    match value {{")?;
    writeln!(
        writer,
        "        serde_json::Value::String(text) => text.clone(),"
    )?;
    writeln!(writer, "        serde_json::Value::Number(number) => number")?;
    writeln!(writer, "            .as_f64()")?;
    writeln!(
        writer,
        "            .map_or_else(|| number.to_string(), |float| float.to_string()),"
    )?;
    writeln!(writer, "        other => other.to_string(),")?;
    writeln!(writer, "    }}")?;
    writeln!(writer, "}}")?;
    Ok(())
}

/// Generate the Rust source of one class and write it to `writer`.
///
/// The registry supplies the attributes of related classes (for index keys).
/// Output depends only on insertion order, so repeated calls are byte-identical.
///
/// # Errors
///
/// Returns `JsonClassGenError` if writing to the writer fails.
pub fn generate_to_writer<W: Write>(
    class: &SchemaClass,
    registry: &SchemaRegistry,
    writer: &mut W,
) -> Result<(), JsonClassGenError> {
    emit_header(class, writer)?;
    emit_imports(class, writer)?;
    emit_struct(class, writer)?;

    writeln!(writer, "impl {} {{", type_name(class.name()))?;
    emit_constructor(class, writer)?;
    for relationship in class.relationships() {
        emit_relationship_accessors(relationship, registry, writer)?;
    }
    writeln!(writer, "}}")?;

    emit_display(class, writer)?;
    if needs_render_value(class, registry) {
        emit_render_value(writer)?;
    }
    Ok(())
}

/// Generate the artifact of one class.
///
/// # Errors
///
/// Returns `JsonClassGenError` if the generated source cannot be assembled.
pub fn generate_artifact(
    class: &SchemaClass,
    registry: &SchemaRegistry,
) -> Result<Artifact, JsonClassGenError> {
    let mut output: Vec<u8> = Vec::new();
    generate_to_writer(class, registry, &mut output)?;
    let source: String = String::from_utf8(output)
        .map_err(|e| JsonClassGenError::GenericError(format!("generated source: {e}")))?;
    let module: String = module_name(class.name());
    let artifact = Artifact {
        class_name: class.name().to_string(),
        type_name: type_name(class.name()),
        module_path: module_path(class.namespace(), &module),
        file_name: format!("{}.rs", bare_ident(&module)),
        module_name: module,
        source,
    };
    debug!(
        class_name = class.name(),
        file = %artifact.file_name,
        bytes = artifact.source.len(),
        "generated artifact"
    );
    Ok(artifact)
}

/// Freeze the registry, generate every class in registry order, and record
/// each artifact ref on its class.
///
/// # Errors
///
/// Returns `JsonClassGenError` if generating any class fails.
pub fn generate_all(registry: &mut SchemaRegistry) -> Result<Vec<Artifact>, JsonClassGenError> {
    registry.freeze();
    let artifacts: Vec<Artifact> = registry
        .iter()
        .map(|class| generate_artifact(class, registry))
        .collect::<Result<_, _>>()?;
    for artifact in &artifacts {
        registry.record_artifact(&artifact.class_name, artifact.artifact_ref())?;
    }
    info!(artifacts = artifacts.len(), "code generation finished");
    Ok(artifacts)
}

/// Write the module file declaring and re-exporting every artifact.
///
/// # Errors
///
/// Returns `JsonClassGenError` if writing to the writer fails.
pub fn generate_mod_file<W: Write>(
    namespace: &str,
    artifacts: &[Artifact],
    writer: &mut W,
) -> Result<(), JsonClassGenError> {
    writeln!(
        writer,
        "//! Generated by json-class-gen. Do not edit manually."
    )?;
    writeln!(writer, "//!")?;
    writeln!(writer, "//! Namespace `{namespace}`.")?;
    writeln!(writer)?;
    for artifact in artifacts {
        writeln!(writer, "pub mod {};", artifact.module_name)?;
    }
    writeln!(writer)?;
    for artifact in artifacts {
        writeln!(
            writer,
            "pub use {}::{};",
            artifact.module_name, artifact.type_name
        )?;
    }
    Ok(())
}

/// Write every artifact and the module file into `output_dir`, creating it
/// if needed. Returns the written paths, module file last.
///
/// # Errors
///
/// Returns `JsonClassGenError` if the directory or any file cannot be written.
pub fn write_artifacts(
    output_dir: impl AsRef<Path>,
    namespace: &str,
    artifacts: &[Artifact],
) -> Result<Vec<PathBuf>, JsonClassGenError> {
    let output_dir: &Path = output_dir.as_ref();
    std::fs::create_dir_all(output_dir)?;
    let mut written: Vec<PathBuf> = Vec::with_capacity(artifacts.len() + 1);
    for artifact in artifacts {
        let path: PathBuf = output_dir.join(&artifact.file_name);
        std::fs::write(&path, &artifact.source)?;
        written.push(path);
    }
    let mod_path: PathBuf = output_dir.join(MOD_FILE_NAME);
    let mut mod_file: std::fs::File = std::fs::File::create(&mod_path)?;
    generate_mod_file(namespace, artifacts, &mut mod_file)?;
    written.push(mod_path);
    info!(dir = %output_dir.display(), files = written.len(), "artifacts written");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infer::infer_document;
    use crate::settings::ShapeMerge;
    use serde_json::json;

    fn commande_registry() -> SchemaRegistry {
        let document = json!({
            "id": "cmd1",
            "total": 12.5,
            "payee": true,
            "note": null,
            "client": { "id": "c1" },
            "table_ligne_commandes": {
                "p1": { "id_produit": "p1", "quantite": 2 }
            },
            "liste_paiements": [ { "montant": 12.5 } ]
        });
        infer_document("commande", &document, "generated", ShapeMerge::Overwrite)
            .expect("inference should succeed")
    }

    fn generate(registry: &SchemaRegistry, class_name: &str) -> String {
        let class = registry.require(class_name).expect("class exists");
        let mut output: Vec<u8> = Vec::new();
        generate_to_writer(class, registry, &mut output)
            .expect("generate_to_writer should succeed");
        String::from_utf8(output).expect("output should be valid UTF-8")
    }

    #[test]
    fn type_name_is_upper_camel_case() {
        assert_eq!("LigneCommande", type_name("ligne_commande"));
        assert_eq!("Boutique", type_name("boutique"));
        assert_eq!("SelfClass", type_name("self"));
        assert_eq!("OptionClass", type_name("option"));
        assert_eq!("StringClass", type_name("string"));
        assert_eq!("VecClass", type_name("vec"));
        assert_eq!("ResultClass", type_name("result"));
        assert_eq!("BoxClass", type_name("box"));
        assert_eq!("IndexMapClass", type_name("index_map"));
        assert_eq!("C2emeEtage", type_name("2eme_etage"));
    }

    #[test]
    fn field_ident_is_snake_case_and_escapes_keywords() {
        assert_eq!("prix_unitaire", field_ident("prixUnitaire"));
        assert_eq!("id_produit", field_ident("id_produit"));
        assert_eq!("r#type", field_ident("type"));
        assert_eq!("self_", field_ident("self"));
        assert_eq!("f_1er", field_ident("1er"));
        assert_eq!("foo_bar", field_ident("foo-bar"));
    }

    #[test]
    fn escape_format_literal_doubles_braces_and_escapes_quotes() {
        assert_eq!("a{{b}}", escape_format_literal("a{b}"));
        assert_eq!("say \\\"hi\\\"", escape_format_literal("say \"hi\""));
    }

    const COMMANDE_RS: &str = r##"//! Generated by json-class-gen. Do not edit manually.
//!
//! Class `generated::commande`.

use indexmap::IndexMap;
use std::fmt;

use super::client::Client;
use super::ligne_commande::LigneCommande;
use super::paiement::Paiement;

#[derive(Debug, Clone, PartialEq)]
pub struct Commande {
    pub id: Option<String>,
    pub total: Option<f64>,
    pub payee: Option<bool>,
    pub note: Option<serde_json::Value>,
    pub client: Option<Box<Client>>,
    pub table_ligne_commandes: IndexMap<String, LigneCommande>,
    pub liste_paiements: Vec<Paiement>,
}

impl Commande {
    /// Creates a `commande` from its attribute values.
    #[must_use]
    pub fn new(id: Option<String>, total: Option<f64>, payee: Option<bool>, note: Option<serde_json::Value>) -> Self {
        Self {
            id,
            total,
            payee,
            note,
            client: None,
            table_ligne_commandes: IndexMap::new(),
            liste_paiements: Vec::new(),
        }
    }

    pub fn add_client(&mut self, a_client: Client) {
        self.client = Some(Box::new(a_client));
    }

    pub fn remove_client(&mut self, a_client: &Client) {
        if self.client.as_deref() == Some(a_client) {
            self.client = None;
        }
    }

    pub fn iter_client(&self) -> impl Iterator<Item = &Client> + '_ {
        self.client.as_deref().into_iter()
    }

    pub fn add_ligne_commande(&mut self, a_ligne_commande: LigneCommande) {
        let key: String = a_ligne_commande.id_produit.clone().unwrap_or_default();
        self.table_ligne_commandes.insert(key, a_ligne_commande);
    }

    pub fn remove_ligne_commande(&mut self, a_ligne_commande: &LigneCommande) {
        let key: String = a_ligne_commande.id_produit.clone().unwrap_or_default();
        self.table_ligne_commandes.shift_remove(&key);
    }

    pub fn iter_ligne_commande(&self) -> impl Iterator<Item = &LigneCommande> + '_ {
        self.table_ligne_commandes.values()
    }

    #[must_use]
    pub fn get_ligne_commande_with_id_produit(&self, key: &str) -> Option<&LigneCommande> {
        self.table_ligne_commandes.get(key)
    }

    pub fn add_paiement(&mut self, a_paiement: Paiement) {
        self.liste_paiements.push(a_paiement);
    }

    pub fn remove_paiement(&mut self, a_paiement: &Paiement) {
        if let Some(position) = self.liste_paiements.iter().position(|item| item == a_paiement) {
            self.liste_paiements.remove(position);
        }
    }

    pub fn iter_paiement(&self) -> impl Iterator<Item = &Paiement> + '_ {
        self.liste_paiements.iter()
    }
}

impl fmt::Display for Commande {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if let Some(value) = &self.id {
            parts.push(format!("id: {value}"));
        }
        if let Some(value) = &self.total {
            parts.push(format!("total: {value}"));
        }
        if let Some(value) = &self.payee {
            parts.push(format!("payee: {value}"));
        }
        if let Some(value) = self.note.as_ref().filter(|value| !value.is_null()) {
            parts.push(format!("note: {}", render_value(value)));
        }
        let items: Vec<String> = self.client.iter().map(|item| format!("{{{item}}}")).collect();
        if !items.is_empty() {
            parts.push(format!("client: [{}]", items.join(", ")));
        }
        let items: Vec<String> = self.table_ligne_commandes.values().map(|item| format!("{{{item}}}")).collect();
        if !items.is_empty() {
            parts.push(format!("ligne_commande: [{}]", items.join(", ")));
        }
        let items: Vec<String> = self.liste_paiements.iter().map(|item| format!("{{{item}}}")).collect();
        if !items.is_empty() {
            parts.push(format!("paiement: [{}]", items.join(", ")));
        }
        if parts.is_empty() {
            return f.write_str("Empty JSONClass Object");
        }
        f.write_str(&parts.join(", "))
    }
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        serde_json::Value::Number(number) => number
            .as_f64()
            .map_or_else(|| number.to_string(), |float| float.to_string()),
        other => other.to_string(),
    }
}
"##;

    #[test]
    fn generate_class_with_every_relationship_shape() {
        let registry = commande_registry();
        let expected: &str = COMMANDE_RS;

        let actual: String = generate(&registry, "commande");
        assert_eq!(expected, actual, "expected output to match exactly");
    }

    #[test]
    fn generate_leaf_class_without_relationships() {
        let registry = commande_registry();
        let expected: &str = r##"//! Generated by json-class-gen. Do not edit manually.
//!
//! Class `generated::paiement`.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Paiement {
    pub montant: Option<f64>,
}

impl Paiement {
    /// Creates a `paiement` from its attribute values.
    #[must_use]
    pub fn new(montant: Option<f64>) -> Self {
        Self {
            montant,
        }
    }
}

impl fmt::Display for Paiement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if let Some(value) = &self.montant {
            parts.push(format!("montant: {value}"));
        }
        if parts.is_empty() {
            return f.write_str("Empty JSONClass Object");
        }
        f.write_str(&parts.join(", "))
    }
}
"##;

        let actual: String = generate(&registry, "paiement");
        assert_eq!(expected, actual, "expected output to match exactly");
    }

    #[test]
    fn indexed_relationship_without_declared_index_field_uses_empty_key() {
        let document = json!({ "table_extras": { "x": { "valeur": 1 } } });
        let registry = infer_document("menu", &document, "", ShapeMerge::Overwrite)
            .expect("inference should succeed");
        let actual: String = generate(&registry, "menu");

        assert!(actual.contains(
            "    pub fn add_extra(&mut self, a_extra: Extra) {\n        let key: String = String::new();\n"
        ));
        assert!(actual.contains(
            "    pub fn remove_extra(&mut self, _a_extra: &Extra) {\n        let key: String = String::new();\n"
        ));
        assert!(actual.contains(
            "    pub fn get_extra_with_id_extra(&self, key: &str) -> Option<&Extra> {\n"
        ));
        assert!(actual.contains("//! Class `menu`."));
    }

    #[test]
    fn numeric_index_field_is_rendered_to_a_key() {
        let document = json!({ "table_lignes": { "1": { "id": 1, "qte": 2 } } });
        let registry = infer_document("commande", &document, "", ShapeMerge::Overwrite)
            .expect("inference should succeed");
        let actual: String = generate(&registry, "commande");
        assert!(actual.contains(
            "        let key: String = a_ligne.id.map(|value| value.to_string()).unwrap_or_default();\n"
        ));
    }

    #[test]
    fn class_named_after_a_prelude_type_does_not_shadow_it() {
        let document = json!({
            "nom": "x",
            "table_options": { "o1": { "id_option": "o1", "libelle": "verre" } }
        });
        let registry = infer_document("menu", &document, "", ShapeMerge::Overwrite)
            .expect("inference should succeed");

        let menu: String = generate(&registry, "menu");
        assert!(menu.contains("use super::option::OptionClass;\n"));
        assert!(menu.contains("    pub nom: Option<String>,\n"));
        assert!(menu.contains("    pub table_options: IndexMap<String, OptionClass>,\n"));
        assert!(menu.contains(
            "    pub fn get_option_with_id_option(&self, key: &str) -> Option<&OptionClass> {\n"
        ));

        let option: String = generate(&registry, "option");
        assert!(option.contains("pub struct OptionClass {\n"));
        assert!(option.contains("    pub id_option: Option<String>,\n"));
        assert!(option.contains("impl fmt::Display for OptionClass {\n"));
    }

    #[test]
    fn keyword_and_camel_case_names_become_valid_identifiers() {
        let document = json!({ "type": "meuble", "prixUnitaire": 10.0 });
        let registry = infer_document("produit", &document, "", ShapeMerge::Overwrite)
            .expect("inference should succeed");
        let actual: String = generate(&registry, "produit");
        assert!(actual.contains("    pub r#type: Option<String>,\n"));
        assert!(actual.contains("    pub prix_unitaire: Option<f64>,\n"));
        assert!(actual.contains(
            "    pub fn new(r#type: Option<String>, prix_unitaire: Option<f64>) -> Self {\n"
        ));
        assert!(actual.contains("            parts.push(format!(\"prixUnitaire: {value}\"));\n"));
    }

    #[test]
    fn empty_class_dump_has_no_mutable_parts() {
        let registry = infer_document("vide", &json!({}), "", ShapeMerge::Overwrite)
            .expect("inference should succeed");
        let actual: String = generate(&registry, "vide");
        assert!(actual.contains("    pub fn new() -> Self {\n        Self {\n        }\n    }\n"));
        assert!(actual.contains("        let parts: Vec<String> = Vec::new();\n"));
    }

    #[test]
    fn generation_is_stable() {
        let registry = commande_registry();
        for class_name in registry.class_names() {
            let first: String = generate(&registry, class_name);
            let second: String = generate(&registry, class_name);
            assert_eq!(first, second, "generation of {class_name} must be deterministic");
        }
    }

    #[test]
    fn generate_all_freezes_and_records_artifact_refs() {
        let mut registry = commande_registry();
        let artifacts: Vec<Artifact> = generate_all(&mut registry).expect("generation succeeds");
        assert!(registry.is_frozen());

        let names: Vec<&str> = artifacts.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(
            vec!["commande.rs", "client.rs", "ligne_commande.rs", "paiement.rs"],
            names
        );
        let ligne = registry.require("ligne_commande").expect("class exists");
        let expected = ArtifactRef {
            module_path: "generated::ligne_commande".to_string(),
            file_name: "ligne_commande.rs".to_string(),
        };
        assert_eq!(Some(&expected), ligne.generated_artifact());
    }

    #[test]
    fn mod_file_declares_and_reexports_every_module() {
        let mut registry = commande_registry();
        let artifacts: Vec<Artifact> = generate_all(&mut registry).expect("generation succeeds");
        let mut output: Vec<u8> = Vec::new();
        generate_mod_file("generated", &artifacts, &mut output).expect("mod file is written");
        let expected: &str = "//! Generated by json-class-gen. Do not edit manually.
//!
//! Namespace `generated`.

pub mod commande;
pub mod client;
pub mod ligne_commande;
pub mod paiement;

pub use commande::Commande;
pub use client::Client;
pub use ligne_commande::LigneCommande;
pub use paiement::Paiement;
";
        let actual: String = String::from_utf8(output).expect("output should be valid UTF-8");
        assert_eq!(expected, actual);
    }
}
