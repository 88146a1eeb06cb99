//! Settings for inference and code generation.

/// How a repeated visit to the same class name combines with the earlier one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShapeMerge {
    /// The later visit's attributes and relationships replace the earlier ones,
    /// so fields seen only in earlier fragments are lost.
    #[default]
    Overwrite,
    /// Attributes and relationships are unioned in first-seen order. A `null`
    /// attribute takes the kind of a later non-null value; any other kind
    /// change is a `SchemaConflict`.
    Union,
}

/// Settings that control the pipeline.
#[derive(Debug, Clone, Default)]
pub struct GenerateSettings {
    /// How repeated fragments of the same class are combined during inference.
    ///
    /// **Default: `ShapeMerge::Overwrite`.**
    pub shape_merge: ShapeMerge,

    /// When true, fail before code generation if validating the inferred
    /// registry reports any issue. Collects all issues and returns them together.
    ///
    /// **Default: false (disabled).** Issues are then logged as warnings and
    /// generation proceeds.
    pub deny_schema_issues: bool,
}
