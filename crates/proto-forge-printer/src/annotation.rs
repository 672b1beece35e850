use serde::Serialize;

/// How generated code relates to the element it was produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Semantic {
    /// The code writes to the element.
    Set,
    /// The code is another name for the element.
    Alias,
}

/// Where an annotated range of output came from: a source file and the
/// descriptor path of the element inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AnnotationTarget {
    pub origin: String,
    pub path: Vec<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic: Option<Semantic>,
}

impl AnnotationTarget {
    pub fn new(origin: impl Into<String>, path: Vec<i32>) -> Self {
        Self {
            origin: origin.into(),
            path,
            semantic: None,
        }
    }

    pub fn with_semantic(mut self, semantic: Semantic) -> Self {
        self.semantic = Some(semantic);
        self
    }
}

/// A closed annotation: bytes `start..end` of the output came from `target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Annotation {
    pub start: usize,
    pub end: usize,
    #[serde(flatten)]
    pub target: AnnotationTarget,
}

/// Receives annotations as ranges close.
pub trait AnnotationCollector {
    fn add_annotation(&mut self, annotation: Annotation);
}

impl AnnotationCollector for Vec<Annotation> {
    fn add_annotation(&mut self, annotation: Annotation) {
        self.push(annotation);
    }
}
