use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// End of input before an element's closing tag.
    Unclosed,
    /// A closing tag with no open element of that name.
    DanglingClose,
    /// More than one root node in a template; only the first is rendered.
    ExtraRoot,
    /// The template could not be compiled and renders nothing.
    Compile,
    /// The mount anchor was not found.
    Mount,
}

/// A non-fatal problem found while compiling or mounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
