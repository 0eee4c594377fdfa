use orbit_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    #[error("invalid expression `{source_text}`: {message}")]
    Expression { source_text: String, message: String },
    #[error("directive `{name}`: {message}")]
    Directive { name: String, message: String },
}

impl CompileError {
    pub fn directive(name: impl Into<String>, message: impl Into<String>) -> Self {
        CompileError::Directive {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unknown method `{0}`")]
    UnknownMethod(String),
    #[error("only instance methods can be called")]
    NotCallable,
    #[error("template rendered {0} root nodes, expected exactly one")]
    MultipleRoots(usize),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("method `{name}` failed: {message}")]
    Method { name: String, message: String },
}
