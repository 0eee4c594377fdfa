use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DirectiveError {
    #[error("directive `{name}` failed: {message}")]
    Failed { name: String, message: String },
    #[error("directive `{name}` expects {expected}")]
    BadValue { name: String, expected: String },
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("listener for `{event}` failed: {message}")]
pub struct ListenerError {
    pub event: String,
    pub message: String,
}

impl ListenerError {
    pub fn new(event: impl Into<String>, message: impl ToString) -> Self {
        Self {
            event: event.into(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PatchError {
    #[error(transparent)]
    Directive(#[from] DirectiveError),
    #[error("component `{tag}` failed: {message}")]
    Component { tag: String, message: String },
    #[error("`{0}` is not bound to a live node")]
    Unbound(String),
}

impl PatchError {
    pub fn component(tag: impl Into<String>, err: impl ToString) -> Self {
        PatchError::Component {
            tag: tag.into(),
            message: err.to_string(),
        }
    }
}
