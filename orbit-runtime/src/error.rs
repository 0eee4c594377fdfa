use orbit_compiler::RenderError;
use orbit_core::StoreError;
use orbit_dom::{ListenerError, PatchError};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MountError {
    #[error("mount target `{0}` was not found")]
    AnchorNotFound(String),
    #[error("instance is not mounted")]
    NotMounted,
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Mount(#[from] MountError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Patch(#[from] PatchError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error("method `{name}` failed: {message}")]
    Method { name: String, message: String },
}

impl RuntimeError {
    pub fn method(name: impl Into<String>, message: impl ToString) -> Self {
        RuntimeError::Method {
            name: name.into(),
            message: message.to_string(),
        }
    }

    /// Narrow to what a render pass can report.
    pub(crate) fn into_render(self, name: &str) -> RenderError {
        match self {
            RuntimeError::Render(err) => err,
            RuntimeError::Store(err) => RenderError::Store(err),
            other => RenderError::Method {
                name: name.to_string(),
                message: other.to_string(),
            },
        }
    }
}
