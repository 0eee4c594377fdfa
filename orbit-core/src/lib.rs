//! Reactive data layer and host collaborators for the Orbit runtime.

pub mod lifecycle;
pub mod scheduler;
pub mod store;
pub mod value;

pub use lifecycle::{Hook, Hooks};
pub use scheduler::{Scheduler, Task, TaskError, TaskQueue};
pub use store::{Getter, Reader, Store, StoreError};
pub use value::{Map, Value};
