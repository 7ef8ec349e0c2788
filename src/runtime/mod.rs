mod compiler;
pub mod config;
pub mod dict;
mod prims;
pub mod runtime_error;
pub mod vm;

pub use config::VmConfig;
pub use runtime_error::{ErrorKind, RuntimeError};
pub use vm::{APP_NAME, Flow, Vm};
