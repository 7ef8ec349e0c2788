//! A dictionary-threaded Forth: an outer interpreter that reads
//! whitespace-delimited words, and an inner interpreter that walks the tree
//! of nodes each word compiles to.

pub mod frontend;
pub mod lang;
pub mod runtime;

pub use frontend::{Capture, Io};
pub use runtime::{Vm, VmConfig};
