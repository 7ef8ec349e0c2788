pub mod format;
pub mod io;
pub mod tib;

pub use io::{Capture, Io, ReaderSource, Source};
