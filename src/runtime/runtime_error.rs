use crate::lang::code::{Cell, Token};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("stack underflow")]
    StackUnderflow,

    #[error("return stack underflow")]
    ReturnStackUnderflow,

    #[error("stack size limit exceeded ({0})")]
    StackOverflow(usize),

    #[error("division by zero")]
    DivisionByZero,

    #[error("invalid address {0}")]
    InvalidAddress(Cell),

    #[error("invalid token {0}")]
    InvalidToken(Cell),

    #[error("invalid index {0}")]
    InvalidIndex(Cell),

    #[error("address out of range: token {token}, offset {offset}")]
    AddressOverflow { token: Token, offset: usize },

    #[error("'{0}' has no data field")]
    NoDataField(String),

    #[error("'{0}' has no open control structure")]
    NoOpenConstruct(&'static str),

    #[error("call depth limit exceeded ({0}) - possible infinite recursion")]
    CallDepthExceeded(usize),

    #[error("include depth limit exceeded ({0})")]
    LoadDepthExceeded(usize),

    #[error("execution step limit exceeded ({0})")]
    StepLimitExceeded(usize),

    #[error("invalid range {0}")]
    InvalidRange(Cell),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Call-stack lines shown before the rest are summarised.
const MAX_FRAMES: usize = 16;

#[derive(Debug)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub call_stack: Vec<String>,
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "runtime error: {}", self.kind)?;

        if !self.call_stack.is_empty() {
            write!(f, "\n  call stack:")?;

            // runs of the same word print once
            let mut runs: Vec<(&str, usize)> = Vec::new();
            for frame in self.call_stack.iter().rev() {
                match runs.last_mut() {
                    Some((name, n)) if *name == frame.as_str() => *n += 1,
                    _ => runs.push((frame.as_str(), 1)),
                }
            }

            for (i, (frame, n)) in runs.iter().take(MAX_FRAMES).enumerate() {
                write!(f, "\n    {}: {}", i, frame)?;
                if *n > 1 {
                    write!(f, " (repeated {} times)", n)?;
                }
            }
            if runs.len() > MAX_FRAMES {
                write!(f, "\n    ... {} more", runs.len() - MAX_FRAMES)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<ErrorKind> for RuntimeError {
    fn from(kind: ErrorKind) -> Self {
        RuntimeError {
            kind,
            call_stack: Vec::new(),
        }
    }
}

impl From<std::io::Error> for RuntimeError {
    fn from(e: std::io::Error) -> Self {
        ErrorKind::Io(e).into()
    }
}

impl RuntimeError {
    pub fn new(kind: ErrorKind) -> Self {
        kind.into()
    }

    /// Record the word this error unwound through.
    pub fn with_context(mut self, context: &str) -> Self {
        self.call_stack.push(context.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_without_frames() {
        let e = RuntimeError::new(ErrorKind::StackUnderflow);
        assert_eq!(e.to_string(), "runtime error: stack underflow");
    }

    #[test]
    fn test_display_lists_frames_outermost_first() {
        let e = RuntimeError::new(ErrorKind::DivisionByZero)
            .with_context("inner")
            .with_context("outer");
        let text = e.to_string();
        assert!(text.starts_with("runtime error: division by zero"));
        let outer = text.find("0: outer").expect("outer frame");
        let inner = text.find("1: inner").expect("inner frame");
        assert!(outer < inner);
    }

    #[test]
    fn test_display_collapses_recursion() {
        let mut e = RuntimeError::new(ErrorKind::CallDepthExceeded(256));
        for _ in 0..255 {
            e = e.with_context("a");
        }
        e = e.with_context("b");
        let text = e.to_string();
        assert!(text.contains("0: b\n    1: a (repeated 255 times)"));
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn test_display_caps_frames() {
        let mut e = RuntimeError::new(ErrorKind::StackUnderflow);
        for i in 0..40 {
            e = e.with_context(&format!("w{}", i));
        }
        let text = e.to_string();
        assert!(text.contains("15: w24"));
        assert!(!text.contains("16: "));
        assert!(text.ends_with("... 24 more"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.fs");
        let e: RuntimeError = io.into();
        assert!(matches!(e.kind, ErrorKind::Io(_)));
        assert!(e.to_string().contains("missing.fs"));
    }
}
