use std::borrow::Cow;
use std::fmt;

use crate::label::Label;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriterError {
    /// A `{{...}}` pattern could not be parsed.
    Pattern(Cow<'static, str>),
    /// The toolchain lacks a tool the target needs, or the tool is unusable.
    Toolchain(Cow<'static, str>),
    /// The dependency graph is malformed (dangling handle, cycle, ...).
    Graph(Cow<'static, str>),
    /// The target itself is inconsistent.
    Target(Cow<'static, str>),
    /// Two sources of one target map to the same object file.
    DuplicateObjectFile { label: Label, path: String },
}

macro_rules! bail_toolchain_error {
    ($msg:expr, $($arg:tt)*) => { return Err($crate::error::WriterError::Toolchain(format!($msg, $($arg)*).into())) };
    ($msg:expr) =>              { return Err($crate::error::WriterError::Toolchain(format!($msg).into())) };
}

macro_rules! bail_graph_error {
    ($msg:expr, $($arg:tt)*) => { return Err($crate::error::WriterError::Graph(format!($msg, $($arg)*).into())) };
    ($msg:expr) =>              { return Err($crate::error::WriterError::Graph(format!($msg).into())) };
}

macro_rules! bail_target_error {
    ($msg:expr, $($arg:tt)*) => { return Err($crate::error::WriterError::Target(format!($msg, $($arg)*).into())) };
    ($msg:expr) =>              { return Err($crate::error::WriterError::Target(format!($msg).into())) };
}

pub(crate) use {bail_graph_error, bail_target_error, bail_toolchain_error};

pub trait ErrorContext: Sized {
    type Ok;
    fn with_context_toolchain<R: Into<Cow<'static, str>>>(
        self,
        f: impl FnOnce() -> R,
    ) -> Result<Self::Ok, WriterError>;
    fn with_context_graph<R: Into<Cow<'static, str>>>(
        self,
        f: impl FnOnce() -> R,
    ) -> Result<Self::Ok, WriterError>;
}

impl<T, E: fmt::Display> ErrorContext for Result<T, E> {
    type Ok = T;
    fn with_context_toolchain<R: Into<Cow<'static, str>>>(
        self,
        f: impl FnOnce() -> R,
    ) -> Result<T, WriterError> {
        self.map_err(|e| WriterError::Toolchain(Cow::from(format!("{}: {}", f().into(), e))))
    }
    fn with_context_graph<R: Into<Cow<'static, str>>>(
        self,
        f: impl FnOnce() -> R,
    ) -> Result<T, WriterError> {
        self.map_err(|e| WriterError::Graph(Cow::from(format!("{}: {}", f().into(), e))))
    }
}

impl<T> ErrorContext for Option<T> {
    type Ok = T;
    fn with_context_toolchain<R: Into<Cow<'static, str>>>(
        self,
        f: impl FnOnce() -> R,
    ) -> Result<T, WriterError> {
        self.ok_or_else(|| WriterError::Toolchain(f().into()))
    }
    fn with_context_graph<R: Into<Cow<'static, str>>>(
        self,
        f: impl FnOnce() -> R,
    ) -> Result<T, WriterError> {
        self.ok_or_else(|| WriterError::Graph(f().into()))
    }
}

impl fmt::Display for WriterError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WriterError::Pattern(msg) => write!(f, "Bad substitution pattern: {}", msg),
            WriterError::Toolchain(msg) => write!(f, "Toolchain error: {}", msg),
            WriterError::Graph(msg) => write!(f, "Dependency error: {}", msg),
            WriterError::Target(msg) => write!(f, "Target error: {}", msg),
            WriterError::DuplicateObjectFile { label, path } => write!(
                f,
                "Duplicate object file\n\
                 The target {label}\n\
                 generates two object files with the same name:\n  {path}\n\
                 \n\
                 It could be you accidentally have a file listed twice in the\n\
                 sources. Or, depending on how your toolchain maps sources to\n\
                 object files, two source files with the same name in different\n\
                 directories could map to the same object file.\n\
                 \n\
                 In the latter case, either rename one of the files or move one of\n\
                 the sources to a separate source_set to avoid them both being in\n\
                 the same target."
            ),
        }
    }
}

impl core::error::Error for WriterError {}

pub type Result<T, E = WriterError> = core::result::Result<T, E>;
