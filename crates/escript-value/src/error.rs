//! Error types for decoding and method calls
//!
//! Operator failures are not Rust errors: they produce [`Value::Error`]
//! values that scripts test and propagate. The types here cover the
//! conditions the caller has to handle itself.
//!
//! [`Value::Error`]: crate::Value::Error

use std::io;
use std::string::FromUtf8Error;

use derive_more::{Display, Error};

use crate::kind::Kind;
use crate::method::MethodId;

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Failure to reconstruct a value from its packed form.
#[derive(Display, Debug)]
#[display("{kind}")]
pub struct DecodeError {
    kind: Box<DecodeErrorKind>,
}

impl<E> From<E> for DecodeError
where
    DecodeErrorKind: From<E>,
{
    fn from(error: E) -> Self {
        DecodeError {
            kind: Box::new(DecodeErrorKind::from(error)),
        }
    }
}

impl DecodeError {
    pub fn kind(&self) -> &DecodeErrorKind {
        &self.kind
    }

    pub(crate) fn unexpected_eof() -> Self {
        DecodeErrorKind::UnexpectedEof.into()
    }

    pub(crate) fn unknown_tag(tag: u8) -> Self {
        DecodeErrorKind::UnknownTag(tag).into()
    }

    pub(crate) fn unpackable(kind: Kind) -> Self {
        DecodeErrorKind::Unpackable(kind).into()
    }

    pub(crate) fn name_count_mismatch(elements: usize, names: usize) -> Self {
        DecodeErrorKind::NameCountMismatch { elements, names }.into()
    }

    pub(crate) fn trailing_bytes(count: usize) -> Self {
        DecodeErrorKind::TrailingBytes(count).into()
    }

    pub(crate) fn too_deep(limit: usize) -> Self {
        DecodeErrorKind::TooDeep(limit).into()
    }
}

#[derive(Display, Debug)]
pub enum DecodeErrorKind {
    #[display("Unexpected end of input")]
    UnexpectedEof,

    #[display("Unknown type tag: {_0}")]
    UnknownTag(u8),

    #[display("Values of kind {_0} cannot be unpacked")]
    Unpackable(Kind),

    #[display("Invalid UTF-8 in string payload")]
    InvalidUtf8,

    #[display("Struct has {elements} elements but {names} names")]
    NameCountMismatch { elements: usize, names: usize },

    #[display("{_0} trailing bytes after packed value")]
    TrailingBytes(usize),

    #[display("Containers nested deeper than {_0} levels")]
    TooDeep(usize),

    #[display("I/O error: {_0}")]
    Io(io::Error),
}

impl From<io::Error> for DecodeErrorKind {
    fn from(error: io::Error) -> Self {
        if error.kind() == io::ErrorKind::UnexpectedEof {
            DecodeErrorKind::UnexpectedEof
        } else {
            DecodeErrorKind::Io(error)
        }
    }
}

impl From<FromUtf8Error> for DecodeErrorKind {
    fn from(_: FromUtf8Error) -> Self {
        DecodeErrorKind::InvalidUtf8
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &*self.kind {
            DecodeErrorKind::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Method call failures reported to the executor.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum CallError {
    #[display("Method '{name}' not found for {kind}")]
    UnknownMethod { kind: Kind, name: String },

    #[display("Method '{method}' not supported by {kind}")]
    NotSupported { kind: Kind, method: MethodId },
}
