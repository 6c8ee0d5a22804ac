use std::fmt;

use derive_more::*;

use crate::Id;

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum ShaderParseErrorKind {
    /// The header is missing, has the wrong magic number, or declares an
    /// unknown version.
    #[display(fmt = "malformed header")]
    MalformedHeader,
    #[display(fmt = "instruction with zero word count")]
    ZeroLengthInstruction,
    /// An instruction extends past the end of the word stream.
    #[display(fmt = "truncated instruction")]
    TruncatedInstruction,
    #[display(fmt = "unknown id %{}", _0)]
    UnknownId(Id),
    /// The id exists but holds a different kind of object.
    #[display(fmt = "id %{} has the wrong kind", _0)]
    TypeMismatch(Id),
    #[display(fmt = "block declared outside of a function")]
    BlockOutsideFunction,
    #[display(fmt = "block was not terminated")]
    UnterminatedBlock,
    #[display(fmt = "function was not ended")]
    UnterminatedFunction,
    /// Vector and matrix constants hold at most four elements.
    #[display(fmt = "composite constant with {} elements", _0)]
    UnsupportedCompositeArity(u32),
    #[display(fmt = "capability {} is not supported", _0)]
    UnrecognizedCapability(u32),
    #[display(fmt = "missing operands for opcode {}", _0)]
    MissingOperands(u16),
    #[display(fmt = "invalid enum value: {}", _0)]
    InvalidEnumValue(u32),
    #[display(fmt = "invalid literal string")]
    InvalidString,
    #[display(fmt = "unsupported bit width {}", _0)]
    UnsupportedWidth(u32),
    #[display(fmt = "opcode {} requires an open block", _0)]
    InstructionOutsideBlock(u16),
    #[display(fmt = "opcode {} requires an open function", _0)]
    InstructionOutsideFunction(u16),
    #[display(fmt = "specialization constant op %{} in a constant composite", _0)]
    SpecConstantOpInConstant(Id),
    #[display(fmt = "null constant of array type %{} without literal length", _0)]
    NonLiteralNullArray(Id),
    /// Struct member index beyond the universal limit.
    #[display(fmt = "member index {} out of range", _0)]
    MemberOutOfRange(u32),
    /// A library limitation has been exceeded, such as an array length.
    #[display(fmt = "limit exceeded")]
    LimitExceeded,
    /// Only raised when `ParseOptions::strict_extensions` is set.
    #[display(fmt = "unsupported extended instruction set %{}", _0)]
    UnsupportedExtension(Id),
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ShaderParseError {
    kind: ErrorKind,
    // Word offset of the offending instruction, if any.
    offset: Option<usize>,
}

pub type ErrorKind = ShaderParseErrorKind;
pub type Error = ShaderParseError;
pub type Result<T> = std::result::Result<T, Error>;

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.offset {
            Some(offset) => write!(f, "{} (at word {})", self.kind, offset),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self { kind, offset: None }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Word offset of the instruction that caused the error.
    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    /// Attributes the error to an instruction unless it already is.
    pub(crate) fn at(self, offset: usize) -> Self {
        Self { offset: self.offset.or(Some(offset)), ..self }
    }
}

/// Enumerant word that `spirv_headers` does not know.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct InvalidEnumValue(pub u32);

impl From<InvalidEnumValue> for ErrorKind {
    fn from(val: InvalidEnumValue) -> Self {
        Self::InvalidEnumValue(val.0)
    }
}

impl From<std::str::Utf8Error> for ErrorKind {
    fn from(_: std::str::Utf8Error) -> Self {
        Self::InvalidString
    }
}

macro_rules! impl_from_kind {
    ($($src:ty),*$(,)?) => {
        $(impl From<$src> for Error {
            fn from(val: $src) -> Self {
                Self::new(val.into())
            }
        })*
    }
}

impl_from_kind!(ErrorKind, InvalidEnumValue, std::str::Utf8Error);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_offset() {
        let err = Error::from(ErrorKind::UnknownId(7)).at(12);
        assert_eq!(err.to_string(), "unknown id %7 (at word 12)");
        assert_eq!(err.at(40).offset(), Some(12));
        assert_eq!(Error::from(ErrorKind::MalformedHeader).to_string(),
            "malformed header");
    }
}
