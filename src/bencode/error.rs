use std::fmt::Display;

use thiserror::Error;

/// Errors produced while decoding or encoding bencode.
///
/// Every malformed-input condition surfaces as one of these variants; the
/// decoder never panics or reads past the end of its input.
#[derive(Debug, Error)]
pub enum BencodeError {
    /// The wire value has a different shape than the destination expects.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// Malformed integer or length digits, or a value that does not fit the
    /// destination width.
    #[error("invalid number: {0}")]
    NumberFormat(String),

    /// The input ended before a value, terminator or declared length was complete.
    #[error("unexpected end of input at offset {0}")]
    TruncatedInput(usize),

    /// A dictionary key resolves to no field of the destination record.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// A dictionary key appeared twice (strict mode only).
    #[error("duplicate dictionary key: {0}")]
    DuplicateKey(String),

    /// Dictionary keys are not in ascending byte order (strict mode only).
    #[error("dictionary key out of order: {0}")]
    UnsortedKey(String),

    /// A required record field was absent.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// The host value has no bencode representation.
    #[error("unsupported type: {0}")]
    UnsupportedType(&'static str),

    /// A byte that cannot start a bencode value.
    #[error("unexpected byte {byte:#04x} at offset {offset}")]
    UnexpectedByte { byte: u8, offset: usize },

    #[error("trailing data after value at offset {0}")]
    TrailingData(usize),

    #[error("nesting too deep")]
    NestingTooDeep,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Custom(String),
}

impl BencodeError {
    pub(crate) fn mismatch(expected: impl Display, found: impl Display) -> Self {
        BencodeError::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

impl serde::de::Error for BencodeError {
    fn custom<T: Display>(msg: T) -> Self {
        BencodeError::Custom(msg.to_string())
    }

    fn invalid_type(unexp: serde::de::Unexpected<'_>, exp: &dyn serde::de::Expected) -> Self {
        BencodeError::mismatch(exp, unexp)
    }

    fn invalid_value(unexp: serde::de::Unexpected<'_>, exp: &dyn serde::de::Expected) -> Self {
        use serde::de::Unexpected;
        match unexp {
            Unexpected::Signed(_) | Unexpected::Unsigned(_) => {
                BencodeError::NumberFormat(format!("{} out of range for {}", unexp, exp))
            }
            _ => BencodeError::Custom(format!("invalid value: {}, expected {}", unexp, exp)),
        }
    }

    fn invalid_length(len: usize, exp: &dyn serde::de::Expected) -> Self {
        BencodeError::mismatch(exp, format_args!("sequence of length {}", len))
    }

    fn unknown_field(field: &str, _expected: &'static [&'static str]) -> Self {
        BencodeError::UnknownField(field.to_string())
    }

    fn missing_field(field: &'static str) -> Self {
        BencodeError::MissingField(field)
    }

    fn duplicate_field(field: &'static str) -> Self {
        BencodeError::DuplicateKey(field.to_string())
    }
}

impl serde::ser::Error for BencodeError {
    fn custom<T: Display>(msg: T) -> Self {
        BencodeError::Custom(msg.to_string())
    }
}
