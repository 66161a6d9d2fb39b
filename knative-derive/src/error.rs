use crate::REQUIRED_VARIANTS;
use proc_macro2::Span;
use std::fmt;
use syn::Error;

/// Reasons an enum cannot be a `ConditionType`, each reported at the offending token.
pub enum VerificationError {
    NotAnEnum,
    MissingHappy,
    DuplicateHappy { first: String, second: String },
    DependentHappy(String),
    NotFieldless(String),
}

impl fmt::Display for VerificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use VerificationError::*;
        match self {
            NotAnEnum => write!(f, "ConditionType may only be derived on enums"),
            MissingHappy => write!(
                f,
                "ConditionType requires a variant named `{}`",
                REQUIRED_VARIANTS.join("` or `")
            ),
            DuplicateHappy { first, second } => write!(
                f,
                "`{second}` conflicts with `{first}`: a ConditionType has exactly one of `{}`",
                REQUIRED_VARIANTS.join("` or `")
            ),
            DependentHappy(name) => write!(f, "the happy condition `{name}` cannot be #[dependent]"),
            NotFieldless(name) => write!(f, "variant `{name}` of a ConditionType cannot carry data"),
        }
    }
}

impl VerificationError {
    pub fn at(self, span: Span) -> Error {
        Error::new(span, self)
    }
}
