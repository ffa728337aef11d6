use std::fmt;

use thiserror::Error;

use crate::params::RollupField;

pub type Result<T> = std::result::Result<T, CreatorError>;

#[derive(Error, Debug)]
pub enum CreatorError {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("RPC error: {0}")]
    RPC(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Contract interaction error: {0}")]
    Contract(String),

    #[error("Contract hash error: {0}")]
    Hash(String),

    #[error("Metrics error: {0}")]
    Metrics(String),
}

impl CreatorError {
    /// True for errors caused by user input rather than a defect or the environment.
    pub fn is_user_error(&self) -> bool {
        matches!(self, CreatorError::Validation(_))
    }
}

/// Why a decimal amount could not be read exactly.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecimalError {
    #[error("no digits")]
    NoDigits,

    #[error("amount is negative")]
    Negative,

    #[error("only digits and one decimal point are allowed")]
    Invalid,

    #[error("more than {0} digits after the decimal point")]
    TooPrecise(usize),

    #[error("amount is too large")]
    TooLarge,
}

/// Which side of an accepted range a value fell on.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    AtLeast(String),
    AtMost(String),
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::AtLeast(min) => write!(f, "must be at least {}", min),
            Bound::AtMost(max) => write!(f, "must be at most {}", max),
        }
    }
}

/// A single rejected rollup parameter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamError {
    #[error("missing required rollup parameter(s): {}", join_fields(.fields))]
    MissingField { fields: Vec<RollupField> },

    #[error("{field} is not a valid {expected}: {value:?} ({reason})")]
    Parse {
        field: RollupField,
        value: String,
        expected: &'static str,
        reason: String,
    },

    #[error("{field} {bound}, got {value}")]
    OutOfRange {
        field: RollupField,
        value: String,
        bound: Bound,
    },
}

impl ParamError {
    /// Stable, machine-readable error kind.
    pub fn kind(&self) -> String {
        match self {
            ParamError::MissingField { .. } => "missing-field".to_string(),
            ParamError::Parse { .. } => "parse-error".to_string(),
            ParamError::OutOfRange { field, .. } => format!("out-of-range:{}", field),
        }
    }

    /// Fields this error refers to.
    pub fn fields(&self) -> Vec<RollupField> {
        match self {
            ParamError::MissingField { fields } => fields.clone(),
            ParamError::Parse { field, .. } | ParamError::OutOfRange { field, .. } => vec![*field],
        }
    }
}

fn join_fields(fields: &[RollupField]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Every violation found in one validation pass. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationErrors(Vec<ParamError>);

impl ValidationErrors {
    pub(crate) fn new(errors: Vec<ParamError>) -> Self {
        debug_assert!(!errors.is_empty());
        Self(errors)
    }

    pub fn errors(&self) -> &[ParamError] {
        &self.0
    }

    pub fn first(&self) -> &ParamError {
        &self.0[0]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn kinds(&self) -> Vec<String> {
        self.0.iter().map(ParamError::kind).collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "invalid rollup parameters: {}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = ParamError;
    type IntoIter = std::vec::IntoIter<ParamError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let missing = ParamError::MissingField {
            fields: vec![RollupField::VmHash, RollupField::GracePeriod],
        };
        assert_eq!(missing.kind(), "missing-field");
        assert_eq!(
            missing.to_string(),
            "missing required rollup parameter(s): vmHash, gracePeriod"
        );

        let range = ParamError::OutOfRange {
            field: RollupField::SpeedLimitFactor,
            value: "200".to_string(),
            bound: Bound::AtMost("100".to_string()),
        };
        assert_eq!(range.kind(), "out-of-range:speedLimitFactor");
        assert_eq!(range.to_string(), "speedLimitFactor must be at most 100, got 200");
    }

    #[test]
    fn test_user_error_is_distinct_from_defect() {
        let user = CreatorError::from(ValidationErrors::new(vec![ParamError::MissingField {
            fields: vec![RollupField::VmHash],
        }]));
        assert!(user.is_user_error());
        assert!(!CreatorError::Overflow("blocks_to_ticks".into()).is_user_error());
    }
}
