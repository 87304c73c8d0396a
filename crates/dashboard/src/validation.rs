use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// Result of the client-side script check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptValidation {
    Valid,
    Invalid(String),
}

impl ScriptValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, ScriptValidation::Valid)
    }

    pub fn into_result(self) -> Result<(), ValidationError> {
        match self {
            ScriptValidation::Valid => Ok(()),
            ScriptValidation::Invalid(reason) => Err(ValidationError(reason)),
        }
    }
}

/// Checks a script before it is sent anywhere.
///
/// Only two rules apply: the source must not be blank and must contain the
/// substring `return` somewhere. Syntax is left to the remote executor.
pub fn validate_script(source: &str) -> ScriptValidation {
    if source.trim().is_empty() {
        return ScriptValidation::Invalid("Script cannot be empty".to_string());
    }
    if !source.contains("return") {
        return ScriptValidation::Invalid("Script must include a return statement".to_string());
    }
    ScriptValidation::Valid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_scripts_are_rejected() {
        for source in ["", "   ", "\n\t"] {
            assert_eq!(
                validate_script(source),
                ScriptValidation::Invalid("Script cannot be empty".into())
            );
        }
    }

    #[test]
    fn return_is_required() {
        assert_eq!(
            validate_script("row['close_price'] * 2"),
            ScriptValidation::Invalid("Script must include a return statement".into())
        );
    }

    #[test]
    fn any_source_mentioning_return_passes() {
        assert!(validate_script("return row['close_price'] / row['volume']").is_valid());
        // Substring match only; no parsing happens client-side.
        assert!(validate_script("x = returns").is_valid());
        assert!(validate_script("return").into_result().is_ok());
    }
}
