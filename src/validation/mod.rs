pub mod compatibility;
pub mod gasb;
pub mod structural;

use crate::models::{ImportOptions, MunicipalAccount};

/// Outcome of a validation pass. Errors block import; warnings never do.
/// Results compose by concatenation — validation failures are values here,
/// never error returns.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        ValidationResult::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Concatenate another result into this one; validity is the AND of both.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// Run every enabled validator over the candidate batch and merge the
/// results: structural and fund-compatibility always, GASB when configured.
pub fn validate_batch(accounts: &[MunicipalAccount], options: &ImportOptions) -> ValidationResult {
    let mut result = structural::validate(accounts);
    result.merge(compatibility::validate(accounts));
    if options.validate_gasb_compliance {
        result.merge(gasb::validate(accounts));
    }
    result
}
