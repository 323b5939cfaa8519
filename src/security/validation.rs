use bigdecimal::{BigDecimal, Zero};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Required(String),
    TooShort { field: String, min: usize, actual: usize },
    TooLong { field: String, max: usize, actual: usize },
    InvalidFormat { field: String, expected: String },
    InvalidRange { field: String, min: String, max: String },
    InvalidValue { field: String, message: String },
    InvalidEmail { field: String, value: String },
    InvalidPhone { field: String, value: String },
    Custom(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Required(field) => write!(f, "Field '{}' is required", field),
            Self::TooShort { field, min, actual } => {
                write!(f, "Field '{}' is too short: {} < {} chars", field, actual, min)
            }
            Self::TooLong { field, max, actual } => {
                write!(f, "Field '{}' is too long: {} > {} chars", field, actual, max)
            }
            Self::InvalidFormat { field, expected } => {
                write!(f, "Field '{}' has invalid format, expected: {}", field, expected)
            }
            Self::InvalidRange { field, min, max } => {
                write!(f, "Field '{}' must be between {} and {}", field, min, max)
            }
            Self::InvalidValue { field, message } => {
                write!(f, "Field '{}' has invalid value: {}", field, message)
            }
            Self::InvalidEmail { field, value } => {
                write!(f, "Field '{}' is not a valid email address: {}", field, value)
            }
            Self::InvalidPhone { field, value } => {
                write!(f, "Field '{}' is not a valid phone number: {}", field, value)
            }
            Self::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn field(&self) -> &str {
        match self {
            Self::Required(field) => field,
            Self::TooShort { field, .. }
            | Self::TooLong { field, .. }
            | Self::InvalidFormat { field, .. }
            | Self::InvalidRange { field, .. }
            | Self::InvalidValue { field, .. }
            | Self::InvalidEmail { field, .. }
            | Self::InvalidPhone { field, .. } => field,
            Self::Custom(_) => "body",
        }
    }
}

/// One entry of the `details` array in a 400 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<&ValidationError> for FieldError {
    fn from(err: &ValidationError) -> Self {
        Self::new(err.field(), err.to_string())
    }
}

#[derive(Debug, Default)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
    }

    pub fn field_errors(&self) -> Vec<FieldError> {
        self.errors.iter().map(FieldError::from).collect()
    }
}

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).expect("Invalid email regex")
});

static PHONE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[1-9]\d{6,14}$").expect("Invalid phone regex")
});

static COUNTRY_CODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}$").expect("Invalid country code regex"));

static CURRENCY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{3}$").expect("Invalid currency regex"));

static TIME_OF_DAY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").expect("Invalid time of day regex")
});

static CODE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("Invalid code regex")
});

pub fn validate_string_required(value: &str, field_name: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Required(field_name.to_string()))
    } else {
        Ok(())
    }
}

pub fn validate_length(
    value: &str,
    field_name: &str,
    min: Option<usize>,
    max: Option<usize>,
) -> Result<(), ValidationError> {
    let len = value.chars().count();

    if let Some(min_len) = min {
        if len < min_len {
            return Err(ValidationError::TooShort {
                field: field_name.to_string(),
                min: min_len,
                actual: len,
            });
        }
    }

    if let Some(max_len) = max {
        if len > max_len {
            return Err(ValidationError::TooLong {
                field: field_name.to_string(),
                max: max_len,
                actual: len,
            });
        }
    }

    Ok(())
}

pub fn validate_email(email: &str, field_name: &str) -> Result<(), ValidationError> {
    if email.len() <= 254 && EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail {
            field: field_name.to_string(),
            value: email.to_string(),
        })
    }
}

pub fn validate_phone(phone: &str, field_name: &str) -> Result<(), ValidationError> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit() || *c == '+').collect();

    if PHONE_REGEX.is_match(&digits) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPhone {
            field: field_name.to_string(),
            value: phone.to_string(),
        })
    }
}

fn validate_pattern(
    value: &str,
    field_name: &str,
    regex: &Regex,
    expected: &str,
) -> Result<(), ValidationError> {
    if regex.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidFormat {
            field: field_name.to_string(),
            expected: expected.to_string(),
        })
    }
}

/// ISO-3166 alpha-2, upper case.
pub fn validate_country_code(value: &str, field_name: &str) -> Result<(), ValidationError> {
    validate_pattern(value, field_name, &COUNTRY_CODE_REGEX, "two upper-case letters (ISO 3166)")
}

/// ISO-4217, upper case.
pub fn validate_currency(value: &str, field_name: &str) -> Result<(), ValidationError> {
    validate_pattern(value, field_name, &CURRENCY_REGEX, "three upper-case letters (ISO 4217)")
}

pub fn validate_time_of_day(value: &str, field_name: &str) -> Result<(), ValidationError> {
    validate_pattern(value, field_name, &TIME_OF_DAY_REGEX, "HH:MM (24h)")
}

pub fn validate_code(value: &str, field_name: &str) -> Result<(), ValidationError> {
    validate_pattern(value, field_name, &CODE_REGEX, "letters, digits, '-' or '_'")
}

pub fn validate_range<T: PartialOrd + std::fmt::Display>(
    value: T,
    field_name: &str,
    min: Option<T>,
    max: Option<T>,
) -> Result<(), ValidationError> {
    let below = min.as_ref().is_some_and(|m| value < *m);
    let above = max.as_ref().is_some_and(|m| value > *m);

    if below || above {
        Err(ValidationError::InvalidRange {
            field: field_name.to_string(),
            min: min.map(|m| m.to_string()).unwrap_or_else(|| "-inf".to_string()),
            max: max.map(|m| m.to_string()).unwrap_or_else(|| "inf".to_string()),
        })
    } else {
        Ok(())
    }
}

pub fn validate_percent(value: &BigDecimal, field_name: &str) -> Result<(), ValidationError> {
    validate_range(
        value,
        field_name,
        Some(&BigDecimal::zero()),
        Some(&BigDecimal::from(100)),
    )
}

pub fn validate_non_negative(value: &BigDecimal, field_name: &str) -> Result<(), ValidationError> {
    if value < &BigDecimal::zero() {
        Err(ValidationError::InvalidValue {
            field: field_name.to_string(),
            message: "must not be negative".to_string(),
        })
    } else {
        Ok(())
    }
}

pub fn validate_positive(value: &BigDecimal, field_name: &str) -> Result<(), ValidationError> {
    if value <= &BigDecimal::zero() {
        Err(ValidationError::InvalidValue {
            field: field_name.to_string(),
            message: "must be greater than zero".to_string(),
        })
    } else {
        Ok(())
    }
}

/// Money columns are `NUMERIC(12,2)`.
pub fn validate_money_scale(value: &BigDecimal, field_name: &str) -> Result<(), ValidationError> {
    let (_, scale) = value.as_bigint_and_exponent();
    let normalized_scale = value.normalized().as_bigint_and_exponent().1;
    if scale.min(normalized_scale) > 2 {
        Err(ValidationError::InvalidFormat {
            field: field_name.to_string(),
            expected: "at most two decimal places".to_string(),
        })
    } else if value.abs() >= BigDecimal::from(10_000_000_000_i64) {
        Err(ValidationError::InvalidValue {
            field: field_name.to_string(),
            message: "amount is too large".to_string(),
        })
    } else {
        Ok(())
    }
}

pub struct Validator {
    result: ValidationResult,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            result: ValidationResult::new(),
        }
    }

    fn check(mut self, outcome: Result<(), ValidationError>) -> Self {
        if let Err(e) = outcome {
            self.result.add_error(e);
        }
        self
    }

    pub fn string_required(self, value: &str, field_name: &str) -> Self {
        self.check(validate_string_required(value, field_name))
    }

    pub fn length(self, value: &str, field_name: &str, min: Option<usize>, max: Option<usize>) -> Self {
        self.check(validate_length(value, field_name, min, max))
    }

    /// Non-blank and at most `max` characters.
    pub fn text(self, value: &str, field_name: &str, max: usize) -> Self {
        if value.trim().is_empty() {
            self.string_required(value, field_name)
        } else {
            self.length(value, field_name, Some(1), Some(max))
        }
    }

    pub fn email(self, value: &str, field_name: &str) -> Self {
        self.check(validate_email(value, field_name))
    }

    pub fn phone(self, value: &str, field_name: &str) -> Self {
        self.check(validate_phone(value, field_name))
    }

    pub fn country_code(self, value: &str, field_name: &str) -> Self {
        self.check(validate_country_code(value, field_name))
    }

    pub fn currency(self, value: &str, field_name: &str) -> Self {
        self.check(validate_currency(value, field_name))
    }

    pub fn time_of_day(self, value: &str, field_name: &str) -> Self {
        self.check(validate_time_of_day(value, field_name))
    }

    pub fn code(self, value: &str, field_name: &str, max: usize) -> Self {
        self.length(value, field_name, Some(1), Some(max))
            .check(validate_code(value, field_name))
    }

    pub fn percent(self, value: &BigDecimal, field_name: &str) -> Self {
        self.check(validate_percent(value, field_name))
    }

    pub fn money(self, value: &BigDecimal, field_name: &str) -> Self {
        self.check(validate_non_negative(value, field_name))
            .check(validate_money_scale(value, field_name))
    }

    pub fn positive_money(self, value: &BigDecimal, field_name: &str) -> Self {
        self.check(validate_positive(value, field_name))
            .check(validate_money_scale(value, field_name))
    }

    pub fn non_negative_int(self, value: i32, field_name: &str) -> Self {
        self.check(validate_range(value, field_name, Some(0), None))
    }

    pub fn range<T: PartialOrd + std::fmt::Display>(
        self,
        value: T,
        field_name: &str,
        min: Option<T>,
        max: Option<T>,
    ) -> Self {
        self.check(validate_range(value, field_name, min, max))
    }

    /// Runs `rule` only when the optional field was supplied.
    pub fn opt<T, F>(self, value: Option<T>, rule: F) -> Self
    where
        F: FnOnce(Self, T) -> Self,
    {
        match value {
            Some(v) => rule(self, v),
            None => self,
        }
    }

    pub fn custom<F>(mut self, validation_fn: F) -> Self
    where
        F: FnOnce() -> Option<ValidationError>,
    {
        if let Some(error) = validation_fn() {
            self.result.add_error(error);
        }
        self
    }

    pub fn nested(mut self, other: Result<(), ValidationResult>) -> Self {
        if let Err(errors) = other {
            self.result.merge(errors);
        }
        self
    }

    pub fn validate(self) -> Result<(), ValidationResult> {
        if self.result.is_valid() {
            Ok(())
        } else {
            Err(self.result)
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

/// Shape checks for a request body. `REQUIRED` lists the camelCase keys that
/// must be present and non-null; every missing key is reported at once.
pub trait Validate {
    const REQUIRED: &'static [&'static str] = &[];

    fn validate(&self) -> Result<(), ValidationResult>;
}

pub fn missing_required_fields(body: &serde_json::Value, required: &[&str]) -> Vec<FieldError> {
    required
        .iter()
        .filter(|key| body.get(**key).map_or(true, serde_json::Value::is_null))
        .map(|key| FieldError::new(*key, format!("Field '{}' is required", key)))
        .collect()
}
