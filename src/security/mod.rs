pub mod auth;
pub mod cors;
pub mod extract;
pub mod validation;

pub use auth::{require_admin, AdminIdentity};
pub use cors::create_cors_layer;
pub use extract::{ActionBody, ApiPath, FilterQuery, ValidatedJson};
pub use validation::{FieldError, Validate, ValidationError, ValidationResult, Validator};
