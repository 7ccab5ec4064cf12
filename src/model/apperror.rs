use std::fmt;

/**
 * Represents the type of error that can occur within the application.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorType {
    Initialization,
    JwtAuthorization,
    Forbidden,
    Validation,
    NotFound,
    ConstraintViolation,
    DatabaseError,
    Unavailable,
    Application,
}

/**
 * A validation problem attached to a single input field.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        FieldError { field: field.to_string(), message: message.to_string() }
    }
}

/**
 * Represents an error that occurs within the application.
 */
#[derive(Debug, Clone)]
pub struct ApplicationError {
    /**
     * Error type.
     */
    pub error_type: ErrorType,
    /**
     * Error message describing problem.
     */
    pub message: String,
    /**
     * Field level details. Only populated for validation errors.
     */
    pub field_errors: Vec<FieldError>,
}

impl ApplicationError {
    /**
     * Creates a new ApplicationError.
     *
     * #Arguments
     * `error_type`: The type of error.
     * `message`: A description of the error.
     */
    pub fn new(error_type: ErrorType, message: String) -> Self {
        ApplicationError { error_type, message, field_errors: Vec::new() }
    }

    /**
     * Creates a validation error carrying field level details.
     *
     * #Arguments
     * `field_errors`: The offending fields. Must not be empty.
     */
    pub fn validation(field_errors: Vec<FieldError>) -> Self {
        let message = field_errors.iter().map(|field_error| format!("{}: {}", field_error.field, field_error.message)).collect::<Vec<String>>().join("; ");
        ApplicationError { error_type: ErrorType::Validation, message, field_errors }
    }

    /**
     * Shorthand for a validation error on a single field.
     */
    pub fn invalid_field(field: &str, message: &str) -> Self {
        Self::validation(vec![FieldError::new(field, message)])
    }

    /**
     * Whether the error means the caller has no valid session.
     * Such errors must never be retried.
     */
    pub fn is_authentication_failure(&self) -> bool {
        if self.error_type == ErrorType::JwtAuthorization {
            return true;
        }
        let message = self.message.to_lowercase();
        ["unauthorized", "authentication required", "session expired"].iter().any(|marker| message.contains(marker))
    }
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
