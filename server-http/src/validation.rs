use crate::models::ContentRequest;

#[derive(Debug, PartialEq, Eq)]
pub enum ValidationError {
    EmptyField { field: &'static str },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyField { field } => write!(f, "{} must not be empty", field),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Both `content` and `user_id` are required and may not be blank
pub fn validate_content(req: &ContentRequest) -> Result<(), ValidationError> {
    if req.content.trim().is_empty() {
        return Err(ValidationError::EmptyField { field: "content" });
    }
    if req.user_id.trim().is_empty() {
        return Err(ValidationError::EmptyField { field: "user_id" });
    }
    Ok(())
}
