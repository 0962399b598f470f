use thiserror::Error;

/// Errors raised while serving a request, after collaborator-specific errors
/// have been classified.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("intent classifier call failed: {0}")]
    UpstreamClassifier(String),
    #[error("{tool} tool call failed: {message}")]
    UpstreamTool { tool: &'static str, message: String },
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("upstream unavailable: {message}")]
    UpstreamUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    /// Message that is safe to return to a caller. Bad requests echo the
    /// validation message because it only describes the caller's own input.
    pub fn user_message(&self) -> String {
        match self {
            Self::BadRequest { message, .. } => message.clone(),
            Self::UpstreamUnavailable { .. } => {
                "An upstream service is temporarily unavailable. Please retry shortly.".to_string()
            }
            Self::Internal { .. } => "An unexpected internal error occurred.".to_string(),
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::UpstreamUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::UpstreamUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::MissingField { field } => Self::BadRequest {
                message: missing_field_message(field),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::InvalidArgument(message) => {
                Self::BadRequest { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::UpstreamClassifier(message)
            | ApplicationError::UpstreamTool { message, .. } => {
                Self::UpstreamUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Configuration(message) | ApplicationError::Internal(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}

pub fn missing_field_message(field: &str) -> String {
    format!("Missing '{field}' field.")
}
