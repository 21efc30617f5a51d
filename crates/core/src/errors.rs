use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid cart line `{name}`: {reason}")]
    InvalidCartLine { name: String, reason: String },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("language model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("turn exceeded {limit} model decisions without producing a reply")]
    LoopBoundExceeded { limit: u32 },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, error_class: &'static str, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, error_class: &'static str, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, error_class: &'static str, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::BadRequest { error_class, .. }
            | Self::ServiceUnavailable { error_class, .. }
            | Self::Internal { error_class, .. } => error_class,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
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
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(error) => Self::BadRequest {
                message: error.to_string(),
                error_class: "domain_validation",
                correlation_id,
            },
            ApplicationError::Persistence(message) => {
                Self::ServiceUnavailable { message, error_class: "persistence", correlation_id }
            }
            ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, error_class: "integration", correlation_id }
            }
            ApplicationError::ModelUnavailable(message) => Self::ServiceUnavailable {
                message,
                error_class: "model_unavailable",
                correlation_id,
            },
            ApplicationError::Configuration(message) => {
                Self::Internal { message, error_class: "configuration", correlation_id }
            }
            error @ ApplicationError::LoopBoundExceeded { .. } => Self::Internal {
                message: error.to_string(),
                error_class: "loop_bound_exceeded",
                correlation_id,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, DomainError, InterfaceError};

    #[test]
    fn domain_error_maps_to_bad_request_interface_error() {
        let interface = ApplicationError::from(DomainError::InvalidCartLine {
            name: "Calabresa".to_owned(),
            reason: "quantity must be positive".to_owned(),
        })
        .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
        assert_eq!(interface.error_class(), "domain_validation");
    }

    #[test]
    fn bad_request_has_user_safe_message() {
        let interface =
            ApplicationError::from(DomainError::InvariantViolation("empty message".to_owned()))
                .into_interface("req-2");

        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn model_unavailable_and_loop_bound_are_distinguishable() {
        let unavailable =
            ApplicationError::ModelUnavailable("timed out".to_owned()).into_interface("req-3");
        let looping =
            ApplicationError::LoopBoundExceeded { limit: 8 }.into_interface("req-3");

        assert!(matches!(unavailable, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(unavailable.error_class(), "model_unavailable");
        assert!(matches!(looping, InterfaceError::Internal { .. }));
        assert_eq!(looping.error_class(), "loop_bound_exceeded");
        assert_eq!(looping.correlation_id(), "req-3");
    }

    #[test]
    fn persistence_error_maps_to_service_unavailable() {
        let interface = ApplicationError::Persistence("database lock timeout".to_owned())
            .into_interface("req-4");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(
            interface.user_message(),
            "The service is temporarily unavailable. Please retry shortly."
        );
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let interface =
            ApplicationError::Configuration("missing api key".to_owned()).into_interface("req-5");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
