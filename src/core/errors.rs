use thiserror::Error;

/// Unified error type for the entire trialflow library
#[derive(Debug, Error)]
pub enum FlowError {
    /// Lifecycle protocol violations (stepping a finished sequence,
    /// ending a component twice, running before preparation)
    #[error("Protocol violation in {component}: {message}")]
    Protocol { component: String, message: String },

    /// A descendant failed to prepare, aborting the enclosing composite.
    /// Already-applied side effects (ids, hand-me-downs) are not rolled back.
    #[error("Preparation failed in {component}")]
    Preparation {
        component: String,
        #[source]
        source: Box<FlowError>,
    },

    /// Invalid configuration supplied at construction time
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    /// Event-channel failures and other states that should be unreachable
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl FlowError {
    /// Create a protocol violation error
    pub fn protocol<C: Into<String>, M: Into<String>>(component: C, message: M) -> Self {
        Self::Protocol {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Wrap a child failure as an aggregate preparation error
    pub fn preparation<C: Into<String>>(component: C, source: FlowError) -> Self {
        Self::Preparation {
            component: component.into(),
            source: Box::new(source),
        }
    }

    /// Create a configuration error
    pub fn configuration<M: Into<String>>(message: M) -> Self {
        Self::Configuration {
            message: message.into(),
            field: None,
        }
    }

    /// Create a configuration error tied to a specific field
    pub fn configuration_field<M: Into<String>, F: Into<String>>(message: M, field: F) -> Self {
        Self::Configuration {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create an internal error
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get error category for metrics/logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Protocol { .. } => "protocol",
            Self::Preparation { .. } => "preparation",
            Self::Configuration { .. } => "configuration",
            Self::Internal { .. } => "internal",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, FlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = FlowError::protocol("sequence 'p_0'", "sequence ended");
        assert!(matches!(err, FlowError::Protocol { .. }));
        assert_eq!(err.category(), "protocol");
    }

    #[test]
    fn test_preparation_source_chain() {
        let inner = FlowError::configuration_field("bad mode", "mode");
        let err = FlowError::preparation("parallel 'root'", inner);
        assert_eq!(err.category(), "preparation");

        let source = std::error::Error::source(&err).expect("source preserved");
        assert!(source.to_string().contains("bad mode"));
    }

    #[test]
    fn test_display() {
        let err = FlowError::protocol("sequence '0'", "cannot step");
        assert_eq!(
            err.to_string(),
            "Protocol violation in sequence '0': cannot step"
        );
    }
}
