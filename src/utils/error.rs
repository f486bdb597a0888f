use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlateauError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CMS error: {message}")]
    CmsError { message: String },

    #[error("CKAN error: {message}")]
    CkanError { message: String },

    #[error("Invalid item: {message}")]
    InvalidItemError { message: String },

    #[error("Preparation failed: {message}")]
    PrepareError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("no command to run")]
    NoCommand,

    #[error("no uploadable items")]
    NoUploadableItems,

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<PlateauError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    ExternalService,
    Data,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PlateauError {
    pub fn cms(message: impl Into<String>) -> Self {
        Self::CmsError {
            message: message.into(),
        }
    }

    pub fn ckan(message: impl Into<String>) -> Self {
        Self::CkanError {
            message: message.into(),
        }
    }

    pub fn invalid_item(message: impl Into<String>) -> Self {
        Self::InvalidItemError {
            message: message.into(),
        }
    }

    pub fn prepare(message: impl Into<String>) -> Self {
        Self::PrepareError {
            message: message.into(),
        }
    }

    /// Innermost error, skipping any `Context` wrappers.
    pub fn root_cause(&self) -> &PlateauError {
        match self {
            Self::Context { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self.root_cause() {
            Self::ApiError(_) => ErrorCategory::Network,
            Self::CmsError { .. } | Self::CkanError { .. } | Self::PrepareError { .. } => {
                ErrorCategory::ExternalService
            }
            Self::InvalidItemError { .. }
            | Self::NoUploadableItems
            | Self::SerializationError(_)
            | Self::ZipError(_) => ErrorCategory::Data,
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::NoCommand => ErrorCategory::Configuration,
            Self::IoError(_) => ErrorCategory::System,
            Self::Context { .. } => unreachable!("root_cause never returns a context"),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network | ErrorCategory::ExternalService => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.root_cause() {
            Self::ApiError(_) => "Check network connectivity and the configured base URLs",
            Self::CmsError { .. } => "Check the CMS token and that the item IDs exist",
            Self::CkanError { .. } => "Check the CKAN token and organization permissions",
            Self::PrepareError { .. } => "Inspect the worker output and rerun the failed step",
            Self::InvalidItemError { .. } => "Fix the item fields in the CMS and retry",
            Self::NoUploadableItems => "Run the preparation step before publishing",
            Self::NoCommand => "Enable at least one preparation step",
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => "Review the configuration file and CLI flags",
            Self::SerializationError(_) | Self::ZipError(_) => {
                "The remote data looks malformed; check the source item"
            }
            Self::IoError(_) => "Check disk space and permissions of the temporary directory",
            Self::Context { .. } => unreachable!("root_cause never returns a context"),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not reach a remote service: {}", self),
            ErrorCategory::ExternalService => format!("A remote service rejected the request: {}", self),
            ErrorCategory::Data => format!("The dataset could not be processed: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<PlateauError>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PlateauError::Context {
            context: context.into(),
            source: Box::new(e.into()),
        })
    }
}

pub type Result<T> = std::result::Result<T, PlateauError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_message_and_root_cause() {
        let err: Result<()> = Err(PlateauError::ckan("409 Conflict"));
        let err = err.context("failed to create package").unwrap_err();

        assert_eq!(
            err.to_string(),
            "failed to create package: CKAN error: 409 Conflict"
        );
        assert!(matches!(err.root_cause(), PlateauError::CkanError { .. }));
        assert_eq!(err.category(), ErrorCategory::ExternalService);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
    }

    #[test]
    fn test_configuration_errors_are_high_severity() {
        assert_eq!(PlateauError::NoCommand.severity(), ErrorSeverity::High);
        let err = PlateauError::MissingConfigError {
            field: "cms.token".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(err.user_friendly_message().contains("cms.token"));
    }
}
