use thiserror::Error;

/// Main error type for cover-me operations
#[derive(Error, Debug)]
pub enum CoverMeError {
    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Api(String),

    #[error("{0}")]
    Setup(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl CoverMeError {
    /// Headline shown above the diagnostic on stderr
    pub fn kind_label(&self) -> &'static str {
        match self {
            CoverMeError::Config(_) | CoverMeError::Yaml(_) => "Configuration Error",
            CoverMeError::Api(_) | CoverMeError::Http(_) => "API Error",
            CoverMeError::Setup(_) => "Setup Error",
            CoverMeError::Validation(_) => "Input Error",
            CoverMeError::Generation(_) | CoverMeError::Template(_) => "Generation Error",
            CoverMeError::Io(_) => "Error",
        }
    }

    /// Remediation lines printed after the diagnostic
    pub fn hint(&self) -> &'static [&'static str] {
        match self {
            CoverMeError::Config(_) | CoverMeError::Yaml(_) => &[
                "Run 'cover-me setup' to create or repair your configuration",
                "Run 'cover-me test' to see what is missing",
            ],
            CoverMeError::Api(_) | CoverMeError::Http(_) => &[
                "Check your internet connection",
                "Verify your API key is valid",
                "Run 'cover-me test' to diagnose issues",
            ],
            CoverMeError::Validation(_) => &[
                "Copy a job description to your clipboard, or pass --file",
                "Make sure the input is not empty",
            ],
            CoverMeError::Setup(_) => &["Run 'cover-me setup' again once the problem is fixed"],
            CoverMeError::Generation(_) | CoverMeError::Template(_) | CoverMeError::Io(_) => &[
                "Run 'cover-me test' to check your configuration",
                "Try 'cover-me setup' to reconfigure",
            ],
        }
    }
}

pub type Result<T> = std::result::Result<T, CoverMeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_follow_taxonomy() {
        assert_eq!(CoverMeError::Config("x".into()).kind_label(), "Configuration Error");
        assert_eq!(CoverMeError::Api("x".into()).kind_label(), "API Error");
        assert_eq!(CoverMeError::Validation("x".into()).kind_label(), "Input Error");
        assert!(!CoverMeError::Setup("x".into()).hint().is_empty());
    }

    #[test]
    fn test_message_is_passed_through() {
        let err = CoverMeError::Config("LLM model not specified".into());
        assert_eq!(err.to_string(), "LLM model not specified");
    }
}
