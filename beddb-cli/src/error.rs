//! Error handling for beddb CLI

use beddb_core::BeddbError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for beddb CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Chromosome sizes error: {message}")]
    ChromSizes { message: String },

    #[error("Database error: {message}")]
    Database { message: String },
}

impl CliError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn file_not_found(path: PathBuf) -> Self {
        Self::FileNotFound { path }
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn database<S: Into<String>>(message: S) -> Self {
        Self::Database { message: message.into() }
    }
}

impl From<BeddbError> for CliError {
    fn from(err: BeddbError) -> Self {
        match err {
            BeddbError::FatalConfiguration { .. } | BeddbError::UnknownChromosome { .. } => {
                Self::ChromSizes { message: err.to_string() }
            }
            BeddbError::InvalidConfig(message) => Self::config(message),
            BeddbError::Storage(e) => Self::database(e.to_string()),
            other => Self::validation(other.to_string()),
        }
    }
}

/// Provide helpful error messages and suggestions
pub fn format_error_with_suggestions(error: &CliError) -> String {
    let mut message = error.to_string();

    match error {
        CliError::FileNotFound { path } => {
            message.push_str(&format!(
                "\n\nSuggestions:\n\
                 • Check that the file path is correct: {}\n\
                 • Ensure you have read permissions for the file",
                path.display()
            ));
        }

        CliError::ChromSizes { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Make sure the chromosome sizes file matches the assembly of the input\n\
                 • The file must hold tab-separated name and length pairs",
            );
        }

        CliError::Config { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Check your beddb.toml configuration file\n\
                 • Verify that all configuration values are valid",
            );
        }

        CliError::Database { .. } => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Check that the .beddb file is not corrupted\n\
                 • Try rebuilding it with 'beddb aggregate'",
            );
        }

        _ => {}
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = CliError::config("test message");
        assert!(matches!(err, CliError::Config { .. }));
        assert_eq!(err.to_string(), "Configuration error: test message");
    }

    #[test]
    fn test_error_suggestions() {
        let err = CliError::file_not_found(PathBuf::from("genes.tsv"));
        let formatted = format_error_with_suggestions(&err);
        assert!(formatted.contains("Suggestions:"));
        assert!(formatted.contains("Check that the file path is correct"));
    }

    #[test]
    fn test_core_error_conversion() {
        let err: CliError = BeddbError::UnknownChromosome { chrom: "chrZ".to_string() }.into();
        assert!(matches!(err, CliError::ChromSizes { .. }));
        assert!(err.to_string().contains("chrZ"));

        let err: CliError = BeddbError::InvalidConfig("tile size".to_string()).into();
        assert!(matches!(err, CliError::Config { .. }));
    }
}
