/// Build failure types
use dualbuild_config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{tool} failed with {}", describe_exit(.exit_code))]
    ToolFailed {
        tool: String,
        exit_code: Option<i32>,
    },

    #[error("Failed to launch {tool}: {error}")]
    ToolLaunchError {
        tool: String,
        error: std::io::Error,
    },

    #[error("Coverage below threshold: {}", join_messages(.0))]
    CoverageBelowThreshold(Vec<String>),

    #[error("Invalid glob pattern '{pattern}': {error}")]
    InvalidGlob { pattern: String, error: String },

    #[error("Invalid manifest at {path}: {error}")]
    InvalidManifest { path: PathBuf, error: String },

    #[error("File already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("{}", describe_failures(.0))]
    Multiple(Vec<BuildError>),

    #[error("Build failed: {0}")]
    BuildFailed(String),
}

impl BuildError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create a tool failure
    pub fn tool_failed(tool: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            exit_code,
        }
    }

    /// Create an invalid manifest error
    pub fn invalid_manifest(path: impl Into<PathBuf>, error: impl ToString) -> Self {
        Self::InvalidManifest {
            path: path.into(),
            error: error.to_string(),
        }
    }

    /// Every underlying failure, with aggregates flattened
    pub fn failures(&self) -> Vec<&BuildError> {
        match self {
            Self::Multiple(errors) => errors.iter().flat_map(|e| e.failures()).collect(),
            other => vec![other],
        }
    }

    /// Combine the failures of settled branches.
    ///
    /// Returns `Ok` when no branch failed, the lone error when one did, and
    /// [`BuildError::Multiple`] otherwise.
    pub fn settle(results: impl IntoIterator<Item = BuildResult<()>>) -> BuildResult<()> {
        Self::collect(results).map(drop)
    }

    /// Like [`BuildError::settle`], keeping the values of successful branches
    pub fn collect<T>(results: impl IntoIterator<Item = BuildResult<T>>) -> BuildResult<Vec<T>> {
        let mut values = Vec::new();
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(value) => values.push(value),
                Err(error) => errors.push(error),
            }
        }

        match errors.len() {
            0 => Ok(values),
            1 => Err(errors.remove(0)),
            _ => Err(Self::Multiple(errors)),
        }
    }
}

fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

fn join_messages(messages: &[String]) -> String {
    messages.join("; ")
}

fn describe_failures(errors: &[BuildError]) -> String {
    let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
    format!("{} tasks failed: {}", errors.len(), messages.join("; "))
}
