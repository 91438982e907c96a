use std::path::PathBuf;

/// The error kinds from spec section 7, one variant each.
#[derive(Debug, thiserror::Error)]
pub enum CrucibleError {
    #[error("{0}")]
    Usage(String),

    #[error("{0}")]
    Validation(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// A build-info dependency reference that didn't resolve to a config
    /// in the same file (spec section 4.3: "failure to resolve is fatal";
    /// `BuildInfoError::Unresolved` in section 7's table). Distinct from
    /// `Parse` because the file itself parsed fine - the edge it names is
    /// just dangling - but it's the same class of "corrupt build-info,
    /// caller decides whether to delete and rebuild" condition, not an
    /// internal invariant violation.
    #[error("build-info dependency \"{dependency}\" for config \"{config}\" could not be resolved")]
    Unresolved { config: String, dependency: String },

    #[error("{0}")]
    Module(String),

    /// Non-zero exit from the compiler. The driver propagates this code verbatim.
    #[error("compile failed with exit code {0}")]
    Compile(i32),

    /// Non-zero exit from the linker. The driver propagates this code verbatim.
    #[error("link failed with exit code {0}")]
    Link(i32),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CrucibleError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Maps this error onto the process exit code per spec section 7:
    /// compiler/linker failures propagate their own code, everything else
    /// gets a small reserved code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 1,
            Self::Validation(_) => 2,
            Self::Io { .. } => 3,
            Self::Parse { .. } => 4,
            Self::Unresolved { .. } => 4,
            Self::Module(_) => 5,
            Self::Compile(code) | Self::Link(code) => *code,
            Self::Internal(_) => 6,
        }
    }
}

pub type Result<T, E = CrucibleError> = std::result::Result<T, E>;
