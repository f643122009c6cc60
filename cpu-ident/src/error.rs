use thiserror::Error;

/// The binary crate's error type: the core engine's errors, plus CLI-only
/// conditions.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] cpu_ident_core::Error),

    #[error("window size must be positive")]
    ZeroWindow,
}

pub type Result<T> = std::result::Result<T, CliError>;
