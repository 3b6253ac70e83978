use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("unable to resolve cmd0 '{0}'")]
    UnresolvedCommand(String),

    #[error("env construction failed: {0}")]
    BadEnv(String),

    #[error("spawn failed: {0}")]
    Spawn(#[from] std::io::Error),
}
