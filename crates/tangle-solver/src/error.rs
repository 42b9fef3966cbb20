use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolverError {
    // Session errors
    #[error("No pool is bound to the resolver")]
    NoPool,

    // Adapter errors
    #[error("Failed to initialise solver adapter: {0}")]
    AdapterInit(String),

    #[error("Solver aborted after {iterations} iterations")]
    SolverAborted { iterations: u32 },

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Parse errors
    #[error("Invalid capability or edition: {0}")]
    Edition(#[from] tangle_edition::EditionError),
}

pub type Result<T> = std::result::Result<T, ResolverError>;
