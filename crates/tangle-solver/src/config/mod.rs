mod config;
mod source;

pub use config::{OnlyRequires, ResolverConfig};
pub use source::ConfigLoader;
