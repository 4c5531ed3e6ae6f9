pub mod error;
pub mod limiters;

pub use error::EngineError;
pub use limiters::Limiters;
