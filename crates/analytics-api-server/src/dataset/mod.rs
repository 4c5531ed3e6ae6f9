pub mod generator;
pub mod models;
pub mod store;

pub use generator::GeneratorConfig;
pub use models::Dataset;
pub use store::DatasetStore;
