pub mod loader;
pub mod model;

pub use loader::DeltaLoader;
pub use model::DatabaseConfig;
