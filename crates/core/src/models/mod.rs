pub mod domain;
pub mod infrastructure;
pub mod model_registry;
