pub mod access_token;
pub mod engines;
pub mod model_config;
