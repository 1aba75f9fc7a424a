//! Configuration loaded from `.keystore.toml`.

pub mod settings;

pub use settings::Settings;
