//! Command implementations for autoskope-cli

pub mod login;
pub mod vehicles;

pub use login::login;
pub use vehicles::vehicles;
