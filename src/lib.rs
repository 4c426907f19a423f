pub mod config;
pub mod logging;
pub mod updater;
pub mod version;
