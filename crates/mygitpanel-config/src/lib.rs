//! Process configuration (spec §6): environment-variable driven,
//! fatal on a missing required setting.

pub mod app_config;

pub use app_config::AppConfig;
