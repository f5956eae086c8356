mod database;
mod redis;
mod state_builder;

pub use database::connect_and_migrate;
pub use state_builder::{build_app_state, ensure_bootstrap_admin, seed_default_catalog};
