mod bootstrap;
mod check_config;

pub use bootstrap::cmd_bootstrap;
pub use check_config::cmd_check_config;
