//! Bootstrap command handler

use std::sync::Arc;

use crate::auth::TokenService;
use crate::config::Config;
use crate::db::Store;
use crate::services::{AuthService, BootstrapOutcome, SeaOrmAuthService};

/// Opens the database (running pending migrations) and makes sure the
/// configured admin account exists.
pub async fn cmd_bootstrap(config: &Config) -> anyhow::Result<BootstrapOutcome> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let tokens = Arc::new(TokenService::new(&config.auth)?);
    let auth = SeaOrmAuthService::new(store, tokens, config.security.clone());

    let outcome = auth.bootstrap_admin(&config.auth).await?;
    match outcome {
        BootstrapOutcome::Created => {
            println!("✓ Admin user '{}' created", config.auth.admin_username);
        }
        BootstrapOutcome::AlreadyExists => {
            println!(
                "Admin user '{}' already exists, nothing to do",
                config.auth.admin_username
            );
        }
    }

    Ok(outcome)
}
