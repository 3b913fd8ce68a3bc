//! Config check command handler

use crate::config::Config;

/// Validates the loaded config and prints the effective values as TOML with
/// secrets masked.
pub fn cmd_check_config(config: &Config) -> anyhow::Result<()> {
    config.validate()?;

    let rendered = toml::to_string_pretty(&config.masked())?;
    println!("✓ Configuration is valid");
    println!();
    println!("{rendered}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_config_rejects_invalid() {
        let mut config = Config::default();
        assert!(cmd_check_config(&config).is_ok());

        config.pagination.max_page_size = 0;
        assert!(cmd_check_config(&config).is_err());
    }
}
