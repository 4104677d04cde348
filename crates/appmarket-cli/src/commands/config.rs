//! Config command - print one resolved configuration value

use appmarket_core::MarketConfig;

use crate::error::{CliError, Result};

pub fn run(config: &MarketConfig, section: &str, key: &str) -> Result<()> {
    println!("{}", resolve(config, section, key)?);
    Ok(())
}

fn resolve(config: &MarketConfig, section: &str, key: &str) -> Result<String> {
    config.lookup(section, key).ok_or_else(|| CliError::UnknownKey {
        section: section.to_string(),
        key: key.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes;

    #[test]
    fn test_resolve_known_and_unknown() {
        let config = MarketConfig::from_yaml("kubernetes:\n  common_domain: example.lan\n").unwrap();
        assert_eq!(
            resolve(&config, "kubernetes", "common_domain").unwrap(),
            "example.lan"
        );

        let err = resolve(&config, "kubernetes", "nope").unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);
        assert!(err.to_string().contains("kubernetes.nope"));
    }
}
