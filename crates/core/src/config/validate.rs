use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Auth section exists (enforced by serde) and api_key is set for api_key auth
/// - Server port is not 0
/// - Booking quantity bounds are a non-empty range starting at 1 or above
/// - Hold duration is non-negative (negative holds are a test-only seam)
/// - Reaper poll interval is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if matches!(config.auth.method, crate::config::AuthMethod::ApiKey)
        && config.auth.api_key.as_ref().is_none_or(|k| k.is_empty())
    {
        return Err(ConfigError::ValidationError(
            "auth.api_key must be set when auth.method is \"api_key\"".to_string(),
        ));
    }

    // Booking policy validation
    if config.booking.min_quantity < 1 {
        return Err(ConfigError::ValidationError(
            "booking.min_quantity must be at least 1".to_string(),
        ));
    }
    if config.booking.max_quantity < config.booking.min_quantity {
        return Err(ConfigError::ValidationError(
            "booking.max_quantity cannot be below booking.min_quantity".to_string(),
        ));
    }
    if config.booking.hold_minutes < 0 {
        return Err(ConfigError::ValidationError(
            "booking.hold_minutes cannot be negative".to_string(),
        ));
    }

    // Reaper validation
    if config.reaper.poll_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "reaper.poll_interval_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::BookingPolicy;
    use crate::config::{AuthConfig, AuthMethod, DatabaseConfig, ServerConfig};
    use crate::reaper::ReaperConfig;
    use std::net::IpAddr;

    fn valid_config() -> Config {
        Config {
            auth: AuthConfig {
                method: AuthMethod::None,
                api_key: None,
            },
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            booking: BookingPolicy::default(),
            reaper: ReaperConfig::default(),
        }
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = valid_config();
        config.server = ServerConfig {
            host: "0.0.0.0".parse::<IpAddr>().unwrap(),
            port: 0,
        };
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_api_key_method_without_key_fails() {
        let mut config = valid_config();
        config.auth = AuthConfig {
            method: AuthMethod::ApiKey,
            api_key: None,
        };
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_inverted_quantity_bounds_fail() {
        let mut config = valid_config();
        config.booking.min_quantity = 5;
        config.booking.max_quantity = 2;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_negative_hold_fails() {
        let mut config = valid_config();
        config.booking.hold_minutes = -1;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_zero_poll_interval_fails() {
        let mut config = valid_config();
        config.reaper.poll_interval_secs = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
