use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
    pub request_body_limit_bytes: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DATABASE_URL")
                .or_else(|_| std::env::var("DB_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DATABASE_URL or DB_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DATABASE_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: env_or("PORT", 3000)
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 10)
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a positive number"))?,
            rate_limit_per_second: env_or("RATE_LIMIT_PER_SECOND", 10)
                .map_err(|_| anyhow::anyhow!("RATE_LIMIT_PER_SECOND must be a positive number"))?,
            rate_limit_burst: env_or("RATE_LIMIT_BURST", 20)
                .map_err(|_| anyhow::anyhow!("RATE_LIMIT_BURST must be a positive number"))?,
            request_body_limit_bytes: env_or("REQUEST_BODY_LIMIT_BYTES", 1024 * 1024).map_err(
                |_| anyhow::anyhow!("REQUEST_BODY_LIMIT_BYTES must be a positive number"),
            )?,
        };

        if config.db_max_connections == 0 {
            anyhow::bail!("DB_MAX_CONNECTIONS must be at least 1");
        }
        if config.rate_limit_per_second == 0 || config.rate_limit_burst == 0 {
            anyhow::bail!("RATE_LIMIT_PER_SECOND and RATE_LIMIT_BURST must be at least 1");
        }

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!(
            "Database URL: {}...",
            config.database_url.chars().take(20).collect::<String>()
        );
        tracing::debug!("Server Port: {}", config.port);
        tracing::debug!(
            "Rate limit: {}/s, burst {}",
            config.rate_limit_per_second,
            config.rate_limit_burst
        );

        Ok(config)
    }
}

/// Reads and parses an environment variable, falling back to `default` when unset or blank.
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, T::Err> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse(),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_defaults_when_unset() {
        let value: u16 = env_or("PROFESSIONAL_REGISTRY_TEST_UNSET_PORT", 3000).unwrap();
        assert_eq!(value, 3000);
    }

    #[test]
    fn test_env_or_parses_value() {
        std::env::set_var("PROFESSIONAL_REGISTRY_TEST_BURST", " 42 ");
        let value: u32 = env_or("PROFESSIONAL_REGISTRY_TEST_BURST", 20).unwrap();
        assert_eq!(value, 42);

        std::env::set_var("PROFESSIONAL_REGISTRY_TEST_BAD", "lots");
        assert!(env_or::<u32>("PROFESSIONAL_REGISTRY_TEST_BAD", 20).is_err());
    }
}
