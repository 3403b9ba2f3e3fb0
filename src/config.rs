use validator::Validate;

#[derive(Deserialize, Debug, Validate)]
pub struct Config {
    database_url: String,
    api_host: Option<String>,
    api_port: Option<u16>,
    /// maximum amount of pooled database connections
    #[serde(default = "default_pool_size")]
    #[validate(range(min = 1, max = 100))]
    database_pool_size: u32,
    /// seconds in-flight requests get to finish after a shutdown signal
    #[serde(default = "default_shutdown_timeout")]
    shutdown_timeout: u64,
    /// comma separated list of origins allowed to call the api
    allowed_origins: Option<String>,
    sentry_dsn: Option<String>,
    /// jaeger agent, tracing spans are only exported when this is set
    opentelemetry_endpoint: Option<String>,
}

fn default_pool_size() -> u32 {
    10
}

fn default_shutdown_timeout() -> u64 {
    5
}

impl Config {
    /// reads and validates the configuration from the environment
    pub fn from_env() -> anyhow::Result<Config> {
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("missing or incorrect environment variable: {}", e))?;

        config
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid environment variable: {}", e))?;

        Ok(config)
    }

    pub fn database_url(&self) -> &str {
        self.database_url.as_ref()
    }

    pub fn api_host(&self) -> &str {
        match &self.api_host {
            Some(host) => host.as_ref(),
            None => "localhost",
        }
    }

    pub fn api_port(&self) -> u16 {
        self.api_port.unwrap_or(8080)
    }

    pub fn database_pool_size(&self) -> u32 {
        self.database_pool_size
    }

    pub fn shutdown_timeout(&self) -> u64 {
        self.shutdown_timeout
    }

    pub fn allowed_origins(&self) -> Vec<String> {
        match &self.allowed_origins {
            Some(origins) => origins
                .split(',')
                .map(|origin| origin.trim())
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn sentry_dsn(&self) -> Option<&str> {
        self.sentry_dsn.as_ref().map(|dsn| dsn.as_ref())
    }

    pub fn opentelemetry_endpoint(&self) -> Option<&str> {
        self.opentelemetry_endpoint
            .as_ref()
            .map(|endpoint| endpoint.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(vars: Vec<(&str, &str)>) -> Result<Config, envy::Error> {
        envy::from_iter(
            vars.into_iter()
                .map(|(key, value)| (key.to_string(), value.to_string())),
        )
    }

    #[test]
    fn defaults() {
        let config = config(vec![("DATABASE_URL", "postgres://localhost/racket")]).unwrap();

        assert_eq!(config.api_host(), "localhost");
        assert_eq!(config.api_port(), 8080);
        assert_eq!(config.database_pool_size(), 10);
        assert_eq!(config.shutdown_timeout(), 5);
        assert!(config.allowed_origins().is_empty());
        assert!(config.sentry_dsn().is_none());
    }

    #[test]
    fn database_url_is_required() {
        assert!(config(vec![("API_PORT", "8000")]).is_err());
    }

    #[test]
    fn allowed_origins_are_split() {
        let config = config(vec![
            ("DATABASE_URL", "postgres://localhost/racket"),
            (
                "ALLOWED_ORIGINS",
                "http://localhost:5173, https://racket.example.com,",
            ),
        ])
        .unwrap();

        assert_eq!(
            config.allowed_origins(),
            vec!["http://localhost:5173", "https://racket.example.com"]
        );
    }

    #[test]
    fn pool_size_is_bounded() {
        let config = config(vec![
            ("DATABASE_URL", "postgres://localhost/racket"),
            ("DATABASE_POOL_SIZE", "0"),
        ])
        .unwrap();

        assert!(config.validate().is_err());
    }
}
