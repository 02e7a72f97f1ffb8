use anyhow::Context;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
}

impl Config {
    /// Reads settings from the process environment, after loading a `.env`
    /// file if one exists.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|value| !value.trim().is_empty())
            .context("DATABASE_URL must be set to a production Postgres instance")?;

        let max_connections = match lookup("RESULTS_DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("RESULTS_DB_MAX_CONNECTIONS is not a number: {raw}"))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Config {
            database_url,
            max_connections: max_connections.max(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn requires_database_url() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));

        assert!(Config::from_lookup(lookup_from(&[("DATABASE_URL", "  ")])).is_err());
    }

    #[test]
    fn defaults_pool_size() {
        let config =
            Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://localhost/school")]))
                .unwrap();
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn parses_pool_size_override() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/school"),
            ("RESULTS_DB_MAX_CONNECTIONS", "12"),
        ]))
        .unwrap();
        assert_eq!(config.max_connections, 12);

        let bad = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/school"),
            ("RESULTS_DB_MAX_CONNECTIONS", "lots"),
        ]));
        assert!(bad.is_err());
    }
}
