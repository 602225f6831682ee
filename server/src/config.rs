use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub redis_url: String,
    /// Base URL customer devices embed in their worker pass link.
    pub public_url: String,
    pub catalog_path: Option<String>,
    pub catalog_url: Option<String>,
    pub redeem_cooldown_ms: Option<i64>,
    pub worker_pin: String,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("RUST_PORT", "1111"),
            redis_url: try_load("REDIS_URL", "redis://127.0.0.1:6379"),
            public_url: try_load("PUBLIC_URL", "http://localhost:1111"),
            catalog_path: env::var("CATALOG_PATH").ok(),
            catalog_url: env::var("CATALOG_URL").ok(),
            redeem_cooldown_ms: env::var("REDEEM_COOLDOWN_MS").ok().map(|raw| {
                raw.parse()
                    .map_err(|e| {
                        warn!("Invalid REDEEM_COOLDOWN_MS value: {e}");
                    })
                    .expect("Environment misconfigured!")
            }),
            worker_pin: read_secret("WORKER_PIN"),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

fn read_secret(secret_name: &str) -> String {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            warn!("Failed to read {secret_name} from file: {e}");
        })
        .expect("Secrets misconfigured!")
}
