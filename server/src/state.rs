use std::sync::Arc;

use loyalty::{get_catalog_remote, Catalog};
use tracing::info;

use super::{
    config::Config,
    database::{init_redis, CardStore},
    presence::Presence,
    worker::Workers,
};

pub struct State {
    pub config: Config,
    pub catalog: Catalog,
    pub cards: CardStore,
    pub presence: Arc<Presence>,
    pub workers: Workers,
}

impl State {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();

        let catalog = load_catalog(&config).await;
        let redis_connection = init_redis(&config.redis_url).await;
        let presence = Presence::connect(&config.redis_url, redis_connection.clone()).await;

        Arc::new(Self {
            cards: CardStore::new(redis_connection),
            presence,
            workers: Workers::new(config.worker_pin.clone()),
            catalog,
            config,
        })
    }
}

async fn load_catalog(config: &Config) -> Catalog {
    let mut catalog = if let Some(path) = &config.catalog_path {
        Catalog::from_file(path).expect("Catalog misconfigured!")
    } else if let Some(url) = &config.catalog_url {
        get_catalog_remote(url).await.expect("Catalog misconfigured!")
    } else {
        info!("No catalog configured, using the built-in one");
        Catalog::default()
    };

    if let Some(cooldown_ms) = config.redeem_cooldown_ms {
        catalog.redeem_cooldown_ms = cooldown_ms;
        catalog.validate().expect("Catalog misconfigured!");
    }

    catalog
}
