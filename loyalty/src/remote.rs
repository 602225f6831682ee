use anyhow::Error;
use reqwest::get;

use crate::Catalog;

/// Fetch and validate a catalog published at a URL, for deployments that
/// serve the reward configuration from a CDN instead of a mounted file.
pub async fn get_catalog_remote(url: &str) -> Result<Catalog, Error> {
    let response = get(url).await?;
    let body = response.text().await?;

    Ok(Catalog::from_json(&body)?)
}
