//! dex: catalog lookups by numeric id.
//!
//! The catalog is anything implementing [`Catalog`]; [`HttpCatalog`] talks to
//! a PokéAPI-compatible service.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::UnitError;

/// Base URL used when none is configured.
pub const DEFAULT_CATALOG_URL: &str = "https://pokeapi.co/api/v2";

/// A remote catalog of named entries.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Name of the entry with the given id.
    async fn name(&self, id: u64) -> Result<String, UnitError>;
}

/// Catalog backed by `GET <base_url>/pokemon/<id>/`.
pub struct HttpCatalog {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct Entry {
    name: String,
}

impl HttpCatalog {
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("jobsh/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn entry_url(&self, id: u64) -> String {
        format!("{}/pokemon/{id}/", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Catalog for HttpCatalog {
    async fn name(&self, id: u64) -> Result<String, UnitError> {
        let url = self.entry_url(id);
        tracing::debug!(%url, "catalog lookup");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| UnitError::Lookup(e.to_string()))?;

        let entry: Entry = response
            .json()
            .await
            .map_err(|e| UnitError::Lookup(format!("bad response from {url}: {e}")))?;

        Ok(entry.name)
    }
}

/// Look up one entry.
pub async fn dex(catalog: &dyn Catalog, id: u64) -> Result<String, UnitError> {
    let name = catalog.name(id).await?;
    Ok(format!("The pokemon with id {id} is {name}"))
}

/// Look up entries in order, suspending for `pause` after each one.
///
/// Dropping the future between lookups cancels the remaining ones.
pub async fn dex_multi(
    catalog: &dyn Catalog,
    ids: &[u64],
    pause: Duration,
) -> Result<String, UnitError> {
    let mut progress = Progress { ids, done: 0 };
    let mut lines = Vec::with_capacity(ids.len());

    for &id in ids {
        match dex(catalog, id).await {
            Ok(line) => lines.push(line),
            Err(e) => {
                progress.done = ids.len();
                return Err(e);
            }
        }
        progress.done += 1;
        tokio::time::sleep(pause).await;
    }

    Ok(lines.join("\n"))
}

/// Logs the lookups still pending if a `dex_multi` future is dropped early.
struct Progress<'a> {
    ids: &'a [u64],
    done: usize,
}

impl Drop for Progress<'_> {
    fn drop(&mut self) {
        if let Some(pending) = self.ids.get(self.done..).filter(|rest| !rest.is_empty()) {
            tracing::info!(?pending, "dex-multi cancelled");
        }
    }
}
