//! Source adapters.
//!
//! Every source implements the same capability, [`SourceFetch`]: fetch the
//! endpoint, parse it, and return cleaned, capped [`Item`]s or a
//! [`FetchError`]. Adapters never retry on their own; that is the job of
//! [`crate::retry::RetryFetch`].
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Cap |
//! |--------|--------|--------|-----|
//! | arXiv cs.AI | [`arxiv`] | RSS feed | 20 |
//! | Hugging Face blog | [`huggingface`] | HTML scraping | 15 |
//! | Product Hunt AI topic | [`producthunt`] | HTML scraping + keyword filter | 15 |
//! | r/MachineLearning, r/ClaudeAI | [`reddit`] | Atom feeds, merged | 10 per feed |
//! | AI News | [`ai_news`] | HTML scraping | 15 |
//! | Crescendo AI news | [`crescendo`] | HTML scraping | 15 |
//!
//! The set is closed: [`Adapter`] dispatches on [`SourceId`] and
//! [`registry`] returns one adapter per source in registration order.

use crate::error::FetchError;
use crate::http::HttpClient;
use crate::models::{Item, SourceId};
use chrono::Utc;

pub mod ai_news;
pub mod arxiv;
pub mod crescendo;
pub mod huggingface;
pub mod producthunt;
pub mod reddit;

/// Capability shared by every source.
pub trait SourceFetch {
    /// Which source this is; also its key in the snapshot.
    fn id(&self) -> SourceId;

    /// One attempt at fetching and parsing the source.
    async fn fetch(&self) -> Result<Vec<Item>, FetchError>;
}

impl<T: SourceFetch + ?Sized> SourceFetch for &T {
    fn id(&self) -> SourceId {
        (**self).id()
    }

    async fn fetch(&self) -> Result<Vec<Item>, FetchError> {
        (**self).fetch().await
    }
}

/// A registered production source.
#[derive(Debug, Clone)]
pub struct Adapter {
    id: SourceId,
    http: HttpClient,
}

impl Adapter {
    pub fn new(id: SourceId, http: HttpClient) -> Self {
        Self { id, http }
    }
}

impl SourceFetch for Adapter {
    fn id(&self) -> SourceId {
        self.id
    }

    async fn fetch(&self) -> Result<Vec<Item>, FetchError> {
        let now = Utc::now();
        match self.id {
            SourceId::Arxiv => arxiv::fetch(&self.http, now).await,
            SourceId::HuggingFace => huggingface::fetch(&self.http, now).await,
            SourceId::ProductHunt => producthunt::fetch(&self.http, now).await,
            SourceId::Reddit => reddit::fetch(&self.http, now).await,
            SourceId::AiNews => ai_news::fetch(&self.http, now).await,
            SourceId::Crescendo => crescendo::fetch(&self.http, now).await,
        }
    }
}

/// All production adapters, in registration order.
pub fn registry(http: &HttpClient) -> Vec<Adapter> {
    SourceId::ALL
        .iter()
        .map(|&id| Adapter::new(id, http.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_registry_order() {
        let http = HttpClient::new("test-agent", Duration::from_secs(1)).unwrap();
        let ids: Vec<SourceId> = registry(&http).iter().map(|a| a.id()).collect();
        assert_eq!(ids, SourceId::ALL.to_vec());
    }
}
