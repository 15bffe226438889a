//! Request router for UI surfaces.
//!
//! Handlers are stateless per call. Reads return whatever is present at the
//! moment they run; a `getScreenshot` can race an eviction.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::cache::{BoundedCache, TitleIndex};
use crate::display::DisplayController;
use crate::error::Result;
use crate::identifiers::TabId;
use crate::protocol::{Envelope, Request, Response, TabMetadata, requested_tab_ids};
use crate::storage::{Mirror, screenshot_key};

// ============================================================================
// RequestRouter
// ============================================================================

/// Serves UI requests against the caches.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct RequestRouter {
    cache: Arc<BoundedCache>,
    titles: Arc<TitleIndex>,
    mirror: Mirror,
    display: Arc<DisplayController>,
}

impl RequestRouter {
    /// Creates a router over the shared components.
    pub fn new(
        cache: Arc<BoundedCache>,
        titles: Arc<TitleIndex>,
        mirror: Mirror,
        display: Arc<DisplayController>,
    ) -> Self {
        Self {
            cache,
            titles,
            mirror,
            display,
        }
    }

    /// Dispatches a typed request.
    pub async fn dispatch(&self, request: Request) -> Response {
        debug!(action = request.action(), "Dispatching request");

        match request {
            Request::GetScreenshot { tab_id } => Response::Screenshot {
                screenshot: self.get_screenshot(tab_id).await,
            },
            Request::GetCachedMetadata { tab_ids } => Response::Metadata {
                metadata: self.get_cached_metadata(&requested_tab_ids(&tab_ids)),
            },
            Request::OpenOverlay { tab_id } => {
                Response::Overlay(self.display.open_overlay(tab_id).await)
            }
        }
    }

    /// Dispatches a raw request object and returns the reply object.
    ///
    /// Malformed requests produce an `{ "error": ... }` reply rather than an
    /// error, so nothing is thrown across the message boundary.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] only if the reply cannot be serialized.
    pub async fn dispatch_value(&self, body: Value) -> Result<Value> {
        let fallback_id = body.get("id").cloned();

        match Envelope::from_value(body) {
            Ok(Envelope { id, request }) => self.dispatch(request).await.to_value_with_id(id),
            Err(e) => {
                debug!(error = %e, "Rejected request");
                Response::error(&e).to_value_with_id(fallback_id)
            }
        }
    }

    /// Memory tier first, durable mirror on a miss.
    pub async fn get_screenshot(&self, tab_id: TabId) -> Option<String> {
        if let Some(hit) = self.cache.get(tab_id) {
            return Some(hit.to_string());
        }

        match self.mirror.read(&screenshot_key(tab_id)).await {
            Some(Value::String(data_url)) if !data_url.is_empty() => Some(data_url),
            _ => None,
        }
    }

    /// Titles for the requested tabs, hits only.
    #[must_use]
    pub fn get_cached_metadata(&self, tab_ids: &[TabId]) -> BTreeMap<String, TabMetadata> {
        self.titles
            .get_many(tab_ids)
            .into_iter()
            .map(|(id, title)| (id.to_string(), TabMetadata { title }))
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
