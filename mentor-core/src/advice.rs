//! Reconciliation store for advice threads.
//!
//! Holds the in-memory list of threads for the current advisor context and
//! merges server responses into it. Entries are unique by thread id;
//! `upsert` is the single merge point for both create and update outcomes,
//! so callers never need to know which case occurred.

use std::collections::HashSet;

use futures::future::try_join_all;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::models::{Advice, AdviceRequest, AdviceView, ApiKind, Asesor};

#[derive(Default)]
pub struct AdviceStore {
    entries: Vec<AdviceView>,
    selected: Option<i64>,
}

impl AdviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[AdviceView] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&AdviceView> {
        self.entries.iter().find(|v| v.id() == id)
    }

    pub fn selected(&self) -> Option<&AdviceView> {
        self.selected.and_then(|id| self.get(id))
    }

    pub fn selected_id(&self) -> Option<i64> {
        self.selected
    }

    /// Select a thread for the chat surface. Returns false if the id is not
    /// in the store.
    pub fn select(&mut self, id: i64) -> bool {
        if self.get(id).is_some() {
            self.selected = Some(id);
            true
        } else {
            false
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    // ========================================================================
    // Reconciliation
    // ========================================================================

    /// Merge one thread: same id → replace in place (list order preserved),
    /// new id → prepend (newest-first display bias).
    pub fn upsert(&mut self, view: AdviceView) {
        match self.entries.iter_mut().find(|v| v.id() == view.id()) {
            Some(existing) => *existing = view,
            None => self.entries.insert(0, view),
        }
    }

    /// Drop the thread with that id, if present. Clears the selection when
    /// it pointed at the removed thread. Idempotent.
    pub fn remove(&mut self, id: i64) {
        self.entries.retain(|v| v.id() != id);
        if self.selected == Some(id) {
            self.selected = None;
        }
    }

    /// Presentation order: descending by id, newest thread first,
    /// independent of insertion order.
    pub fn sorted_for_display(&self) -> Vec<&AdviceView> {
        let mut views: Vec<&AdviceView> = self.entries.iter().collect();
        views.sort_by(|a, b| b.id().cmp(&a.id()));
        views
    }

    /// Reload every listed assignment concurrently and replace the store's
    /// contents. Advisors with no threads yet (the suppressed 404) simply
    /// contribute nothing; one genuine failure aborts the whole load.
    pub async fn load_all(
        &mut self,
        client: &ApiClient,
        asesores: &[Asesor],
    ) -> Result<usize, ApiError> {
        let listings = try_join_all(asesores.iter().map(|asesor| async move {
            let resp = client.get_advisorys(asesor.id).await?;
            let views: Vec<AdviceView> = resp
                .advisorys
                .into_iter()
                .map(|advice| AdviceView {
                    advice,
                    asesor_id: asesor.id,
                    asesor_name: asesor.professional.name.clone(),
                })
                .collect();
            Ok::<_, ApiError>(views)
        }))
        .await?;

        // Invariant: no two entries share an id. First occurrence wins.
        let mut seen = HashSet::new();
        self.entries = listings
            .into_iter()
            .flatten()
            .filter(|v| seen.insert(v.id()))
            .collect();

        if let Some(selected) = self.selected {
            if !seen.contains(&selected) {
                self.selected = None;
            }
        }

        tracing::debug!(threads = self.entries.len(), "advice store reloaded");
        Ok(self.entries.len())
    }

    // ========================================================================
    // Chat flow
    // ========================================================================

    /// Send one chat message. With no thread selected a new one is created;
    /// otherwise the selected thread is extended. Either way the full thread
    /// is then re-fetched (the answer details only come back on the detail
    /// lookup) and merged, and becomes the selection.
    pub async fn send_message(
        &mut self,
        client: &ApiClient,
        asesor_id: i64,
        asesor_name: &str,
        ask: &str,
        api_type: ApiKind,
    ) -> Result<Advice, ApiError> {
        let ask = ask.trim();
        if ask.is_empty() {
            return Err(ApiError::Validation {
                field: "ask",
                message: "el mensaje no puede estar vacío".to_string(),
            });
        }

        let request = AdviceRequest {
            user_professional_id: asesor_id,
            ask: ask.to_string(),
            api_type,
            image: None,
        };

        let created = match self.selected {
            Some(id) => client.update_advice(id, &request).await?,
            None => client.create_advice(&request).await?,
        };

        // Strictly sequential: the detail fetch depends on the id the
        // create/update returned.
        let full = client.get_advice(created.advice.id).await?;
        let advice = full.advice.clone();

        self.upsert(AdviceView {
            advice: full.advice,
            asesor_id,
            asesor_name: asesor_name.to_string(),
        });
        self.selected = Some(advice.id);

        Ok(advice)
    }

    /// Delete a thread server-side, then locally.
    pub async fn delete_thread(&mut self, client: &ApiClient, id: i64) -> Result<(), ApiError> {
        client.delete_advice(id).await?;
        self.remove(id);
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
