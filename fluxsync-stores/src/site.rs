//! Sites the account can reach
//!
//! Other stores refer to sites by local id only; this store owns the rows.

use std::collections::HashSet;
use std::sync::Arc;

use fluxsync::{Action, ChangeEvent, LocalId, MemoryTable, Persistence, Reaction, RemoteId, Slice};
use tracing::debug;

use crate::client::{NetworkResult, SiteClient};
use crate::model::Site;

#[derive(Action, Clone, Debug, PartialEq)]
pub enum SiteAction {
    FetchSites,
    FetchedSites(NetworkResult<Vec<Site>>),
    UpdateSite(Site),
    RemoveSite(Site),
    RemoveAllSites,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SiteChange {
    Fetched { count: usize, removed: usize },
    Updated { local_id: LocalId },
    Removed { count: usize },
}

pub struct Sites {
    rows: MemoryTable<Site>,
    client: Arc<dyn SiteClient>,
}

impl Sites {
    pub fn new(client: Arc<dyn SiteClient>) -> Self {
        Self {
            rows: MemoryTable::new(),
            client,
        }
    }

    pub fn sites(&self) -> Vec<Site> {
        self.rows.iter().cloned().collect()
    }

    pub fn site_by_local_id(&self, id: LocalId) -> Option<Site> {
        self.rows.get_by_id(id)
    }

    pub fn site_by_remote_id(&self, site_id: RemoteId) -> Option<Site> {
        self.rows.get_by_remote_id(LocalId::default(), site_id)
    }

    pub fn woocommerce_sites(&self) -> Vec<Site> {
        self.rows
            .iter()
            .filter(|s| s.has_woocommerce)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn fetched_sites(&mut self, sites: Vec<Site>) -> Reaction<SiteAction, SiteChange> {
        let seen: HashSet<RemoteId> = sites.iter().filter_map(|s| s.site_id).collect();
        let removed = self
            .rows
            .remove_where(|s| s.site_id.is_some_and(|id| !seen.contains(&id)));
        let count = sites.len();
        for mut site in sites {
            // Match on the remote id so existing rows keep their local id
            site.local_id = LocalId::default();
            self.rows.upsert(site);
        }
        debug!(store = Self::NAME, action = "FetchedSites", count, removed, "sites synced");

        Reaction::changed().emit(ChangeEvent::ok(
            SiteActionType::FetchedSites,
            SiteChange::Fetched { count, removed },
        ))
    }
}

impl Slice for Sites {
    type Action = SiteAction;
    type Change = SiteChange;
    const NAME: &'static str = "sites";
    const DOMAIN: &'static str = SiteActionType::DOMAIN;

    fn reduce(&mut self, action: SiteAction) -> Reaction<SiteAction, SiteChange> {
        match action {
            SiteAction::FetchSites => {
                let client = self.client.clone();
                Reaction::unchanged()
                    .request(async move { SiteAction::FetchedSites(client.fetch_sites().await) })
            }
            SiteAction::FetchedSites(Ok(sites)) => self.fetched_sites(sites),
            SiteAction::FetchedSites(Err(error)) => {
                Reaction::unchanged().emit(ChangeEvent::failed(SiteActionType::FetchedSites, error))
            }
            SiteAction::UpdateSite(site) => {
                let local_id = self.rows.upsert(site);
                Reaction::changed().emit(ChangeEvent::ok(
                    SiteActionType::UpdateSite,
                    SiteChange::Updated { local_id },
                ))
            }
            SiteAction::RemoveSite(site) => {
                let count = usize::from(self.rows.remove_by_id(site.local_id).is_some());
                Reaction::changed().emit(ChangeEvent::ok(
                    SiteActionType::RemoveSite,
                    SiteChange::Removed { count },
                ))
            }
            SiteAction::RemoveAllSites => {
                let count = self.rows.len();
                self.rows.clear();
                Reaction::changed().emit(ChangeEvent::ok(
                    SiteActionType::RemoveAllSites,
                    SiteChange::Removed { count },
                ))
            }
        }
    }
}
