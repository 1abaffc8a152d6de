use fluxsync::{LocalId, Model, RemoteId};
use serde::{Deserialize, Serialize};

/// The signed-in user. There is at most one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Account {
    pub local_id: LocalId,
    pub user_id: Option<RemoteId>,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub primary_site_id: Option<RemoteId>,
}

impl Model for Account {
    fn local_id(&self) -> LocalId {
        self.local_id
    }

    fn set_local_id(&mut self, id: LocalId) {
        self.local_id = id;
    }

    fn remote_id(&self) -> Option<RemoteId> {
        self.user_id
    }
}

/// What happens to the user's site and address when the username changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsernameAction {
    #[default]
    KeepOldSiteAndAddress,
    CreateNewSiteAndAddress,
    RenameSiteAndDiscardOldAddress,
    RenameSiteAndKeepOldAddress,
}
