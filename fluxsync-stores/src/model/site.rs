use fluxsync::{LocalId, Model, RemoteId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Site {
    pub local_id: LocalId,
    pub site_id: Option<RemoteId>,
    pub url: String,
    pub name: String,
    pub has_woocommerce: bool,
    pub is_wpcom: bool,
}

impl Model for Site {
    fn local_id(&self) -> LocalId {
        self.local_id
    }

    fn set_local_id(&mut self, id: LocalId) {
        self.local_id = id;
    }

    fn remote_id(&self) -> Option<RemoteId> {
        self.site_id
    }
}

impl Site {
    pub fn new(site_id: i64, url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            site_id: Some(RemoteId(site_id)),
            url: url.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}
