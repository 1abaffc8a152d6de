//! Media library and uploads
//!
//! Uploads are tracked per local id. The table below is the only authority
//! on an upload's fate:
//!
//! | state      | `CancelMediaUpload`         | `UploadedMedia` response    |
//! |------------|-----------------------------|-----------------------------|
//! | `InFlight` | abort, `Canceled` event     | `Completed` / `Failed` event |
//! | terminal   | ignored                     | dropped                     |
//!
//! so every upload ends with exactly one terminal event.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use fluxsync::{
    Action, ChangeError, ChangeEvent, Effect, LocalId, MemoryTable, Persistence, Reaction,
    RemoteId, Slice, TaskKey,
};
use tracing::debug;

use crate::client::{MediaClient, NetworkResult};
use crate::model::{Media, MediaUploadState, Site};

#[derive(Debug, Clone, PartialEq)]
pub struct FetchMediaListPayload {
    pub site: Site,
    pub load_more: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedMediaListPayload {
    pub site: Site,
    pub load_more: bool,
    pub result: NetworkResult<Vec<Media>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaPayload {
    pub site: Site,
    pub media: Media,
}

impl MediaPayload {
    pub fn new(site: Site, media: Media) -> Self {
        Self { site, media }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaResponsePayload {
    pub site: Site,
    pub media: Media,
    pub result: NetworkResult<Media>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeletedMediaPayload {
    pub site: Site,
    pub media: Media,
    pub result: NetworkResult<()>,
}

#[derive(Action, Clone, Debug, PartialEq)]
pub enum MediaAction {
    FetchMediaList(FetchMediaListPayload),
    FetchMedia(MediaPayload),
    PushMedia(MediaPayload),
    UploadMedia(MediaPayload),
    DeleteMedia(MediaPayload),

    FetchedMediaList(FetchedMediaListPayload),
    FetchedMedia(MediaResponsePayload),
    PushedMedia(MediaResponsePayload),
    UploadedMedia(MediaResponsePayload),
    DeletedMedia(DeletedMediaPayload),

    /// Abort an upload by the media's local id
    CancelMediaUpload(LocalId),
    /// Abort every running upload, each ending `Canceled`
    CancelAllUploads,
    UpdateMedia(Media),
    RemoveMedia(Media),
    RemoveAllSiteMedia(LocalId),
}

/// How an upload ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadStatus {
    Completed,
    Failed,
    Canceled,
}

/// Lifecycle of one upload
///
/// The request is spawned in the same dispatch that accepts the upload, so
/// an accepted upload is immediately `InFlight`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadState {
    InFlight,
    Completed,
    Failed,
    Canceled,
}

impl UploadState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, UploadState::InFlight)
    }
}

impl From<UploadStatus> for UploadState {
    fn from(status: UploadStatus) -> Self {
        match status {
            UploadStatus::Completed => UploadState::Completed,
            UploadStatus::Failed => UploadState::Failed,
            UploadStatus::Canceled => UploadState::Canceled,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediaChange {
    ListFetched {
        site: LocalId,
        count: usize,
        load_more: bool,
        can_load_more: bool,
    },
    Updated {
        local_id: LocalId,
    },
    Removed {
        count: usize,
    },
    /// Terminal upload event; `media` is the stored record on completion
    Upload {
        local_id: LocalId,
        status: UploadStatus,
        media: Option<Media>,
    },
}

type MediaReaction = Reaction<MediaAction, MediaChange>;

fn upload_key(local_id: LocalId) -> TaskKey {
    TaskKey::new(format!("media-upload-{local_id}"))
}

pub struct MediaLibrary {
    rows: MemoryTable<Media>,
    uploads: HashMap<LocalId, UploadState>,
    client: Arc<dyn MediaClient>,
    per_page: usize,
}

impl MediaLibrary {
    pub fn new(client: Arc<dyn MediaClient>, per_page: usize) -> Self {
        Self {
            rows: MemoryTable::new(),
            uploads: HashMap::new(),
            client,
            per_page,
        }
    }

    // ===== Reads =====

    pub fn all_site_media(&self, site: LocalId) -> Vec<Media> {
        self.rows.get_all_for_site(site)
    }

    pub fn site_media_with_id(&self, site: LocalId, remote: RemoteId) -> Option<Media> {
        self.rows.get_by_remote_id(site, remote)
    }

    pub fn media_by_local_id(&self, id: LocalId) -> Option<Media> {
        self.rows.get_by_id(id)
    }

    pub fn site_media_count(&self, site: LocalId) -> usize {
        self.rows.iter().filter(|m| m.local_site_id == site).count()
    }

    pub fn upload_state(&self, id: LocalId) -> Option<UploadState> {
        self.uploads.get(&id).copied()
    }

    /// Local ids of uploads still running, in id order
    pub fn uploads_in_flight(&self) -> Vec<LocalId> {
        let mut ids: Vec<LocalId> = self
            .uploads
            .iter()
            .filter(|(_, state)| !state.is_terminal())
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    // ===== Uploads =====

    fn upload_media(&mut self, payload: MediaPayload) -> MediaReaction {
        let MediaPayload { site, mut media } = payload;
        if self.upload_state(media.local_id) == Some(UploadState::InFlight) {
            debug!(store = Self::NAME, action = "UploadMedia", local_id = %media.local_id, "upload already running");
            return Reaction::unchanged();
        }

        media.local_site_id = site.local_id;
        let uploadable = media.is_uploadable();
        media.upload_state = if uploadable {
            MediaUploadState::Uploading
        } else {
            MediaUploadState::Failed
        };
        let local_id = self.rows.upsert(media.clone());
        media.local_id = local_id;

        if !uploadable {
            debug!(store = Self::NAME, action = "UploadMedia", %local_id, "missing file path or mime type");
            self.uploads.insert(local_id, UploadState::Failed);
            return Reaction::changed().emit(
                ChangeEvent::failed(
                    MediaActionType::UploadMedia,
                    ChangeError::validation(
                        "missing_file",
                        "Upload needs a file path and a mime type",
                    ),
                )
                .with_data(MediaChange::Upload {
                    local_id,
                    status: UploadStatus::Failed,
                    media: None,
                }),
            );
        }

        self.uploads.insert(local_id, UploadState::InFlight);
        let client = self.client.clone();
        debug!(store = Self::NAME, action = "UploadMedia", %local_id, "upload started");

        Reaction::changed().with(Effect::keyed(upload_key(local_id), async move {
            let result = client.upload_media(&site, &media).await;
            MediaAction::UploadedMedia(MediaResponsePayload {
                site,
                media,
                result,
            })
        }))
    }

    fn uploaded_media(&mut self, payload: MediaResponsePayload) -> MediaReaction {
        let local_id = payload.media.local_id;
        let state = self.upload_state(local_id);
        if state != Some(UploadState::InFlight) {
            debug!(store = Self::NAME, action = "UploadedMedia", %local_id, ?state, "late upload response dropped");
            return Reaction::unchanged();
        }

        match payload.result {
            Ok(mut remote) => {
                remote.local_id = local_id;
                remote.local_site_id = payload.site.local_id;
                remote.upload_state = MediaUploadState::Uploaded;
                if remote.file_path.is_none() {
                    remote.file_path = payload.media.file_path;
                }
                self.rows.upsert(remote.clone());
                self.uploads.insert(local_id, UploadState::Completed);
                debug!(store = Self::NAME, action = "UploadedMedia", %local_id, "upload completed");

                Reaction::changed().emit(ChangeEvent::ok(
                    MediaActionType::UploadedMedia,
                    MediaChange::Upload {
                        local_id,
                        status: UploadStatus::Completed,
                        media: Some(remote),
                    },
                ))
            }
            Err(error) => {
                self.set_row_state(local_id, MediaUploadState::Failed);
                self.uploads.insert(local_id, UploadState::Failed);
                debug!(store = Self::NAME, action = "UploadedMedia", %local_id, %error, "upload failed");

                Reaction::changed().emit(
                    ChangeEvent::failed(MediaActionType::UploadedMedia, error).with_data(
                        MediaChange::Upload {
                            local_id,
                            status: UploadStatus::Failed,
                            media: None,
                        },
                    ),
                )
            }
        }
    }

    /// Cancel an in-flight upload, marking it `Canceled`.
    /// Returns the abort effect and the terminal event, or `None` if there
    /// was nothing to cancel.
    fn cancel_upload(
        &mut self,
        local_id: LocalId,
        cause: MediaActionType,
    ) -> Option<(Effect<MediaAction>, ChangeEvent<MediaActionType, MediaChange>)> {
        if self.upload_state(local_id) != Some(UploadState::InFlight) {
            return None;
        }
        self.uploads.insert(local_id, UploadState::Canceled);
        self.set_row_state(local_id, MediaUploadState::Canceled);
        debug!(store = Self::NAME, %local_id, "upload canceled");

        Some((
            Effect::cancel(upload_key(local_id)),
            ChangeEvent::ok(
                cause,
                MediaChange::Upload {
                    local_id,
                    status: UploadStatus::Canceled,
                    media: None,
                },
            ),
        ))
    }

    fn set_row_state(&mut self, local_id: LocalId, state: MediaUploadState) {
        if let Some(mut row) = self.rows.get_by_id(local_id) {
            row.upload_state = state;
            self.rows.upsert(row);
        }
    }

    // ===== Library =====

    fn fetch_media_list(&self, payload: FetchMediaListPayload) -> MediaReaction {
        let offset = if payload.load_more {
            self.rows
                .iter()
                .filter(|m| m.local_site_id == payload.site.local_id && m.remote_id.is_some())
                .count()
        } else {
            0
        };
        let client = self.client.clone();
        let number = self.per_page;
        debug!(store = Self::NAME, action = "FetchMediaList", site = %payload.site.local_id, offset, "requesting media");

        Reaction::unchanged().request(async move {
            let result = client.fetch_media_list(&payload.site, offset, number).await;
            MediaAction::FetchedMediaList(FetchedMediaListPayload {
                site: payload.site,
                load_more: payload.load_more,
                result,
            })
        })
    }

    fn fetched_media_list(&mut self, payload: FetchedMediaListPayload) -> MediaReaction {
        let list = match payload.result {
            Ok(list) => list,
            Err(error) => {
                return Reaction::unchanged()
                    .emit(ChangeEvent::failed(MediaActionType::FetchedMediaList, error))
            }
        };
        let site = payload.site.local_id;
        if !payload.load_more {
            let returned: HashSet<RemoteId> = list.iter().filter_map(|m| m.remote_id).collect();
            self.rows.remove_where(|m| {
                m.local_site_id == site
                    && m.upload_state == MediaUploadState::Uploaded
                    && m.remote_id.is_some_and(|id| !returned.contains(&id))
            });
        }
        let count = list.len();
        for media in list {
            self.store_remote(site, media);
        }

        Reaction::changed().emit(ChangeEvent::ok(
            MediaActionType::FetchedMediaList,
            MediaChange::ListFetched {
                site,
                count,
                load_more: payload.load_more,
                can_load_more: count == self.per_page,
            },
        ))
    }

    fn store_remote(&mut self, site: LocalId, mut media: Media) -> LocalId {
        media.local_id = media
            .remote_id
            .and_then(|remote| self.rows.get_by_remote_id(site, remote))
            .map(|m| m.local_id)
            .unwrap_or_default();
        media.local_site_id = site;
        media.upload_state = MediaUploadState::Uploaded;
        self.rows.upsert(media)
    }

    /// Validate a request that needs an uploaded media item
    fn require_remote(
        payload: &MediaPayload,
        cause: MediaActionType,
    ) -> Result<RemoteId, MediaReaction> {
        payload.media.remote_id.ok_or_else(|| {
            Reaction::unchanged().emit(ChangeEvent::failed(
                cause,
                ChangeError::validation("unknown_media", "Media has not been uploaded"),
            ))
        })
    }

    fn fetch_media(&self, payload: MediaPayload) -> MediaReaction {
        let remote_id = match Self::require_remote(&payload, MediaActionType::FetchMedia) {
            Ok(id) => id,
            Err(reaction) => return reaction,
        };
        let client = self.client.clone();
        Reaction::unchanged().request(async move {
            let result = client.fetch_media(&payload.site, remote_id).await;
            MediaAction::FetchedMedia(MediaResponsePayload {
                site: payload.site,
                media: payload.media,
                result,
            })
        })
    }

    fn push_media(&self, payload: MediaPayload) -> MediaReaction {
        if let Err(reaction) = Self::require_remote(&payload, MediaActionType::PushMedia) {
            return reaction;
        }
        let client = self.client.clone();
        debug!(store = Self::NAME, action = "PushMedia", local_id = %payload.media.local_id, "pushing media");
        Reaction::unchanged().request(async move {
            let result = client.push_media(&payload.site, &payload.media).await;
            MediaAction::PushedMedia(MediaResponsePayload {
                site: payload.site,
                media: payload.media,
                result,
            })
        })
    }

    fn delete_media(&self, payload: MediaPayload) -> MediaReaction {
        let remote_id = match Self::require_remote(&payload, MediaActionType::DeleteMedia) {
            Ok(id) => id,
            Err(reaction) => return reaction,
        };
        let client = self.client.clone();
        debug!(store = Self::NAME, action = "DeleteMedia", local_id = %payload.media.local_id, %remote_id, "deleting media");
        Reaction::unchanged().request(async move {
            let result = client.delete_media(&payload.site, remote_id).await;
            MediaAction::DeletedMedia(DeletedMediaPayload {
                site: payload.site,
                media: payload.media,
                result,
            })
        })
    }

    fn media_response(&mut self, cause: MediaActionType, payload: MediaResponsePayload) -> MediaReaction {
        match payload.result {
            Ok(remote) => {
                let local_id = self.store_remote(payload.site.local_id, remote);
                Reaction::changed().emit(ChangeEvent::ok(cause, MediaChange::Updated { local_id }))
            }
            Err(error) => Reaction::unchanged().emit(ChangeEvent::failed(cause, error)),
        }
    }

    fn remove(&mut self, media: Media) -> MediaReaction {
        let mut reaction = Reaction::changed();
        if let Some((effect, event)) = self.cancel_upload(media.local_id, MediaActionType::RemoveMedia) {
            reaction = reaction.with(effect).emit(event);
        }
        self.uploads.remove(&media.local_id);
        let count = usize::from(self.rows.remove_by_id(media.local_id).is_some());
        reaction.emit(ChangeEvent::ok(
            MediaActionType::RemoveMedia,
            MediaChange::Removed { count },
        ))
    }

    fn remove_all_for_site(&mut self, site: LocalId) -> MediaReaction {
        let mut reaction = Reaction::changed();
        let ids: Vec<LocalId> = self
            .rows
            .iter()
            .filter(|m| m.local_site_id == site)
            .map(|m| m.local_id)
            .collect();
        for id in &ids {
            if let Some((effect, event)) =
                self.cancel_upload(*id, MediaActionType::RemoveAllSiteMedia)
            {
                reaction = reaction.with(effect).emit(event);
            }
            self.uploads.remove(id);
        }
        let count = self.rows.remove_all_for_site(site);
        reaction.emit(ChangeEvent::ok(
            MediaActionType::RemoveAllSiteMedia,
            MediaChange::Removed { count },
        ))
    }
}

impl Slice for MediaLibrary {
    type Action = MediaAction;
    type Change = MediaChange;
    const NAME: &'static str = "media";
    const DOMAIN: &'static str = MediaActionType::DOMAIN;

    fn reduce(&mut self, action: MediaAction) -> MediaReaction {
        match action {
            MediaAction::FetchMediaList(payload) => self.fetch_media_list(payload),
            MediaAction::FetchMedia(payload) => self.fetch_media(payload),
            MediaAction::PushMedia(payload) => self.push_media(payload),
            MediaAction::UploadMedia(payload) => self.upload_media(payload),
            MediaAction::DeleteMedia(payload) => self.delete_media(payload),

            MediaAction::FetchedMediaList(payload) => self.fetched_media_list(payload),
            MediaAction::FetchedMedia(payload) => {
                self.media_response(MediaActionType::FetchedMedia, payload)
            }
            MediaAction::PushedMedia(payload) => {
                self.media_response(MediaActionType::PushedMedia, payload)
            }
            MediaAction::UploadedMedia(payload) => self.uploaded_media(payload),
            MediaAction::DeletedMedia(payload) => match payload.result {
                Ok(()) => {
                    let local_id = payload
                        .media
                        .remote_id
                        .and_then(|r| self.rows.get_by_remote_id(payload.site.local_id, r))
                        .map(|m| m.local_id)
                        .unwrap_or(payload.media.local_id);
                    let count = usize::from(self.rows.remove_by_id(local_id).is_some());
                    Reaction::changed().emit(ChangeEvent::ok(
                        MediaActionType::DeletedMedia,
                        MediaChange::Removed { count },
                    ))
                }
                Err(error) => Reaction::unchanged()
                    .emit(ChangeEvent::failed(MediaActionType::DeletedMedia, error)),
            },

            MediaAction::CancelMediaUpload(local_id) => {
                match self.cancel_upload(local_id, MediaActionType::CancelMediaUpload) {
                    Some((effect, event)) => Reaction::changed().with(effect).emit(event),
                    None => {
                        debug!(store = Self::NAME, action = "CancelMediaUpload", %local_id, "no upload in flight");
                        Reaction::unchanged()
                    }
                }
            }
            MediaAction::CancelAllUploads => {
                let mut reaction = Reaction::unchanged();
                for local_id in self.uploads_in_flight() {
                    if let Some((effect, event)) =
                        self.cancel_upload(local_id, MediaActionType::CancelAllUploads)
                    {
                        reaction = reaction.with(effect).emit(event);
                    }
                }
                if reaction.events.is_empty() {
                    reaction
                } else {
                    reaction.mark_changed()
                }
            }
            MediaAction::UpdateMedia(media) => {
                let local_id = self.rows.upsert(media);
                Reaction::changed().emit(ChangeEvent::ok(
                    MediaActionType::UpdateMedia,
                    MediaChange::Updated { local_id },
                ))
            }
            MediaAction::RemoveMedia(media) => self.remove(media),
            MediaAction::RemoveAllSiteMedia(site) => self.remove_all_for_site(site),
        }
    }
}
