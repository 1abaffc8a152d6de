//! Upload cancellation with completions arriving on runtime worker threads

mod common;

use std::collections::HashMap;
use std::time::Duration;

use common::{setup, site, Harness};
use fluxsync::{ChangeEvent, LocalId};
use fluxsync_stores::app::{AppActionType, Changed};
use fluxsync_stores::media::{MediaAction, MediaChange, MediaPayload, UploadState, UploadStatus};
use fluxsync_stores::mock::MockServer;
use fluxsync_stores::model::Media;

const WAIT: Duration = Duration::from_secs(5);

fn terminal(event: &ChangeEvent<AppActionType, Changed>) -> Option<(LocalId, UploadStatus)> {
    match &event.data {
        Some(Changed::Media(MediaChange::Upload {
            local_id, status, ..
        })) => Some((*local_id, *status)),
        _ => None,
    }
}

fn terminal_events(harness: &Harness) -> Vec<(LocalId, UploadStatus)> {
    harness.events().iter().filter_map(terminal).collect()
}

fn start_uploads(harness: &Harness, count: usize) {
    let site = site();
    for n in 0..count {
        let media = Media::local_file(site.local_id, format!("photo-{n}.jpg"), "image/jpeg");
        harness.dispatch(MediaAction::UploadMedia(MediaPayload::new(site.clone(), media)));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_five_uploads_four_canceled() {
    let server = MockServer::new();
    server.hold_uploads();
    let (harness, stores) = setup(&server);

    start_uploads(&harness, 5);
    let ids = stores.media.read(|m| m.uploads_in_flight());
    assert_eq!(ids.len(), 5);
    assert_eq!(stores.media.in_flight(), 5);

    for id in &ids[..4] {
        harness.dispatch(MediaAction::CancelMediaUpload(*id));
    }
    server.release_uploads(5);

    harness
        .recorder
        .wait_for_count(5, |e| terminal(e).is_some(), WAIT)
        .await
        .expect("every upload ends");
    // Give any stray response time to show up
    tokio::time::sleep(Duration::from_millis(100)).await;

    let events = terminal_events(&harness);
    assert_eq!(events.len(), 5, "one terminal event per upload: {:?}", events);
    assert_eq!(events.iter().filter(|(_, s)| *s == UploadStatus::Canceled).count(), 4);
    assert_eq!(
        events
            .iter()
            .filter(|(_, s)| *s == UploadStatus::Completed)
            .map(|(id, _)| *id)
            .collect::<Vec<_>>(),
        vec![ids[4]]
    );

    assert_eq!(stores.media.read(|m| m.upload_state(ids[4])), Some(UploadState::Completed));
    for id in &ids[..4] {
        assert_eq!(stores.media.read(|m| m.upload_state(*id)), Some(UploadState::Canceled));
    }
    // Aborted requests never reached the server
    assert_eq!(server.calls("upload_media"), 1);
    assert_eq!(server.media_count(&site()), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_racing_completion_ends_each_upload_once() {
    let server = MockServer::new();
    server.hold_uploads();
    let (harness, stores) = setup(&server);

    start_uploads(&harness, 5);
    let ids = stores.media.read(|m| m.uploads_in_flight());

    // Completions and cancels now race
    server.release_uploads(5);
    for id in &ids {
        harness.dispatch(MediaAction::CancelMediaUpload(*id));
    }

    harness
        .recorder
        .wait_for_count(5, |e| terminal(e).is_some(), WAIT)
        .await
        .expect("every upload ends");
    tokio::time::sleep(Duration::from_millis(100)).await;

    let events = terminal_events(&harness);
    let mut outcome: HashMap<LocalId, UploadStatus> = HashMap::new();
    for (id, status) in &events {
        assert!(
            outcome.insert(*id, *status).is_none(),
            "upload {id} ended twice: {:?}",
            events
        );
    }
    assert_eq!(outcome.len(), 5);

    // The store agrees with what was published
    for (id, status) in outcome {
        assert_eq!(stores.media.read(|m| m.upload_state(id)), Some(UploadState::from(status)));
    }
    assert_eq!(stores.media.read(|m| m.uploads_in_flight()), Vec::<LocalId>::new());
}

#[tokio::test]
async fn test_cancel_after_completion_publishes_nothing() {
    let server = MockServer::new();
    let (harness, stores) = setup(&server);

    start_uploads(&harness, 1);
    let done = harness
        .wait_for(|e| terminal(e).is_some())
        .await
        .expect("upload ends");
    let (id, status) = terminal(&done).unwrap();
    assert_eq!(status, UploadStatus::Completed);

    harness.drain_events();
    harness.dispatch(MediaAction::CancelMediaUpload(id));

    assert!(harness.events().is_empty());
    assert_eq!(stores.media.read(|m| m.upload_state(id)), Some(UploadState::Completed));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_all_ends_running_uploads() {
    let server = MockServer::new();
    server.hold_uploads();
    let (harness, stores) = setup(&server);

    start_uploads(&harness, 2);
    let ids = stores.media.read(|m| m.uploads_in_flight());
    assert_eq!(ids.len(), 2);

    stores.cancel_all(&harness.dispatcher);
    server.release_uploads(2);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let events = terminal_events(&harness);
    assert_eq!(
        events,
        ids.iter().map(|id| (*id, UploadStatus::Canceled)).collect::<Vec<_>>()
    );
    assert_eq!(stores.media.read(|m| m.uploads_in_flight()), Vec::<LocalId>::new());
    assert_eq!(stores.media.in_flight(), 0);
    assert_eq!(server.calls("upload_media"), 0);

    // A canceled upload can be started again
    let media = stores.media.read(|m| m.media_by_local_id(ids[0])).expect("row kept");
    harness.dispatch(MediaAction::UploadMedia(MediaPayload::new(site(), media)));
    server.release_uploads(1);
    harness
        .recorder
        .wait_for_count(3, |e| terminal(e).is_some(), WAIT)
        .await
        .expect("retry ends");
    assert_eq!(stores.media.read(|m| m.upload_state(ids[0])), Some(UploadState::Completed));
}
