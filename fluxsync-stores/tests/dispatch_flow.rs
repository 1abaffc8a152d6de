//! End-to-end flows through the dispatcher and the registered stores

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{setup, site};
use fluxsync::{
    assert_emitted, assert_not_emitted, count_emitted, find_emitted, Action, ChangeEvent,
    Dispatcher, ErrorKind, NetworkError, Subscriber, SubscriberError,
};
use fluxsync_stores::app::{AppAction, AppActionType, Changed};
use fluxsync_stores::comment::{CommentAction, CommentActionType, RemoteCommentPayload};
use fluxsync_stores::mock::MockServer;
use fluxsync_stores::model::{Comment, Post, PostKind};
use fluxsync_stores::post::{
    FetchPostsPayload, PostAction, PostActionType, PostChange, RemotePostPayload,
};
use fluxsync_stores::model::{OrderStatsV4, StatsGranularity};
use fluxsync_stores::site::SiteAction;
use fluxsync_stores::stats::{FetchOrderStatsPayload, StatsAction, StatsActionType, StatsChange};

fn fetch_posts(load_more: bool) -> PostAction {
    PostAction::FetchPosts(FetchPostsPayload {
        site: site(),
        kind: PostKind::Post,
        load_more,
    })
}

fn is_fetched(event: &ChangeEvent<AppActionType, Changed>) -> bool {
    event.cause == AppActionType::Post(PostActionType::FetchedPosts)
}

#[tokio::test]
async fn test_actions_delivered_once_in_order() {
    let server = MockServer::new();
    let (harness, _stores) = setup(&server);
    let site = site();

    let first = Post::draft(site.local_id, PostKind::Post).with_title("one");
    let second = Post::draft(site.local_id, PostKind::Page).with_title("two");
    harness.dispatch(PostAction::UpdatePost(first));
    harness.dispatch(SiteAction::UpdateSite(site.clone()));
    harness.dispatch(PostAction::UpdatePost(second));

    let names: Vec<_> = harness.actions().iter().map(|a| a.name()).collect();
    assert_eq!(names, vec!["UpdatePost", "UpdateSite", "UpdatePost"]);

    let causes: Vec<_> = harness.events().iter().map(|e| e.cause).collect();
    assert_eq!(
        causes,
        vec![
            AppActionType::Post(PostActionType::UpdatePost),
            AppActionType::Site(fluxsync_stores::site::SiteActionType::UpdateSite),
            AppActionType::Post(PostActionType::UpdatePost),
        ]
    );
}

#[tokio::test]
async fn test_local_action_visible_before_dispatch_returns() {
    let server = MockServer::new();
    let (harness, stores) = setup(&server);
    let site = site();

    let reached = harness.dispatch(PostAction::UpdatePost(
        Post::draft(site.local_id, PostKind::Post).with_title("draft"),
    ));

    // recorder + post store
    assert_eq!(reached, 2);
    let drafts = stores.posts.read(|p| p.local_drafts_for_site(site.local_id));
    assert_eq!(drafts.len(), 1);
    assert_emitted!(
        harness.events(),
        ChangeEvent {
            data: Some(Changed::Post(PostChange::Updated { .. })),
            error: None,
            ..
        }
    );
    assert_eq!(server.total_calls(), 0);
}

#[tokio::test]
async fn test_fetch_success_populates_store() {
    let server = MockServer::new();
    let site = site();
    for n in 0..3 {
        server.add_post(&site, Post::draft(site.local_id, PostKind::Post).with_title(format!("p{n}")));
    }
    let (harness, stores) = setup(&server);

    harness.dispatch(fetch_posts(false));
    let event = harness.wait_for(is_fetched).await.expect("fetch completes");

    assert!(event.error.is_none());
    assert_eq!(
        event.data,
        Some(Changed::Post(PostChange::Fetched {
            site: site.local_id,
            kind: PostKind::Post,
            count: 3,
            load_more: false,
            can_load_more: false,
        }))
    );
    assert_eq!(stores.posts.read(|p| p.post_count_for_site(site.local_id, PostKind::Post)), 3);
    // The response went through dispatch like any other action
    assert_emitted!(harness.actions(), AppAction::Post(PostAction::FetchedPosts(_)));
}

#[tokio::test]
async fn test_fetch_failure_reports_error_and_keeps_state() {
    let server = MockServer::new();
    let site = site();
    let (harness, stores) = setup(&server);
    harness.dispatch(PostAction::UpdatePost(
        Post::draft(site.local_id, PostKind::Post).with_title("kept"),
    ));
    server.fail_with(NetworkError::api("rest_forbidden", "nope"));

    harness.dispatch(fetch_posts(false));
    let event = harness.wait_for(is_fetched).await.expect("fetch completes");

    let error = event.error.expect("error event");
    assert_eq!(error.kind, ErrorKind::Api);
    assert_eq!(error.code, "rest_forbidden");
    assert!(event.data.is_none());
    assert_eq!(stores.posts.read(|p| p.len()), 1);
}

#[tokio::test]
async fn test_identical_fetches_are_idempotent() {
    let server = MockServer::new();
    let site = site();
    server.add_post(&site, Post::draft(site.local_id, PostKind::Post).with_title("a"));
    server.add_post(&site, Post::draft(site.local_id, PostKind::Post).with_title("b"));
    let (harness, stores) = setup(&server);

    harness.dispatch(fetch_posts(false));
    harness.wait_for(is_fetched).await.expect("first fetch");
    let before = stores.posts.read(|p| p.posts_for_site(site.local_id));

    harness.drain_events();
    harness.dispatch(fetch_posts(false));
    harness.wait_for(is_fetched).await.expect("second fetch");
    let after = stores.posts.read(|p| p.posts_for_site(site.local_id));

    assert_eq!(before, after);
    assert_eq!(after.len(), 2);
}

#[tokio::test]
async fn test_validation_short_circuits_network() {
    let server = MockServer::new();
    let site = site();
    let (harness, _stores) = setup(&server);

    harness.dispatch(PostAction::PushPost(RemotePostPayload::new(
        site.clone(),
        Post::draft(site.local_id, PostKind::Post),
    )));
    harness.dispatch(CommentAction::PushComment(RemoteCommentPayload::new(
        site.clone(),
        Comment::new(site.local_id, fluxsync::RemoteId(1), "   "),
    )));

    // Both failures were published synchronously
    let events = harness.events();
    assert_eq!(
        count_emitted!(
            events,
            ChangeEvent {
                error: Some(fluxsync::ChangeError {
                    kind: ErrorKind::Validation,
                    ..
                }),
                ..
            }
        ),
        2
    );
    let comment = find_emitted!(
        events,
        ChangeEvent {
            cause: AppActionType::Comment(CommentActionType::PushComment),
            ..
        }
    )
    .expect("comment failure");
    assert_eq!(comment.error.as_ref().unwrap().code, "empty_content");
    assert_eq!(server.total_calls(), 0);
    assert_not_emitted!(harness.actions(), AppAction::Post(PostAction::PushedPost(_)));
}

/// Fails every delivery, one way or another
struct Faulty {
    panic: bool,
    seen: AtomicUsize,
}

impl Subscriber<AppAction, Changed> for Faulty {
    fn name(&self) -> &str {
        "faulty"
    }

    fn on_action(&self, _: &AppAction, _: &Dispatcher<AppAction, Changed>) -> Result<(), SubscriberError> {
        self.seen.fetch_add(1, Ordering::SeqCst);
        if self.panic {
            panic!("faulty subscriber");
        }
        Err(SubscriberError::msg("rejected"))
    }

    fn on_change(
        &self,
        _: &ChangeEvent<AppActionType, Changed>,
        _: &Dispatcher<AppAction, Changed>,
    ) -> Result<(), SubscriberError> {
        Err(SubscriberError::msg("rejected"))
    }
}

#[tokio::test]
async fn test_failing_subscribers_are_isolated() {
    let server = MockServer::new();
    let site = site();
    let (harness, stores) = setup(&server);
    let erroring = harness.register(Arc::new(Faulty {
        panic: false,
        seen: AtomicUsize::new(0),
    }));
    let panicking = harness.register(Arc::new(Faulty {
        panic: true,
        seen: AtomicUsize::new(0),
    }));

    harness.dispatch(PostAction::UpdatePost(
        Post::draft(site.local_id, PostKind::Post).with_title("survives"),
    ));
    harness.dispatch(PostAction::UpdatePost(
        Post::draft(site.local_id, PostKind::Post).with_title("again"),
    ));

    assert_eq!(erroring.seen.load(Ordering::SeqCst), 2);
    assert_eq!(panicking.seen.load(Ordering::SeqCst), 2);
    assert_eq!(stores.posts.read(|p| p.len()), 2);
    assert_eq!(harness.events().len(), 2);
}

#[tokio::test]
async fn test_stores_register_once() {
    let server = MockServer::new();
    let (harness, stores) = setup(&server);

    assert!(stores.register(&harness.dispatcher).is_err());
    // recorder + eight stores
    assert_eq!(harness.dispatcher.len(), 9);
}

#[tokio::test]
async fn test_order_stats_served_from_cache_until_forced() {
    let server = MockServer::new();
    let site = site();
    server.set_order_stats(
        &site,
        OrderStatsV4 {
            granularity: StatsGranularity::Months,
            ..Default::default()
        },
    );
    let (harness, stores) = setup(&server);
    let fetch = FetchOrderStatsPayload::new(site.clone(), StatsGranularity::Months);
    let fetched = |e: &ChangeEvent<AppActionType, Changed>| {
        e.cause == AppActionType::Stats(StatsActionType::FetchedOrderStatsV4)
    };

    harness.dispatch(StatsAction::FetchOrderStatsV4(fetch.clone()));
    harness.wait_for(fetched).await.expect("first fetch");
    assert!(stores
        .stats
        .read(|s| s.order_stats(site.local_id, StatsGranularity::Months).is_some()));

    // Answered synchronously from the cache
    harness.drain_events();
    harness.dispatch(StatsAction::FetchOrderStatsV4(fetch.clone()));
    assert_emitted!(
        harness.events(),
        ChangeEvent {
            data: Some(Changed::Stats(StatsChange::OrderStats { cached: true, .. })),
            ..
        }
    );
    assert_eq!(server.calls("fetch_order_stats_v4"), 1);

    harness.dispatch(StatsAction::FetchOrderStatsV4(fetch.forced()));
    harness.wait_for(fetched).await.expect("forced fetch");
    assert_eq!(server.calls("fetch_order_stats_v4"), 2);
}
