//! Site statistics: post detail views, comment insights and WooCommerce
//! order stats.
//!
//! Every fetch goes through a per-site cache. A fetch that is not `forced`
//! is answered from the cache while the cached entry is younger than the
//! configured max age (and, for comment insights, covers at least as many
//! rows as asked for); the answer is a change event with `cached: true` and
//! no request is made. A success response without a body is reported as
//! `invalid_response` and leaves the cache alone.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fluxsync::{Action, ChangeError, ChangeEvent, Effect, LocalId, Reaction, RemoteId, Slice};
use tracing::debug;

use crate::client::{NetworkResult, StatsClient};
use crate::model::{CommentInsights, LimitMode, OrderStatsV4, PostDetailStats, Site, StatsGranularity};

#[derive(Debug, Clone, PartialEq)]
pub struct FetchPostDetailPayload {
    pub site: Site,
    pub post_id: RemoteId,
    pub forced: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPostDetailPayload {
    pub site: Site,
    pub post_id: RemoteId,
    pub result: NetworkResult<Option<PostDetailStats>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchCommentInsightsPayload {
    pub site: Site,
    pub limit: LimitMode,
    pub forced: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedCommentInsightsPayload {
    pub site: Site,
    pub limit: LimitMode,
    pub result: NetworkResult<Option<CommentInsights>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchOrderStatsPayload {
    pub site: Site,
    pub granularity: StatsGranularity,
    pub forced: bool,
}

impl FetchOrderStatsPayload {
    pub fn new(site: Site, granularity: StatsGranularity) -> Self {
        Self {
            site,
            granularity,
            forced: false,
        }
    }

    pub fn forced(mut self) -> Self {
        self.forced = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedOrderStatsPayload {
    pub site: Site,
    pub granularity: StatsGranularity,
    pub result: NetworkResult<Option<OrderStatsV4>>,
}

#[derive(Action, Clone, Debug, PartialEq)]
pub enum StatsAction {
    FetchPostDetail(FetchPostDetailPayload),
    FetchCommentInsights(FetchCommentInsightsPayload),
    FetchOrderStatsV4(FetchOrderStatsPayload),

    FetchedPostDetail(FetchedPostDetailPayload),
    FetchedCommentInsights(FetchedCommentInsightsPayload),
    FetchedOrderStatsV4(FetchedOrderStatsPayload),

    /// Drop every cached stat of a site
    ClearSiteStats(LocalId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatsChange {
    PostDetail {
        site: LocalId,
        post_id: RemoteId,
        cached: bool,
    },
    CommentInsights {
        site: LocalId,
        cached: bool,
    },
    OrderStats {
        site: LocalId,
        granularity: StatsGranularity,
        cached: bool,
    },
    Cleared {
        site: LocalId,
    },
}

type StatsReaction = Reaction<StatsAction, StatsChange>;

#[derive(Debug, Clone)]
struct Cached<T> {
    value: T,
    fetched_at: Instant,
}

impl<T> Cached<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            fetched_at: Instant::now(),
        }
    }
}

pub struct SiteStats {
    post_details: HashMap<(LocalId, RemoteId), Cached<PostDetailStats>>,
    /// Insights with the row count they were fetched for
    comment_insights: HashMap<LocalId, Cached<(CommentInsights, usize)>>,
    order_stats: HashMap<(LocalId, StatsGranularity), Cached<OrderStatsV4>>,
    client: Arc<dyn StatsClient>,
    max_age: Duration,
}

fn invalid_response(what: &str) -> ChangeError {
    ChangeError::generic("invalid_response", format!("{what} response was empty"))
}

impl SiteStats {
    pub fn new(client: Arc<dyn StatsClient>, max_age: Duration) -> Self {
        Self {
            post_details: HashMap::new(),
            comment_insights: HashMap::new(),
            order_stats: HashMap::new(),
            client,
            max_age,
        }
    }

    pub fn post_detail(&self, site: LocalId, post_id: RemoteId) -> Option<&PostDetailStats> {
        self.post_details.get(&(site, post_id)).map(|c| &c.value)
    }

    pub fn comment_insights(&self, site: LocalId, limit: LimitMode) -> Option<CommentInsights> {
        self.comment_insights
            .get(&site)
            .map(|c| c.value.0.limited(limit))
    }

    pub fn order_stats(&self, site: LocalId, granularity: StatsGranularity) -> Option<&OrderStatsV4> {
        self.order_stats.get(&(site, granularity)).map(|c| &c.value)
    }

    fn is_fresh<T>(&self, cached: Option<&Cached<T>>) -> bool {
        cached.is_some_and(|c| c.fetched_at.elapsed() < self.max_age)
    }

    fn fetch_post_detail(&mut self, payload: FetchPostDetailPayload) -> StatsReaction {
        let FetchPostDetailPayload {
            site,
            post_id,
            forced,
        } = payload;
        if !forced && self.is_fresh(self.post_details.get(&(site.local_id, post_id))) {
            debug!(store = Self::NAME, action = "FetchPostDetail", site = %site.local_id, %post_id, "cache hit");
            return Reaction::unchanged().emit(ChangeEvent::ok(
                StatsActionType::FetchPostDetail,
                StatsChange::PostDetail {
                    site: site.local_id,
                    post_id,
                    cached: true,
                },
            ));
        }

        let client = self.client.clone();
        let key = format!("stats-post-{}-{}", site.local_id, post_id);
        Reaction::unchanged().with(Effect::keyed(key, async move {
            let result = client.fetch_post_stats(&site, post_id, forced).await;
            StatsAction::FetchedPostDetail(FetchedPostDetailPayload {
                site,
                post_id,
                result,
            })
        }))
    }

    fn fetch_comment_insights(&mut self, payload: FetchCommentInsightsPayload) -> StatsReaction {
        let FetchCommentInsightsPayload { site, limit, forced } = payload;
        let cached = self.comment_insights.get(&site.local_id);
        let covers = cached.is_some_and(|c| c.value.1 >= limit.requested_items());
        if !forced && covers && self.is_fresh(cached) {
            debug!(store = Self::NAME, action = "FetchCommentInsights", site = %site.local_id, "cache hit");
            return Reaction::unchanged().emit(ChangeEvent::ok(
                StatsActionType::FetchCommentInsights,
                StatsChange::CommentInsights {
                    site: site.local_id,
                    cached: true,
                },
            ));
        }

        let client = self.client.clone();
        let key = format!("stats-comments-{}", site.local_id);
        Reaction::unchanged().with(Effect::keyed(key, async move {
            let result = client.fetch_comment_insights(&site, forced).await;
            StatsAction::FetchedCommentInsights(FetchedCommentInsightsPayload {
                site,
                limit,
                result,
            })
        }))
    }

    fn fetch_order_stats(&mut self, payload: FetchOrderStatsPayload) -> StatsReaction {
        let FetchOrderStatsPayload {
            site,
            granularity,
            forced,
        } = payload;
        if !forced && self.is_fresh(self.order_stats.get(&(site.local_id, granularity))) {
            debug!(store = Self::NAME, action = "FetchOrderStatsV4", site = %site.local_id, granularity = granularity.as_str(), "cache hit");
            return Reaction::unchanged().emit(ChangeEvent::ok(
                StatsActionType::FetchOrderStatsV4,
                StatsChange::OrderStats {
                    site: site.local_id,
                    granularity,
                    cached: true,
                },
            ));
        }

        let client = self.client.clone();
        let key = format!("stats-orders-{}-{}", site.local_id, granularity.as_str());
        Reaction::unchanged().with(Effect::keyed(key, async move {
            let result = client.fetch_order_stats_v4(&site, granularity, forced).await;
            StatsAction::FetchedOrderStatsV4(FetchedOrderStatsPayload {
                site,
                granularity,
                result,
            })
        }))
    }

    fn clear_site(&mut self, site: LocalId) -> StatsReaction {
        self.post_details.retain(|(s, _), _| *s != site);
        self.comment_insights.remove(&site);
        self.order_stats.retain(|(s, _), _| *s != site);
        Reaction::changed().emit(ChangeEvent::ok(
            StatsActionType::ClearSiteStats,
            StatsChange::Cleared { site },
        ))
    }
}

impl Slice for SiteStats {
    type Action = StatsAction;
    type Change = StatsChange;
    const NAME: &'static str = "stats";
    const DOMAIN: &'static str = StatsActionType::DOMAIN;

    fn reduce(&mut self, action: StatsAction) -> StatsReaction {
        match action {
            StatsAction::FetchPostDetail(payload) => self.fetch_post_detail(payload),
            StatsAction::FetchCommentInsights(payload) => self.fetch_comment_insights(payload),
            StatsAction::FetchOrderStatsV4(payload) => self.fetch_order_stats(payload),

            StatsAction::FetchedPostDetail(payload) => {
                let cause = StatsActionType::FetchedPostDetail;
                let site = payload.site.local_id;
                match payload.result {
                    Ok(Some(stats)) => {
                        self.post_details
                            .insert((site, payload.post_id), Cached::new(stats));
                        Reaction::changed().emit(ChangeEvent::ok(
                            cause,
                            StatsChange::PostDetail {
                                site,
                                post_id: payload.post_id,
                                cached: false,
                            },
                        ))
                    }
                    Ok(None) => Reaction::unchanged()
                        .emit(ChangeEvent::failed(cause, invalid_response("Post stats"))),
                    Err(error) => Reaction::unchanged().emit(ChangeEvent::failed(cause, error)),
                }
            }
            StatsAction::FetchedCommentInsights(payload) => {
                let cause = StatsActionType::FetchedCommentInsights;
                let site = payload.site.local_id;
                match payload.result {
                    Ok(Some(insights)) => {
                        let requested = payload.limit.requested_items();
                        self.comment_insights
                            .insert(site, Cached::new((insights, requested)));
                        Reaction::changed().emit(ChangeEvent::ok(
                            cause,
                            StatsChange::CommentInsights {
                                site,
                                cached: false,
                            },
                        ))
                    }
                    Ok(None) => Reaction::unchanged()
                        .emit(ChangeEvent::failed(cause, invalid_response("Comment insights"))),
                    Err(error) => Reaction::unchanged().emit(ChangeEvent::failed(cause, error)),
                }
            }
            StatsAction::FetchedOrderStatsV4(payload) => {
                let cause = StatsActionType::FetchedOrderStatsV4;
                let site = payload.site.local_id;
                let granularity = payload.granularity;
                match payload.result {
                    Ok(Some(stats)) => {
                        debug!(store = Self::NAME, action = "FetchedOrderStatsV4", %site, granularity = granularity.as_str(), gross = stats.total.gross_revenue, "order stats");
                        self.order_stats
                            .insert((site, granularity), Cached::new(stats));
                        Reaction::changed().emit(ChangeEvent::ok(
                            cause,
                            StatsChange::OrderStats {
                                site,
                                granularity,
                                cached: false,
                            },
                        ))
                    }
                    Ok(None) => Reaction::unchanged()
                        .emit(ChangeEvent::failed(cause, invalid_response("Order stats"))),
                    Err(error) => Reaction::unchanged().emit(ChangeEvent::failed(cause, error)),
                }
            }

            StatsAction::ClearSiteStats(site) => self.clear_site(site),
        }
    }
}
