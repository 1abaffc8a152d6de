use serde::{Deserialize, Serialize};

/// Views of one post, overall and per day
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PostDetailStats {
    pub views: u64,
    /// `(period, views)` with periods as `YYYY-MM-DD`, oldest first
    pub day_views: Vec<(String, u64)>,
    pub weeks: Vec<WeekViews>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WeekViews {
    pub total: u64,
    pub average: u64,
    pub change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommentAuthor {
    pub name: String,
    pub comments: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommentedPost {
    pub title: String,
    pub comments: u64,
}

/// Top commenters and most commented posts of a site
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentInsights {
    pub authors: Vec<CommentAuthor>,
    pub posts: Vec<CommentedPost>,
    pub has_more_authors: bool,
    pub has_more_posts: bool,
}

impl CommentInsights {
    /// Keep at most `limit` entries of each list
    pub fn limited(&self, limit: LimitMode) -> CommentInsights {
        match limit {
            LimitMode::All => self.clone(),
            LimitMode::Top(n) => CommentInsights {
                authors: self.authors.iter().take(n).cloned().collect(),
                posts: self.posts.iter().take(n).cloned().collect(),
                has_more_authors: self.has_more_authors || self.authors.len() > n,
                has_more_posts: self.has_more_posts || self.posts.len() > n,
            },
        }
    }
}

/// How many insight rows a caller wants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LimitMode {
    Top(usize),
    All,
}

impl LimitMode {
    pub fn requested_items(&self) -> usize {
        match self {
            LimitMode::Top(n) => *n,
            LimitMode::All => usize::MAX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsGranularity {
    #[default]
    Days,
    Weeks,
    Months,
    Years,
}

impl StatsGranularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatsGranularity::Days => "day",
            StatsGranularity::Weeks => "week",
            StatsGranularity::Months => "month",
            StatsGranularity::Years => "year",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RevenueTotals {
    pub orders_count: u64,
    pub gross_revenue: f64,
    pub net_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RevenueInterval {
    /// `2024-05-01`, `2024-18`, ... depending on granularity
    pub interval: String,
    pub subtotals: RevenueTotals,
}

/// WooCommerce revenue for the current period of a granularity
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderStatsV4 {
    pub granularity: StatsGranularity,
    pub start_date: String,
    pub end_date: String,
    pub total: RevenueTotals,
    pub intervals: Vec<RevenueInterval>,
}
