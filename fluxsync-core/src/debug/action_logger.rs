//! Action logging with pattern-based filtering and in-memory storage
//!
//! Provides configurable action logging using glob patterns to include/exclude
//! specific actions from logs. Supports both tracing output and an in-memory
//! ring buffer of recent actions for inspection by the host.
//!
//! # Example
//!
//! ```ignore
//! use fluxsync::debug::{ActionLogConfig, ActionLoggerConfig, ActionLoggerMiddleware};
//!
//! // Log everything except media progress chatter (tracing only)
//! let config = ActionLoggerConfig::new(None, Some("media.Update*"));
//! let dispatcher = Dispatcher::with_middleware(ActionLoggerMiddleware::new(config));
//!
//! // Keep the last 100 actions in memory as well
//! let logger = ActionLoggerMiddleware::with_log(ActionLogConfig::with_capacity(100));
//! let log = logger.handle();
//! let dispatcher = Dispatcher::with_middleware(logger);
//! for entry in log.lock().recent(10) {
//!     println!("{}: {}", entry.elapsed_display(), entry.summary);
//! }
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::action::{ActionKind, ActionSummary};
use crate::middleware::Middleware;

/// Configuration for action logging with glob pattern filtering.
///
/// Patterns are matched against both the bare action name (`FetchedPosts`)
/// and the qualified `domain.Name` form (`post.FetchedPosts`). Patterns support:
/// - `*` matches any sequence of characters
/// - `?` matches any single character
/// - Literal text matches exactly
///
/// # Examples
///
/// - `Fetch*` matches FetchPosts, FetchMedia, etc.
/// - `media.*` matches every media action
/// - `*Upload*` matches UploadMedia, CancelMediaUpload, UploadedMedia
#[derive(Debug, Clone, Default)]
pub struct ActionLoggerConfig {
    /// If non-empty, only log actions matching these patterns
    pub include_patterns: Vec<String>,
    /// Exclude actions matching these patterns (applied after include)
    pub exclude_patterns: Vec<String>,
}

impl ActionLoggerConfig {
    /// Create a new config from comma-separated pattern strings
    ///
    /// # Example
    /// ```
    /// use fluxsync_core::debug::ActionLoggerConfig;
    ///
    /// let config = ActionLoggerConfig::new(Some("Fetch*,SignOut"), Some("FetchMedia"));
    /// assert!(config.should_log("post", "FetchPosts"));
    /// assert!(config.should_log("account", "SignOut"));
    /// assert!(!config.should_log("media", "FetchMedia"));
    /// ```
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Self {
        Self {
            include_patterns: split_patterns(include),
            exclude_patterns: split_patterns(exclude),
        }
    }

    pub fn with_patterns(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self {
            include_patterns: include,
            exclude_patterns: exclude,
        }
    }

    /// Check if an action should be logged based on include/exclude patterns
    pub fn should_log(&self, domain: &str, name: &str) -> bool {
        let qualified = format!("{domain}.{name}");
        let matches = |p: &String| glob_match(p, name) || glob_match(p, &qualified);

        if !self.include_patterns.is_empty() && !self.include_patterns.iter().any(matches) {
            return false;
        }
        !self.exclude_patterns.iter().any(matches)
    }
}

fn split_patterns(patterns: Option<&str>) -> Vec<String> {
    patterns
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

// ============================================================================
// In-Memory Action Log
// ============================================================================

#[derive(Debug, Clone)]
pub struct ActionLogEntry {
    pub domain: &'static str,
    pub name: &'static str,
    pub kind: ActionKind,
    /// From `ActionSummary::summary()`
    pub summary: String,
    pub timestamp: Instant,
    /// Sequence number for ordering
    pub sequence: u64,
    /// Subscribers reached; set once delivery finishes
    pub delivered: Option<usize>,
}

impl ActionLogEntry {
    pub fn new(
        domain: &'static str,
        name: &'static str,
        kind: ActionKind,
        summary: String,
        sequence: u64,
    ) -> Self {
        Self {
            domain,
            name,
            kind,
            summary,
            timestamp: Instant::now(),
            sequence,
            delivered: None,
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.timestamp.elapsed()
    }

    /// Format the elapsed time for display (e.g., "2.3s", "150ms")
    pub fn elapsed_display(&self) -> String {
        let elapsed = self.elapsed();
        if elapsed.as_secs() >= 1 {
            format!("{:.1}s", elapsed.as_secs_f64())
        } else {
            format!("{}ms", elapsed.as_millis())
        }
    }
}

/// Configuration for the action log ring buffer
#[derive(Debug, Clone)]
pub struct ActionLogConfig {
    /// Maximum number of entries to keep
    pub capacity: usize,
    pub filter: ActionLoggerConfig,
}

impl Default for ActionLogConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            filter: ActionLoggerConfig::default(),
        }
    }
}

impl ActionLogConfig {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    pub fn new(capacity: usize, filter: ActionLoggerConfig) -> Self {
        Self { capacity, filter }
    }
}

/// In-memory ring buffer for storing recent actions
///
/// Older entries are automatically discarded when capacity is reached.
#[derive(Debug, Clone)]
pub struct ActionLog {
    entries: VecDeque<ActionLogEntry>,
    config: ActionLogConfig,
    next_sequence: u64,
}

impl Default for ActionLog {
    fn default() -> Self {
        Self::new(ActionLogConfig::default())
    }
}

impl ActionLog {
    pub fn new(config: ActionLogConfig) -> Self {
        Self {
            entries: VecDeque::with_capacity(config.capacity),
            config,
            next_sequence: 0,
        }
    }

    /// Log an action (if it passes the filter)
    ///
    /// Returns the entry's sequence number, None if filtered out.
    pub fn log<A: ActionSummary>(&mut self, action: &A) -> Option<u64> {
        let (domain, name) = (action.domain(), action.name());
        if !self.config.filter.should_log(domain, name) || self.config.capacity == 0 {
            return None;
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        if self.entries.len() >= self.config.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(ActionLogEntry::new(
            domain,
            name,
            action.kind(),
            action.summary(),
            sequence,
        ));
        Some(sequence)
    }

    /// Record how many subscribers the action with `sequence` reached.
    /// No-op if the entry has already been evicted.
    pub fn mark_delivered(&mut self, sequence: u64, delivered: usize) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .rev()
            .find(|entry| entry.sequence == sequence)
        {
            entry.delivered = Some(delivered);
        }
    }

    /// Get all entries (oldest first)
    pub fn entries(&self) -> impl Iterator<Item = &ActionLogEntry> {
        self.entries.iter()
    }

    /// Get the most recent N entries (newest first)
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &ActionLogEntry> {
        self.entries.iter().rev().take(count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn config(&self) -> &ActionLogConfig {
        &self.config
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Middleware that logs actions with configurable pattern filtering.
///
/// Supports two modes:
/// - **Tracing only** (default): logs via `tracing::debug!()`
/// - **With storage**: also keeps an [`ActionLog`] ring buffer, shared
///   through [`handle`](Self::handle) since the dispatcher owns the middleware
#[derive(Debug, Clone)]
pub struct ActionLoggerMiddleware {
    config: ActionLoggerConfig,
    log: Option<Arc<Mutex<ActionLog>>>,
    /// One slot per delivery in progress; nested dispatch pushes another
    pending: Vec<Option<u64>>,
    /// When false, all methods become no-ops.
    active: bool,
}

impl ActionLoggerMiddleware {
    /// Tracing only, no in-memory storage
    pub fn new(config: ActionLoggerConfig) -> Self {
        Self {
            config,
            log: None,
            pending: Vec::new(),
            active: true,
        }
    }

    pub fn with_log(config: ActionLogConfig) -> Self {
        Self {
            config: config.filter.clone(),
            log: Some(Arc::new(Mutex::new(ActionLog::new(config)))),
            pending: Vec::new(),
            active: true,
        }
    }

    pub fn with_default_log() -> Self {
        Self::with_log(ActionLogConfig::default())
    }

    /// No filtering, tracing only
    pub fn log_all() -> Self {
        Self::new(ActionLoggerConfig::default())
    }

    /// Set whether the middleware is active.
    ///
    /// ```ignore
    /// let middleware = ActionLoggerMiddleware::log_all().active(config.debug);
    /// ```
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Shared handle to the action log (if storage is enabled)
    pub fn handle(&self) -> Option<Arc<Mutex<ActionLog>>> {
        self.log.clone()
    }

    pub fn config(&self) -> &ActionLoggerConfig {
        &self.config
    }
}

impl<A: ActionSummary> Middleware<A> for ActionLoggerMiddleware {
    fn before(&mut self, action: &A) {
        if !self.active {
            return;
        }

        let (domain, name) = (action.domain(), action.name());
        if self.config.should_log(domain, name) {
            tracing::debug!(
                action = %name,
                domain = %domain,
                kind = %action.kind().as_str(),
                "action"
            );
        }

        let sequence = self.log.as_ref().and_then(|log| log.lock().log(action));
        self.pending.push(sequence);
    }

    fn after(&mut self, _action: &A, delivered: usize) {
        if !self.active {
            return;
        }

        // Only update entries this middleware actually logged
        if let (Some(Some(sequence)), Some(log)) = (self.pending.pop(), self.log.as_ref()) {
            log.lock().mark_delivered(sequence, delivered);
        }
    }
}

/// Simple glob pattern matching supporting `*` and `?`.
///
/// - `*` matches zero or more characters
/// - `?` matches exactly one character
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < text.len() {
        match pattern.get(pi) {
            Some('*') => {
                star = Some((pi, ti));
                pi += 1;
            }
            Some(&c) if c == '?' || c == text[ti] => {
                pi += 1;
                ti += 1;
            }
            _ => match star {
                Some((star_pi, star_ti)) => {
                    pi = star_pi + 1;
                    ti = star_ti + 1;
                    star = Some((star_pi, star_ti + 1));
                }
                None => return false,
            },
        }
    }

    pattern[pi..].iter().all(|&c| c == '*')
}
