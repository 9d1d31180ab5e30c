//! Progress reporting for tree synchronization runs.

/// Progress events emitted while syncing an organization's trees.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SyncProgress {
    /// Starting to enumerate repositories for an organization.
    FetchingRepos {
        /// The organization being listed.
        organization: String,
    },

    /// Fetched one page of the repository listing.
    FetchedPage {
        /// Page number (1-indexed).
        page: u32,
        /// Repositories on this page, after the archived filter.
        count: usize,
        /// Running total so far.
        total_so_far: usize,
    },

    /// The repository listing was served from the snapshot cache.
    ListingCacheHit {
        organization: String,
        count: usize,
    },

    /// One repository's file list was served from the tree cache.
    TreeCacheHit {
        full_name: String,
        files: usize,
    },

    /// One repository's tree was fetched from the remote.
    TreeFetched {
        full_name: String,
        files: usize,
    },

    /// One repository was skipped and contributes no files.
    TreeSkipped {
        full_name: String,
        reason: String,
    },

    /// The remote rate limit was hit; no further repositories will be
    /// attempted in this run.
    RateLimitHalt {
        /// The repository whose fetch hit the limit (left unresolved).
        full_name: String,
    },

    /// The run finished, normally or via halt.
    SyncComplete {
        /// Repositories present in the result mapping.
        resolved: usize,
        /// Repositories in the listing snapshot.
        listed: usize,
    },
}

/// Callback for progress updates during sync operations.
pub type ProgressCallback = Box<dyn Fn(SyncProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: SyncProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
