//! Progress-callback trait for per-note generation events.
//!
//! Inject an [`Arc<dyn GenerationProgressCallback>`] via
//! [`crate::config::GenerationConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through the token list.
//!
//! # Example
//!
//! ```rust
//! use ecash_sheet::{GenerationConfig, GenerationProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl GenerationProgressCallback for CountingCallback {
//!     fn on_token_complete(&self, index: usize, total: usize) {
//!         self.done.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("note {index}/{total} ready");
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { done: AtomicUsize::new(0) });
//! let config = GenerationConfig::builder()
//!     .progress_callback(cb as Arc<dyn GenerationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it processes each token.
///
/// Tokens are processed one at a time, in input order. All methods have
/// default no-op implementations so callers only override what they need.
pub trait GenerationProgressCallback: Send + Sync {
    /// Called once after the token list is loaded.
    fn on_batch_start(&self, total_tokens: usize) {
        let _ = total_tokens;
    }

    /// Called before `qrencode` runs for a token.
    ///
    /// `index` is 1-based and matches the artifact file number.
    fn on_token_start(&self, index: usize, total_tokens: usize) {
        let _ = (index, total_tokens);
    }

    /// Called when a token's artifact has been written.
    fn on_token_complete(&self, index: usize, total_tokens: usize) {
        let _ = (index, total_tokens);
    }

    /// Called when a token's artifact could not be produced.
    fn on_token_error(&self, index: usize, total_tokens: usize, error: &str) {
        let _ = (index, total_tokens, error);
    }

    /// Called once after every token has been attempted.
    fn on_batch_complete(&self, total_tokens: usize, success_count: usize) {
        let _ = (total_tokens, success_count);
    }

    /// A non-fatal problem worth showing the user, such as a missing
    /// front or back image. Also logged with `warn!`.
    fn on_warning(&self, message: &str) {
        let _ = message;
    }

    /// Called before the first pdflatex pass.
    fn on_render_start(&self, layout_path: &std::path::Path) {
        let _ = layout_path;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl GenerationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GenerationConfig`].
pub type ProgressCallback = Arc<dyn GenerationProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        batch_total: AtomicUsize,
        batch_success: AtomicUsize,
    }

    impl GenerationProgressCallback for TrackingCallback {
        fn on_batch_start(&self, total_tokens: usize) {
            self.batch_total.store(total_tokens, Ordering::SeqCst);
        }

        fn on_token_start(&self, _index: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_token_complete(&self, _index: usize, _total: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_token_error(&self, _index: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, _total: usize, success_count: usize) {
            self.batch_success.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(5);
        cb.on_token_start(1, 5);
        cb.on_token_complete(1, 5);
        cb.on_token_error(2, 5, "qrencode exited with 1");
        cb.on_batch_complete(5, 4);
        cb.on_warning("Back image 'back.png' not found");
        cb.on_render_start(std::path::Path::new("ecash_notes.tex"));
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_batch_start(3);
        tracker.on_token_start(1, 3);
        tracker.on_token_complete(1, 3);
        tracker.on_token_start(2, 3);
        tracker.on_token_complete(2, 3);
        tracker.on_token_start(3, 3);
        tracker.on_token_error(3, 3, "magick failed");
        tracker.on_batch_complete(3, 2);

        assert_eq!(tracker.batch_total.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.batch_success.load(Ordering::SeqCst), 2);
    }
}
