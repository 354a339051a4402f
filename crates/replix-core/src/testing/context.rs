//! TestContext - owns a temporary directory for the duration of a test

use std::path::Path;
use tempfile::TempDir;

/// Context for managing test resources and lifecycle
///
/// The temporary directory is removed when the context is dropped.
///
/// # Example
///
/// ```rust,no_run
/// use replix_core::testing::TestContext;
/// use replix_core::wal::DurabilityLog;
///
/// let ctx = TestContext::new();
/// let log = DurabilityLog::open(ctx.path().join("primary.log"), false).unwrap();
/// ```
pub struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    /// Create a new TestContext with a unique temporary directory
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temporary directory");
        Self { temp_dir }
    }

    /// Get the path to the temporary directory
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Keep the directory alive beyond the context
    pub fn into_temp_dir(self) -> TempDir {
        self.temp_dir
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
