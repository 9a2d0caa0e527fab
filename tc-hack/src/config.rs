use serde::Serialize;

/// The names the rewriter looks for and writes.
///
/// The command line always runs with [`RewriteConfig::default`]; other
/// values exist so the engine can be exercised against alternate names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewriteConfig {
    /// Base class being migrated away from.
    pub legacy_base: String,
    /// Base class qualifying classes end up inheriting.
    pub target_base: String,
    pub setup: String,
    pub setup_with_error: String,
    pub cleanup: String,
    pub cleanup_with_error: String,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            legacy_base: "XCTestCase".to_string(),
            target_base: "DDTestCase".to_string(),
            setup: "setUp".to_string(),
            setup_with_error: "setUpWithError".to_string(),
            cleanup: "tearDown".to_string(),
            cleanup_with_error: "tearDownWithError".to_string(),
        }
    }
}

impl RewriteConfig {
    /// Lifecycle methods that must call through to `super`.
    pub fn lifecycle_methods(&self) -> [&str; 4] {
        [
            self.setup.as_str(),
            self.setup_with_error.as_str(),
            self.cleanup.as_str(),
            self.cleanup_with_error.as_str(),
        ]
    }

    pub fn is_cleanup(&self, name: &str) -> bool {
        name == self.cleanup || name == self.cleanup_with_error
    }
}
