use crate::config::DEFAULT_HOME_COMPANY;
use crate::db::Database;
use std::sync::Arc;

// Shared state
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    /// Firm name the dashboard matches against PRIME / SUB.
    pub home_company: Arc<str>,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            home_company: Arc::from(DEFAULT_HOME_COMPANY),
        }
    }

    pub fn with_home_company(mut self, home_company: &str) -> Self {
        self.home_company = Arc::from(home_company);
        self
    }
}
