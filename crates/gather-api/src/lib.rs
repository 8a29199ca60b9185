pub mod chat;
pub mod error;
pub mod groups;
pub mod membership;
pub mod middleware;

use std::sync::Arc;

use gather_governance::Governance;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub governance: Governance,
    pub jwt_secret: String,
}
