pub mod bridge;
pub mod engine;
pub mod error;
pub mod service;
pub mod store;

pub use engine::{Operation, Transition};
pub use error::GovernanceError;
pub use service::Governance;
pub use store::GroupStore;
