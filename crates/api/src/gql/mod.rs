pub mod error;
pub mod mutations;
pub mod queries;
pub mod scalars;
pub mod schema;
pub mod subscriptions;
pub mod types;

pub use mutations::MutationRoot;
pub use queries::QueryRoot;
pub use schema::{build_schema, AppSchema};
pub use subscriptions::SubscriptionRoot;
