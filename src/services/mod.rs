// Service exports
pub mod cache;
pub mod memory;
pub mod postgres;
pub mod roster;
pub mod store;
pub mod transitions;

pub use cache::{CacheKey, StatusCache};
pub use memory::InMemoryStore;
pub use postgres::{EntityType, PostgresStore};
pub use store::{NewStatusUpdate, Store};
pub use transitions::{StatusTransitionHandler, TransitionOutcome, UnmatchTask};
