pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::InMemoryRepository;
pub use models::{EntityId, EntityView, ProfileRange, ProfileRecord};
pub use postgres::PgEntityRepository;
pub use repository::{EntityRepository, RepositoryError};
