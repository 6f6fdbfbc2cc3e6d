pub mod app_config;
pub mod database;
pub mod memory;
pub mod redis_repo;
pub mod slot_repo;

pub use database::DbClient;
pub use memory::MemoryStore;
pub use redis_repo::RedisClient;
pub use slot_repo::PgSlotStore;
