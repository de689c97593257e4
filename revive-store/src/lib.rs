pub mod app_config;
pub mod database;
pub mod events;
pub mod memory;
pub mod bundle_repo;
pub mod order_repo;
pub mod warehouse_repo;
pub mod user_repo;
pub mod cart_repo;

pub use app_config::Config;
pub use database::DbClient;
pub use events::BroadcastPublisher;
pub use memory::MemoryStore;
pub use bundle_repo::StoreBundleRepository;
pub use order_repo::StoreOrderRepository;
pub use warehouse_repo::StoreWarehouseRepository;
pub use user_repo::StoreUserRepository;
pub use cart_repo::StoreCartRepository;

use revive_core::CoreError;

pub(crate) fn db_err(e: sqlx::Error) -> CoreError {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            return CoreError::Conflict(db.message().to_string());
        }
    }
    CoreError::Persistence(e.to_string())
}
