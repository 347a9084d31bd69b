pub mod manager;
pub mod snapshot;

pub use manager::StorageManager;
pub use snapshot::DatasetSnapshot;
