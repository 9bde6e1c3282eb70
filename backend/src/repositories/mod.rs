pub mod record_repository;
pub mod space_repository;

// Re-export all repositories for convenient access
pub use record_repository::RecordRepository;
pub use space_repository::SpaceRepository;
