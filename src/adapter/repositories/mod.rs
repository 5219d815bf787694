//! Repository Implementations
//!
//! Domain層で定義されたRepository traitの具体的な実装

pub mod directory_image_store;
pub mod file_context_repository;

pub use directory_image_store::DirectoryImageStore;
pub use file_context_repository::FileContextRepository;
