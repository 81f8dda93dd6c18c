//! Storage layer abstraction.
//!
//! - **Model store**: namespace-scoped document storage (filesystem, memory)
//! - **Moves**: batch application of staged file relocations

pub mod model;
pub mod moves;

pub use model::{
    FilesystemModelStore, InMemoryModelStore, ModelStore, ModelStoreFactory, collect_model_files,
    walk_model_files,
};
pub use moves::{FileMove, FilesystemMoveApplier, MoveApplier};
