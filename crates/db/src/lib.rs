pub mod connection;
pub mod migrations;
pub mod repositories;
pub mod vectors;

pub use connection::{open_index, DbPool, IndexOpenError, OpenMode};
pub use repositories::{
    ChunkStore, InMemoryChunkStore, InsertOutcome, RepositoryError, SqlChunkStore,
};
