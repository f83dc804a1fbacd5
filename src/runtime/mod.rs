//! Runtime adapters for spawning queue workers.

pub mod tokio_spawner;

pub use tokio_spawner::TokioSpawner;
