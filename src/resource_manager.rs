//! Resource management

use crate::error::ResourceError;

use tokio::sync::{Semaphore, SemaphorePermit};

/// [crate::resource_manager::ResourceManager] provides a simple way to allocate various resources
/// to tasks. Resource management is performed using a Tokio Semaphore for each type of resource.
///
/// Object downloads during a dataset refresh take S3 connection and memory permits. Filter and
/// aggregation requests take task permits when they are not running on the rayon pool.
#[derive(Debug)]
pub struct ResourceManager {
    /// Optional semaphore for S3 connections.
    s3_connections: Option<Semaphore>,

    /// Optional semaphore for memory (bytes).
    memory: Option<Semaphore>,

    /// Optional total memory pool in bytes.
    total_memory: Option<usize>,

    /// Optional semaphore for tasks.
    tasks: Option<Semaphore>,
}

impl ResourceManager {
    /// Returns a new ResourceManager object.
    pub fn new(
        s3_connection_limit: Option<usize>,
        memory_limit: Option<usize>,
        task_limit: Option<usize>,
    ) -> Self {
        Self {
            s3_connections: s3_connection_limit.map(Semaphore::new),
            memory: memory_limit.map(Semaphore::new),
            total_memory: memory_limit,
            tasks: task_limit.map(Semaphore::new),
        }
    }

    /// Acquire an S3 connection resource.
    pub async fn s3_connection(&self) -> Result<Option<SemaphorePermit>, ResourceError> {
        optional_acquire(&self.s3_connections, 1).await
    }

    /// Acquire memory resource.
    ///
    /// Fails immediately if the request exceeds the whole memory pool, since waiting would never
    /// succeed.
    pub async fn memory(&self, bytes: usize) -> Result<Option<SemaphorePermit>, ResourceError> {
        if let Some(total_memory) = self.total_memory {
            if bytes > total_memory {
                return Err(ResourceError::InsufficientMemory {
                    requested: bytes,
                    total: total_memory,
                });
            };
        };
        optional_acquire(&self.memory, bytes).await
    }

    /// Acquire a task resource.
    pub async fn task(&self) -> Result<Option<SemaphorePermit>, ResourceError> {
        optional_acquire(&self.tasks, 1).await
    }
}

/// Acquire permits on an optional Semaphore, if present.
async fn optional_acquire(
    sem: &Option<Semaphore>,
    n: usize,
) -> Result<Option<SemaphorePermit>, ResourceError> {
    let n = n.try_into()?;
    if let Some(sem) = sem {
        sem.acquire_many(n)
            .await
            .map(Some)
            .map_err(|err| err.into())
    } else {
        Ok(None)
    }
}
