// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Bounded worker pool shared by the fan-out phases.

use crate::config::EngineConfig;
use crate::error::TaskError;

use core::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;

/// Counting semaphore plus the time limit applied to each unit of work.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
    timeout: Duration,
}

impl WorkerPool {
    pub fn new(size: usize, timeout: Duration) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
            timeout,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.workers(), config.step_timeout)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of permits not currently held.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, TaskError> {
        self.permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| TaskError::Closed)
    }

    /// Run `fut` under the time limit without taking a permit.
    pub async fn timed<F, T>(&self, fut: F) -> Result<T, TaskError>
    where
        F: Future<Output = T>,
    {
        timeout(self.timeout, fut)
            .await
            .map_err(|_| TaskError::Timeout(self.timeout))
    }

    /// Take a permit, then run `fut` under the time limit.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, TaskError>
    where
        F: Future<Output = T>,
    {
        let _permit = self.acquire().await?;
        self.timed(fut).await
    }

    /// Take a permit, then run `f` on the blocking thread pool under the
    /// time limit. A timed out closure keeps running, but its result is
    /// discarded.
    pub async fn run_blocking<F, T>(&self, f: F) -> Result<T, TaskError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let _permit = self.acquire().await?;
        match self.timed(tokio::task::spawn_blocking(f)).await? {
            Ok(v) => Ok(v),
            Err(e) => Err(TaskError::Panicked(e.to_string())),
        }
    }
}
