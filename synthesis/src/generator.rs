//! Generative collaborator interface and the shared handle around it.
//!
//! The model runtime is one stateful resource. [`GeneratorHandle`] owns it
//! and hands out a [`GeneratorLease`]; only one lease exists at a time, so
//! at most one generation or validation call is in flight.

use std::ops::Deref;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::Result;

/// A stream of text deltas ending on completion or on the first error.
pub type TextStream = BoxStream<'static, Result<String>>;

/// One generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
            temperature,
        }
    }
}

/// A text generator.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Get the name of this generator.
    fn name(&self) -> &str;

    /// Whether a model is loaded and able to serve requests.
    async fn is_ready(&self) -> bool;

    /// Generate the complete response for `request`.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Generate the response as a stream of deltas.
    async fn generate_stream(&self, request: &GenerationRequest) -> Result<TextStream>;

    /// Abort any in-flight generation and release its resources.
    fn cancel(&self);
}

/// Shared ownership of a generator with serialized access.
#[derive(Clone)]
pub struct GeneratorHandle {
    generator: Arc<dyn Generator>,
    access: Arc<Mutex<()>>,
}

impl GeneratorHandle {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            access: Arc::new(Mutex::new(())),
        }
    }

    pub fn name(&self) -> &str {
        self.generator.name()
    }

    /// Wait for exclusive use of the generator.
    pub async fn lease(&self) -> GeneratorLease {
        let permit = self.access.clone().lock_owned().await;
        GeneratorLease {
            _permit: permit,
            generator: self.generator.clone(),
        }
    }

    /// Cancel whatever the current lease holder is running.
    ///
    /// Does not wait for the lease.
    pub fn cancel(&self) {
        self.generator.cancel();
    }
}

impl std::fmt::Debug for GeneratorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorHandle")
            .field("generator", &self.generator.name())
            .finish()
    }
}

/// Exclusive access to the generator until dropped.
pub struct GeneratorLease {
    _permit: OwnedMutexGuard<()>,
    generator: Arc<dyn Generator>,
}

impl Deref for GeneratorLease {
    type Target = dyn Generator;

    fn deref(&self) -> &Self::Target {
        self.generator.as_ref()
    }
}
