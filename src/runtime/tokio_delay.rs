//! Tokio implementation of [`Delay`].

use std::time::Duration;

use async_trait::async_trait;

use crate::core::Delay;

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
