//! Rate-query stage.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::pipeline::context::{Action, Context};
use crate::pipeline::Stage;
use crate::rates::RatesProvider;

/// Fetches the latest rate snapshot and its chart image.
///
/// Provider failure leaves both empty; the message simply gets no rates
/// response.
pub struct RatesStage {
    provider: Option<Arc<dyn RatesProvider>>,
}

impl RatesStage {
    pub fn new(provider: Option<Arc<dyn RatesProvider>>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Stage for RatesStage {
    fn name(&self) -> &'static str {
        "rates"
    }

    async fn run(&self, cx: &mut Context) -> Result<(), PipelineError> {
        if cx.action != Action::RateQuery {
            return Ok(());
        }
        let Some(provider) = &self.provider else {
            tracing::debug!("no rates provider configured");
            return Ok(());
        };

        match provider.latest().await {
            Ok((snapshot, chart)) => {
                cx.rates = Some(snapshot);
                cx.final_image_path = Some(chart);
            }
            Err(e) => tracing::warn!(error = %e, "rate query failed"),
        }
        Ok(())
    }
}
