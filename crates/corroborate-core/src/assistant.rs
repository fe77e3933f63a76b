//! String-returning entry points. Every failure becomes a user-facing message.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::error;

use crate::config::ResearchConfig;
use crate::error::ResearchError;
use crate::orchestrator::{ResearchOrchestrator, RunOptions};

pub const NO_RESULTS_MESSAGE: &str = "No research results found. Please try a different query.";

pub struct ResearchAssistant {
    orchestrator: ResearchOrchestrator,
}

impl ResearchAssistant {
    pub fn new(orchestrator: ResearchOrchestrator) -> Self {
        Self { orchestrator }
    }

    /// Assistant wired to the default web and encyclopedia providers.
    pub fn from_config(config: ResearchConfig) -> Result<Self, ResearchError> {
        Ok(Self::new(ResearchOrchestrator::with_default_providers(
            config,
        )?))
    }

    pub fn orchestrator(&self) -> &ResearchOrchestrator {
        &self.orchestrator
    }

    /// Small, sequential fan-out over every source kind.
    pub async fn quick(&self, query: &str) -> String {
        self.research(query, RunOptions::quick()).await
    }

    pub async fn deep(&self, query: &str, include_web: bool, include_encyclopedia: bool) -> String {
        self.research(query, RunOptions::deep(include_web, include_encyclopedia))
            .await
    }

    async fn research(&self, query: &str, options: RunOptions) -> String {
        let attempt = AssertUnwindSafe(self.orchestrator.run(query, options))
            .catch_unwind()
            .await;

        match attempt {
            Ok(Ok(report)) => report.render_markdown(),
            Ok(Err(err)) if err.is_no_results() => NO_RESULTS_MESSAGE.to_string(),
            Ok(Err(err)) => {
                error!(error = %err, "research failed");
                format!("Research failed: {err}")
            }
            Err(_) => {
                error!("research pipeline panicked");
                "Research failed: internal error".to_string()
            }
        }
    }
}
