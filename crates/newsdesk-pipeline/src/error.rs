use newsdesk_llm::LlmError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A whole stage failed; item-level failures never surface here.
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: LlmError,
    },
}

impl PipelineError {
    pub(crate) fn stage(stage: &'static str) -> impl FnOnce(LlmError) -> Self {
        move |source| PipelineError::Stage { stage, source }
    }
}
