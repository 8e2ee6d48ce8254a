use index::{IndexedDocument, IngestionPipeline};
use query::{CompletionService, QaConfig, QaSystem, Retriever};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::session::Session;

pub struct AppState {
    pub config: AppConfig,
    pub pipeline: IngestionPipeline,
    pub llm: Arc<dyn CompletionService>,
    pub session: Session,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        pipeline: IngestionPipeline,
        llm: Arc<dyn CompletionService>,
    ) -> Self {
        Self {
            config,
            pipeline,
            llm,
            session: Session::new(),
        }
    }

    /// Fresh QA system, with empty history, over `document`
    pub fn qa_for(&self, document: IndexedDocument) -> QaSystem {
        let retriever = Retriever::new(Arc::new(document), self.pipeline.embedder());
        QaSystem::new(
            retriever,
            Arc::clone(&self.llm),
            QaConfig {
                max_context_chars: self.config.answer.max_context_chars,
                max_history: self.config.answer.max_history,
            },
        )
    }
}
