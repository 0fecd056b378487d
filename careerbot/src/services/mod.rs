mod career;
mod context;
mod generation;
mod indexing;
mod ingestion;
mod rebuild;
mod sessions;

pub use career::CareerService;
pub use context::{
    AssembledContext, ContextAssembler, ContextBlock, ContextCategory, ANSWERS_LABEL, JOB_LABEL,
    RESUME_LABEL,
};
pub use generation::{
    parse_json, parse_string_list, render_history, strip_code_fences, GenerationOrchestrator,
    PromptInput, StructuredOutput,
};
pub use indexing::KnowledgeIndexer;
pub use ingestion::{parse_job_sections, IngestionService};
pub use rebuild::{KnowledgeRebuilder, RebuildReport};
pub use sessions::{ConversationState, SessionHandle, SessionRegistry, SessionSweeper};
