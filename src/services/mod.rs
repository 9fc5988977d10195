pub mod answer_provider;
pub mod extractor;
pub mod gemini_client;
pub mod presenter;

pub use answer_provider::{AnswerProvider, BatchOutcome, ParsedAnswer};
pub use extractor::Extractor;
pub use gemini_client::GeminiClient;
pub use presenter::{NullSink, OutcomeSink, PageSink, ResultPresenter};
