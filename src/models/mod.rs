pub mod question;
pub mod selectors;
pub mod session;

pub use question::{
    AnswerResult, AnswerStatus, AnswerValue, QuestionKind, QuestionRecord, RawQuizBlock,
};
pub use selectors::{profile_by_name, SelectorProfile, COURSERA};
pub use session::ResolutionSession;
