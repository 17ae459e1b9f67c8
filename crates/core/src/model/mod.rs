mod answer;
mod attempt;
mod ids;
mod session;
mod sync;

pub use answer::{Answer, QuizAnswers};
pub use attempt::{AttemptRecord, NewAttempt};
pub use ids::{AttemptId, MAX_QUESTION_ID_LEN, QuestionId, UserId};
pub use session::{QuizResults, QuizSession, QuizSnapshot};
pub use sync::{AutosaveRecord, AutosaveStatus, SyncMeta, TimerId};
