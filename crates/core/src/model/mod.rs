mod answer;
mod ids;
mod session;

pub use answer::Answer;
pub use ids::{CategoryId, QuestionId, SessionId};
pub use session::{ExamSession, Question};
