pub mod answer;
pub mod session;

pub use answer::Answer;
pub use session::{Question, Session, SessionStatus};
