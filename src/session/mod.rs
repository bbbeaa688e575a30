//! Intake sessions: one client's walk from the form to the finished brief.

pub mod screen;
pub mod store;

pub use screen::Screen;
pub use store::{
    BRIEF_READY, MIN_TOPICS_TO_FINISH, MessageReply, PendingWrite, SESSION_SWEEP_INTERVAL, Session,
    SessionSnapshot, SessionStore,
};
