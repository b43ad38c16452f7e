//! Data models for UNIBOT entities.
//!
//! - `User`, `Role`, `Registration`, `ProfileUpdate`, `LoginResponse`: accounts
//! - `Course`, `Enrollment`, `Assignment`, `Feedback`: course data
//! - `ChatReply`, `ChatHistoryItem`: chatbot exchanges

pub mod chat;
pub mod course;
pub mod user;

pub use chat::{ApiInfo, BotResponse, ChatHistoryItem, ChatMessage, ChatReply};
pub use course::{
    Assignment, Course, Enrollment, Feedback, Listing, NewAssignment, NewFeedback, SyllabusUpdate,
};
pub use user::{LoginResponse, ProfileUpdate, Registration, Role, User};
