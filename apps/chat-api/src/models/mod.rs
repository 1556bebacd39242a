pub mod chat;
pub mod chat_member;
pub mod chat_message;
