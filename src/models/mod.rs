pub mod chat;
pub mod join_request;
pub mod trip;
pub mod user;
