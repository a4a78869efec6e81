pub mod chat;
pub mod membership;
pub mod profiles;
pub mod trips;
