pub mod chat_history;
pub mod config_entries;
pub mod customers;
pub mod interactions;
