//! Volunteer Match assigns volunteers to open event tasks with an LLM.

pub mod admin;
pub mod config;
pub mod contact;
pub mod error;
pub mod notify;
pub mod oracle;
pub mod pipeline;
pub mod store;
