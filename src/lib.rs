//! Aura: home dashboard and chat assistant over a persisted user profile.

pub mod app;
pub mod assistant;
pub mod channels;
pub mod config;
pub mod error;
pub mod llm;
pub mod profile;
pub mod store;
