//! Configuration and the data carried through the queue

pub mod config;
pub mod message;
pub mod models;
