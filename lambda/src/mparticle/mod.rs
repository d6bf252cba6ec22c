//! Outbound side: mParticle batch model, Events API access and the submitting client

pub mod api;
pub mod batch;
pub mod client;

pub use api::{ApiFactory, ApiResponse, EventsApi, HttpEventsApi};
pub use client::{EventSubmitter, MParticleClient};
