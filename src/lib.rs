//! Video Understanding Comparison Service
//!
//! This library provides the core functionality for the video-compare
//! system: an asynchronous job queue that fans a video and prompt out to
//! several Gemini models in parallel, scores the responses with a judge
//! model, and persists job state so work survives process restarts.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
