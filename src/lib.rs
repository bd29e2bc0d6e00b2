//! A venture-analyst service: takes a startup pitch, asks Gemini (with Google
//! Search grounding) for a structured verdict, and tracks each session's
//! idle/loading/success/failure state.

pub mod analysis;
pub mod config;
pub mod controller;
pub mod models;
pub mod routes;
pub mod tools;
pub mod view;
