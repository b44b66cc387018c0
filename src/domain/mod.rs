//! Domain layer - Core logic
//!
//! This module contains the domain entities, the repository traits for
//! external collaborators, and the source resolution services.

pub mod entities;
pub mod repositories;
pub mod services;
