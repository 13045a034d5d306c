//! # radport-imaging
//!
//! Gateway to the external imaging backend for the Radport dashboard.
//!
//! This crate provides:
//! - The medical-check wire types the backend returns
//! - An HTTP client with public and session-authenticated listings
//! - Uniform classification of backend failures into the shared error
//!   taxonomy
//!
//! Authenticated calls run their session through
//! [`radport_auth::RefreshCoordinator`] first, so the bearer token attached
//! downstream always has usable lifetime left.

pub mod client;
pub mod types;

pub use client::{ImagingClient, ImagingConfig};
pub use types::{MedicalCheck, Series, Study};
