//! AppMarket Registry Client
//!
//! Fetches image tag metadata from a Docker-Hub-compatible API so the core
//! can tell multi-architecture images apart.
//!
//! ## Example
//!
//! ```rust,no_run
//! use appmarket_registry::DockerHubClient;
//! use appmarket_core::ImageReference;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = DockerHubClient::new("https://hub.docker.com", Duration::from_secs(10))?;
//! let image = ImageReference::parse("registry", "2.7.1").unwrap();
//! let manifest = client.tag_manifest(&image).await?;
//! println!("multi-arch: {}", manifest.has_arm_image());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;

pub use client::DockerHubClient;
pub use error::{RegistryError, Result};
