//! Artbot - scheduled card-art poster for Bluesky
//!
//! This library selects a card from a catalog while avoiding recently posted
//! ones, formats its caption and posts its art to Bluesky. The `artbot-lambda`
//! and `artbot-post` binaries are thin entry points over [`service`].

pub mod catalog;
pub mod config;
pub mod credentials;
pub mod error;
pub mod formatter;
pub mod image;
pub mod ledger;
pub mod logging;
pub mod platforms;
pub mod publisher;
pub mod selector;
pub mod service;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{ArtbotError, Result};
pub use selector::{Selection, Selector};
pub use service::{ArtbotService, Clients};
pub use types::{CatalogRecord, InvocationReport, PostContent};
