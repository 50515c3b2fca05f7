//! # Semantic Router
//!
//! Keeps a local set of routes in sync with a route index:
//!
//! - **Routes**: named targets described by example utterances
//! - **Encoder**: embeds utterances through any [`DenseEncoder`]
//! - **Index**: stores embedded utterances behind [`RouteIndex`]
//! - **State hash**: detects when local and index state drifted apart
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     SemanticRouter::add                  │
//! ├──────────────────────────────────────────────────────────┤
//! │                                                          │
//! │   routes ──► RouteDetails ──► DenseEncoder::encode       │
//! │                                      │                   │
//! │                                      ▼                   │
//! │                              RouteIndex::add             │
//! │                                      │                   │
//! │                                      ▼                   │
//! │   local routes += batch ──► StateHash reconcile          │
//! │                                                          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use semroute_encoders::AzureOpenAIEncoder;
//! use semroute_router::{LocalIndex, Route, SemanticRouter};
//!
//! let encoder = AzureOpenAIEncoder::from_env()?;
//! let mut router = SemanticRouter::new(encoder, LocalIndex::new());
//!
//! let outcome = router
//!     .aadd(Route::new("greeting", ["hi", "hello"]))
//!     .await?;
//! ```

pub mod error;
pub mod hash;
pub mod index;
pub mod route;
pub mod router;

pub use error::{IndexError, Result, RouterError};
pub use hash::StateHash;
pub use index::{IndexBatch, IndexEntry, IndexResult, LocalIndex, RouteIndex};
pub use route::{Route, RouteBatch, RouteDetails, Utterance};
pub use router::{AddOutcome, HashStatus, SemanticRouter};

pub use semroute_encoders::{DenseEncoder, Embedding};
