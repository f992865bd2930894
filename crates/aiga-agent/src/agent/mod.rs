//! The conversational turn engine.
//!
//! A turn flows through four stages:
//!
//! 1. Entry - early intents, location context, entity memory refresh
//! 2. Compaction - result externalization, enrichment, rolling summary
//! 3. Completion - the model call with rehydration and fault recovery
//! 4. Validation - answer check with bounded retries
//!
//! `TurnController` wires the stages over a checkpointed session.

pub mod classify;
pub mod compactor;
pub mod controller;
pub mod entity;
pub mod geocode;
pub mod location;
pub mod prompts;
pub mod sanitize;
pub mod session;
pub mod transcript;
pub mod validate;

pub use classify::{Intent, KeywordClassifier, QueryClassifier};
pub use controller::{TurnConfig, TurnController, TurnResult};
pub use entity::{DoctorRef, EntityMemory, RouteEntities};
pub use geocode::{NominatimGeocoder, ReverseGeocoder};
pub use location::{LocationEntry, LocationStatus};
pub use sanitize::{KeywordSanitizer, Sanitizer};
pub use session::{Coordinates, Session, SessionSnapshot};
pub use validate::{ValidationPolicy, ValidationVerdict};
