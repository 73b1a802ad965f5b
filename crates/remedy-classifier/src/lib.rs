//! Remedy Classifier - deterministic incident classification
//!
//! Evaluates a fixed, ordered rule table against an incident's evidence:
//! - Evidence is put in canonical order first
//! - First matching rule wins; no match yields `UNKNOWN`
//! - Labels, key facts and evidence pointers come out sorted
//!
//! # Example
//!
//! ```rust,ignore
//! use remedy_classifier::{classify, classification_hash};
//!
//! let classification = classify(&incident, &evidence);
//! let hash = classification_hash(&classification)?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod classify;
pub mod rules;

pub use classify::{classification_hash, classify, CLASSIFIER_VERSION, NEEDS_CLASSIFICATION};
pub use rules::{rule_ids, rules, Rule, RULES};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
