//! # swse-rules - Prerequisite Evaluation and Defense Resolution
//!
//! The rules core of a Saga Edition character sheet:
//! - **Prerequisite evaluation**: decides whether a character (or item)
//!   qualifies for a feat, talent, class or gear, with a structured report
//!   of every unmet condition
//! - **Defense resolution**: Fortitude, Will, Reflex, damage threshold and
//!   damage reduction with a per-term breakdown
//! - **Deterministic**: same character, same content, same result
//!
//! ## Core Concepts
//!
//! ### Evaluation Pipeline
//!
//! ```text
//! [authored JSON] → [Prerequisite] → Evaluator(target) → [Evaluation] → format_failures
//! ```
//!
//! 1. **Content** is parsed once into typed [`Prerequisite`] trees
//! 2. The **Evaluator** walks a tree against a [`Target`](model::Target),
//!    reading inheritable attributes through an
//!    [`AttributeIndex`](aggregate::AttributeIndex)
//! 3. The **Evaluation** lists hard and soft failures plus successes
//!
//! Malformed content fails at load time. Content the evaluator does not
//! understand still loads and fails when evaluated, with a diagnostic.
//!
//! ## Example
//!
//! ```rust
//! use swse_rules::*;
//! use swse_rules::model::{Actor, Item, ItemKind};
//!
//! let nodes = Prerequisite::from_json(r#"{
//!     "type": "AND", "text": "Jedi Training",
//!     "children": [
//!         {"type": "CLASS", "text": "Jedi", "requirement": "Jedi"},
//!         {"type": "BASE ATTACK BONUS", "text": "Base Attack Bonus +1", "requirement": "1"},
//!         {"type": "TRAINED SKILL", "text": "Trained in Use the Force", "requirement": "Use the Force"}
//!     ]
//! }"#).unwrap();
//!
//! let actor = Actor::new("Kestrel").with_item(Item::new("Jedi", ItemKind::Class));
//!
//! let evaluation = Evaluator::new().evaluate(&actor, &nodes);
//! assert!(evaluation.overall_failed);
//! assert_eq!(
//!     format_failures(&evaluation.failures),
//!     "<ul><li>all of:</br><ul><li>Base Attack Bonus +1</li><li>Trained in Use the Force</li></ul></li></ul>"
//! );
//! ```
//!
//! ## Modules
//!
//! - [`attribute_key`] - Attribute identifier type
//! - [`model`] - Actors, items and the `Target` trait
//! - [`aggregate`] - Inheritable attribute collection and reduction
//! - [`prerequisite`] - Typed prerequisite content
//! - [`evaluate`] - Prerequisite evaluator
//! - [`defense`] - Defense resolver
//! - [`format`] - Failure report rendering
//! - [`content`] - Prerequisite graph over a compendium
//! - [`error`] - Error types

pub mod aggregate;
pub mod attribute_key;
pub mod content;
pub mod defense;
pub mod error;
pub mod evaluate;
pub mod format;
pub mod model;
pub mod prerequisite;

// Re-export main types for convenience
pub use attribute_key::AttributeKey;
pub use error::{ContentError, RulesError};
pub use evaluate::{Diagnostic, DiagnosticKind, Evaluation, Evaluator, EvaluatorConfig, Failure, Success};
pub use format::format_failures;
pub use prerequisite::{Prerequisite, PrerequisiteKind, SpecialRule, Threshold};

// Re-export defense types
pub use defense::{resolve_defenses, ArmorSummary, DefenseResolver, DefenseScore, DefenseSet, Defenses};

pub use content::PrerequisiteGraph;
