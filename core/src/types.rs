//! Shared primitive types used across the entire simulation.

/// A round number. Round 1 is the first decision round.
pub type Round = u32;

/// A team (session owner) identifier as typed by the students.
pub type TeamId = String;

/// Stable identifier for one option inside a decision slot.
pub type ChoiceId = String;

/// The canonical run identifier.
pub type RunId = String;

/// Whole-unit money amount (PLN). May go negative.
pub type Money = i64;
