//! Ego-vehicle driving-task library
//!
//! Tracks a controlled vehicle's progress along a planned route inside an
//! externally clocked simulation, evaluates traffic-rule compliance every
//! step, and produces a reactive fallback control command.

pub mod driving;
