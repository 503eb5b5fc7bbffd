//! # nl2tdl
//!
//! Turns a free-form robot instruction ("박스를 A에서 B로 옮겨줘", "pick the box from home
//! and place it at B") into a Task Description Language (TDL) document and ranks robots
//! able to run it.
//!
//! The pipeline has three stages, each usable on its own:
//!
//! 1. [`analyzer`]: text to [`Requirement`] (actions, objects, locations, constraints).
//! 2. [`synthesizer`] + [`validator`]: requirement to a location-resolved [`TdlDocument`],
//!    then structural and semantic checks.
//! 3. [`selector`]: requirement constraints against a robot specification database.
//!
//! [`Workflow`] wires them together from a [`PipelineConfig`].

pub mod analyzer;
pub mod config;
pub mod export;
pub mod lexicon;
pub mod location;
pub mod logging;
pub mod provider;
pub mod render;
pub mod requirement;
pub mod selector;
pub mod synthesizer;
pub mod tdl;
pub mod validator;
pub mod workflow;

pub use analyzer::*;
pub use config::*;
pub use export::*;
pub use lexicon::Lexicon;
pub use location::*;
pub use logging::*;
pub use provider::*;
pub use render::*;
pub use requirement::*;
pub use selector::*;
pub use synthesizer::*;
pub use tdl::*;
pub use validator::*;
pub use workflow::*;
