//! Core data models for PDB entries and their publications.

mod identifier;
mod publication;
mod selection;

pub use identifier::PdbId;
pub use publication::{AbstractSections, Publication, PublicationSet};
pub use selection::ContextSelection;
