//! Context assembly and analysis-chain selection
//!
//! Formats heterogeneous evidence into a bounded set of named text
//! sections for the report generator. Sections are never omitted: an empty
//! category produces an explicit absence sentence, so the downstream
//! template always receives every placeholder it expects.

mod assembler;
mod paths;

pub use assembler::{
    assemble, select_chain, COMPREHENSIVE_SECTIONS, TRADITIONAL_SECTIONS,
};
pub use paths::{path_line, render_correlation_paths};
