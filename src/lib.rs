//! domkit: declarative DOM tree builder.
//!
//! Layers, innermost first: `domain` (descriptors, builder, in-memory
//! document), `application` (build service), `infrastructure` (filesystem
//! boundary, wiring) and `cli`.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;

pub use domain::{Attach, Created, Descriptor, Document, DomainError, NodeId, NodeTree, TreeBuilder};
