//! Domain layer: descriptors, the tree builder and the in-memory document
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod builder;
pub mod descriptor;
pub mod document;
pub mod error;
pub mod html;
pub mod render;
pub mod selector;
pub mod tree;

pub use builder::{Attach, Created, TreeBuilder};
pub use descriptor::{Descriptor, Item, Markers};
pub use document::{Document, ElementData, NodeId, NodeKind};
pub use error::{DomainError, DomainResult};
pub use render::TreeNodeConvert;
pub use selector::{SelectorList, SelectorTarget};
pub use tree::{EventBinding, NodeTree, Setting};
