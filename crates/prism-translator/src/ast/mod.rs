//! Typed shader AST, traversal, and deferred structural edits.

pub mod build;
pub mod edit;
pub mod node;
pub mod walk;

pub use edit::{Edit, EditError, EditList, NodePath, Replacement};
pub use node::*;
pub use walk::{Visit, Visitor, Walker};
