//! Blend tree: a small graph of pose operations producing the animated pose

mod node;
mod tree;

pub use node::{BlendInput, BlendNode, BlendOp};
pub use tree::{BlendContext, BlendNodeDesc, BlendTree, BlendTreeDesc};
