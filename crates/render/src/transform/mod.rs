//! Tree rewriting stages run after structural parsing.

/// Custom emoji substitution.
pub mod emoji;
/// Block code lifting.
pub mod lift;
/// Mention and hashtag recognition.
pub mod mention;

pub use emoji::substitute_emoji;
pub use lift::lift_code_blocks;
pub use mention::recognize_links;

use crate::node::RenderNode;

/// Caller-supplied rewrite of the finished render forest.
pub trait NodeTransform: Send + Sync {
    /// Mutate the render forest in place.
    fn transform(&self, nodes: &mut Vec<RenderNode>);
}

impl<F> NodeTransform for F
where
    F: Fn(&mut Vec<RenderNode>) + Send + Sync,
{
    fn transform(&self, nodes: &mut Vec<RenderNode>) {
        (self)(nodes)
    }
}
