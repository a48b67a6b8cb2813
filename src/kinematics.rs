//! Forward and inverse kinematics over a `HierarchyState`
//!
//! Both directions run as a single pass in index order. This relies on the
//! hierarchy storing every parent before its children.

use crate::{anim_error::AnimError, pose::HierarchyState, util};
use log::trace;
use std::sync::Arc;

fn check_range(
    state: &HierarchyState,
    first: usize,
    count: usize,
) -> Result<usize, AnimError> {
    let n = state.len();
    if first >= n {
        return Err(AnimError::range("first node", first, n));
    }
    if count == 0 {
        return Err(AnimError::range("node count", count, n - first));
    }
    // Counts running past the end are clamped
    Ok(count.min(n - first))
}

/// Propagates local matrices to object space for `count` nodes starting at
/// `first`. Parents of `first` must already hold valid object matrices.
///
/// # Errors
/// Returns `AnimError::Range` if `first` is outside the hierarchy or
/// `count` is zero
pub fn solve_forward_partial(
    state: &mut HierarchyState,
    first: usize,
    count: usize,
) -> Result<(), AnimError> {
    let count = check_range(state, first, count)?;
    let hierarchy = Arc::clone(state.hierarchy());
    for node in &hierarchy.nodes()[first..first + count] {
        let local = state.local_space[node.index].transform;
        state.object_space[node.index].transform = match node.parent {
            Some(p) => state.object_space[p].transform * local,
            None => local,
        };
    }
    trace!("forward kinematics on nodes {first}..{}", first + count);
    Ok(())
}

/// Propagates every local matrix to object space
///
/// # Errors
/// Returns `AnimError::Range` only for an empty state
pub fn solve_forward(state: &mut HierarchyState) -> Result<(), AnimError> {
    solve_forward_partial(state, 0, state.len())
}

/// Re-propagates object matrices to every descendant of `root`, leaving
/// `root` itself untouched. Used after a solver has written object space
/// directly.
///
/// # Errors
/// Returns `AnimError::Range` if `root` is outside the hierarchy
pub fn solve_forward_descendants(
    state: &mut HierarchyState,
    root: usize,
) -> Result<(), AnimError> {
    check_range(state, root, 1)?;
    let hierarchy = Arc::clone(state.hierarchy());
    for node in hierarchy.nodes().iter().skip(root + 1) {
        if let Some(p) = node.parent {
            if hierarchy.is_ancestor(root, p) {
                let local = state.local_space[node.index].transform;
                state.object_space[node.index].transform =
                    state.object_space[p].transform * local;
            }
        }
    }
    Ok(())
}

/// Recovers local matrices from object space for `count` nodes starting at
/// `first`
///
/// # Errors
/// Returns `AnimError::Range` for a bad range and
/// `AnimError::SingularTransform` if a parent's object matrix cannot be
/// inverted
pub fn solve_inverse_partial(
    state: &mut HierarchyState,
    first: usize,
    count: usize,
) -> Result<(), AnimError> {
    let count = check_range(state, first, count)?;
    let hierarchy = Arc::clone(state.hierarchy());
    for node in &hierarchy.nodes()[first..first + count] {
        resolve_local(state, node.index, node.parent)?;
    }
    trace!("inverse kinematics on nodes {first}..{}", first + count);
    Ok(())
}

/// Recovers every local matrix from object space
///
/// # Errors
/// See `solve_inverse_partial`
pub fn solve_inverse(state: &mut HierarchyState) -> Result<(), AnimError> {
    solve_inverse_partial(state, 0, state.len())
}

/// Recovers the local matrix of one node from its object matrix and its
/// parent's
///
/// # Errors
/// Returns `AnimError::Range` if `node` is outside the hierarchy and
/// `AnimError::SingularTransform` if the parent cannot be inverted
pub fn solve_inverse_single(
    state: &mut HierarchyState,
    node: usize,
) -> Result<(), AnimError> {
    check_range(state, node, 1)?;
    let parent = state.hierarchy().parent(node);
    resolve_local(state, node, parent)
}

fn resolve_local(
    state: &mut HierarchyState,
    node: usize,
    parent: Option<usize>,
) -> Result<(), AnimError> {
    let object = state.object_space[node].transform;
    state.local_space[node].transform = match parent {
        Some(p) => util::try_inverse(&state.object_space[p].transform, p)? * object,
        None => object,
    };
    Ok(())
}
