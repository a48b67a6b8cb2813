use super::node::{BlendInput, BlendNode, BlendOp};
use crate::{
    anim::{util, ClipController},
    anim_error::AnimError,
    hierarchy::Hierarchy,
    pose::{hierarchy_pose, HierarchyPose, HierarchyPoseGroup},
    types::RotationRepr,
};
use log::{info, trace, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Data a blend tree reads from outside during one evaluation
#[derive(Clone, Copy, Debug)]
pub struct BlendContext<'a> {
    pub group: &'a HierarchyPoseGroup,
    pub controllers: &'a [ClipController],
}

/// Serializable description of one node
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlendNodeDesc {
    pub op: BlendOp,
    #[serde(default)]
    pub inputs: Vec<BlendInput>,
    #[serde(default)]
    pub params: Vec<usize>,
}

/// Serializable description of a whole tree
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlendTreeDesc {
    #[serde(default)]
    pub params: Vec<f32>,
    pub nodes: Vec<BlendNodeDesc>,
    pub root: usize,
}

/// Graph of pose operations evaluated once per tick
///
/// Nodes live in an arena and may only read nodes added before them, so the
/// graph cannot contain cycles. A node feeding several parents is computed
/// once per tick and its result reused.
#[derive(Clone, Debug)]
pub struct BlendTree {
    hierarchy: Arc<Hierarchy>,
    repr: RotationRepr,
    nodes: Vec<BlendNode>,
    params: Vec<f32>,
    root: Option<usize>,
    tick: u64,
}

impl BlendTree {
    #[must_use]
    pub fn new(hierarchy: &Arc<Hierarchy>, repr: RotationRepr) -> Self {
        Self {
            hierarchy: Arc::clone(hierarchy),
            repr,
            nodes: Vec::new(),
            params: Vec::new(),
            root: None,
            tick: 0,
        }
    }

    /// Builds a tree from its description
    ///
    /// # Errors
    /// As for `add_node` and `set_root`
    pub fn from_desc(
        hierarchy: &Arc<Hierarchy>,
        repr: RotationRepr,
        desc: &BlendTreeDesc,
    ) -> Result<Self, AnimError> {
        let mut tree = Self::new(hierarchy, repr);
        for value in &desc.params {
            tree.add_param(*value);
        }
        for node in &desc.nodes {
            tree.add_node(node.op, &node.inputs, &node.params)?;
        }
        tree.set_root(desc.root)?;
        info!(
            "Blend tree built with {} nodes and {} parameters",
            tree.nodes.len(),
            tree.params.len()
        );
        Ok(tree)
    }

    /// Adds a node and returns its id. A node with fewer inputs or
    /// parameters than its operation needs can be added but fails to
    /// evaluate.
    ///
    /// # Errors
    /// Returns `AnimError::Range` if an input refers to a node that is not
    /// already in the tree, a parameter index is outside the parameter
    /// table, or there are more inputs or parameters than the operation
    /// takes
    pub fn add_node(
        &mut self,
        op: BlendOp,
        inputs: &[BlendInput],
        params: &[usize],
    ) -> Result<usize, AnimError> {
        let id = self.nodes.len();
        if inputs.len() > op.input_count() {
            return Err(AnimError::range(
                "blend input",
                inputs.len() - 1,
                op.input_count(),
            ));
        }
        if params.len() > op.param_count() {
            return Err(AnimError::range(
                "blend node parameter",
                params.len() - 1,
                op.param_count(),
            ));
        }
        for input in inputs {
            if let BlendInput::Node(child) = *input {
                if child >= id {
                    return Err(AnimError::range("blend input node", child, id));
                }
            }
        }
        if let Some(p) = params.iter().find(|p| **p >= self.params.len()) {
            return Err(AnimError::range("blend parameter", *p, self.params.len()));
        }
        let result = HierarchyPose::new(&self.hierarchy, self.repr);
        self.nodes.push(BlendNode::new(op, inputs, params, result));
        Ok(id)
    }

    /// Adds a parameter to the table and returns its index
    pub fn add_param(&mut self, value: f32) -> usize {
        self.params.push(value);
        self.params.len() - 1
    }

    /// # Errors
    /// Returns `AnimError::Range` if `index` is outside the parameter table
    pub fn set_param(&mut self, index: usize, value: f32) -> Result<(), AnimError> {
        let bound = self.params.len();
        *self
            .params
            .get_mut(index)
            .ok_or(AnimError::range("blend parameter", index, bound))? = value;
        Ok(())
    }

    #[must_use]
    pub fn param(&self, index: usize) -> Option<f32> {
        self.params.get(index).copied()
    }

    /// Selects the node whose result `evaluate` returns
    ///
    /// # Errors
    /// Returns `AnimError::Range` if `id` is not a node of the tree
    pub fn set_root(&mut self, id: usize) -> Result<(), AnimError> {
        if id >= self.nodes.len() {
            return Err(AnimError::range("blend root", id, self.nodes.len()));
        }
        self.root = Some(id);
        Ok(())
    }

    #[must_use]
    pub const fn hierarchy(&self) -> &Arc<Hierarchy> {
        &self.hierarchy
    }

    #[must_use]
    pub fn node(&self, id: usize) -> Option<&BlendNode> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Evaluates the root for a new tick and returns its result
    ///
    /// # Errors
    /// Returns `AnimError::IncompleteNode` for the first node found missing
    /// an input, parameter or controller. The failing node and everything
    /// above it keep their previous results. Other errors come from the
    /// pose operations.
    pub fn evaluate(&mut self, ctx: &BlendContext) -> Result<&HierarchyPose, AnimError> {
        let root = self
            .root
            .ok_or_else(|| AnimError::NotFound("blend tree root".to_string()))?;
        self.tick += 1;
        let tick = self.tick;
        self.evaluate_node(root, ctx).map_err(|e| {
            warn!("blend tree tick {} aborted: {}", tick, e);
            e
        })?;
        Ok(&self.nodes[root].result)
    }

    fn evaluate_node(&mut self, id: usize, ctx: &BlendContext) -> Result<(), AnimError> {
        if self.nodes[id].tick == self.tick {
            return Ok(());
        }
        let inputs = self.nodes[id].inputs.clone();
        for source in &inputs {
            if let BlendInput::Node(child) = *source {
                self.evaluate_node(child, ctx)?;
            }
        }

        let Self {
            nodes, params, tick, ..
        } = self;
        let (done, rest) = nodes.split_at_mut(id);
        let node = &mut rest[0];
        if !node.is_complete() {
            return Err(AnimError::IncompleteNode(id));
        }
        let param = |k: usize| params[node.params[k]];
        let n = node.result.len();

        match node.op {
            BlendOp::Identity => {
                let a = input(done, ctx.group, node.inputs[0])?;
                hierarchy_pose::copy(&mut node.result, a, n)?;
            }
            BlendOp::Lerp => {
                let a = input(done, ctx.group, node.inputs[0])?;
                let b = input(done, ctx.group, node.inputs[1])?;
                hierarchy_pose::lerp(&mut node.result, a, b, param(0), n)?;
            }
            BlendOp::Concatenate => {
                let a = input(done, ctx.group, node.inputs[0])?;
                let b = input(done, ctx.group, node.inputs[1])?;
                hierarchy_pose::concat(&mut node.result, a, b, n)?;
            }
            BlendOp::Scale => {
                let a = input(done, ctx.group, node.inputs[0])?;
                hierarchy_pose::scale(&mut node.result, a, param(0), n)?;
            }
            BlendOp::Invert => {
                let a = input(done, ctx.group, node.inputs[0])?;
                hierarchy_pose::invert(&mut node.result, a, n)?;
            }
            BlendOp::ClipSample { controller } => {
                let controller = ctx
                    .controllers
                    .get(controller)
                    .ok_or(AnimError::IncompleteNode(id))?;
                util::sample(&mut node.result, controller, ctx.group)?;
            }
        }
        node.tick = *tick;
        node.evaluations += 1;
        trace!("blend node {} ({:?}) evaluated", id, node.op);
        Ok(())
    }
}

/// Resolves one pose input against the already evaluated nodes
fn input<'a>(
    done: &'a [BlendNode],
    group: &'a HierarchyPoseGroup,
    input: BlendInput,
) -> Result<&'a HierarchyPose, AnimError> {
    match input {
        BlendInput::Node(child) => Ok(&done[child].result),
        BlendInput::Sample(index) => group.pose(index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        anim::{ClipPool, KeyframePool},
        types::EulerOrder,
    };
    use nalgebra_glm as glm;

    const EPS: f32 = 0.0001;

    fn group() -> HierarchyPoseGroup {
        let h = Arc::new(Hierarchy::new(&[("root", None), ("tip", Some(0))]).unwrap());
        let mut g =
            HierarchyPoseGroup::new(&h, 3, RotationRepr::Euler, EulerOrder::Xyz).unwrap();
        g.pose_mut(1).unwrap()[1].translate = glm::vec3(2.0, 0.0, 0.0);
        g.pose_mut(2).unwrap()[1].translate = glm::vec3(0.0, 4.0, 0.0);
        g
    }

    fn ctx(group: &HierarchyPoseGroup) -> BlendContext {
        BlendContext {
            group,
            controllers: &[],
        }
    }

    #[test]
    fn lerp_of_samples() {
        let g = group();
        let mut tree = BlendTree::new(g.hierarchy(), RotationRepr::Euler);
        let w = tree.add_param(0.5);
        let id = tree
            .add_node(
                BlendOp::Lerp,
                &[BlendInput::Sample(1), BlendInput::Sample(2)],
                &[w],
            )
            .unwrap();
        tree.set_root(id).unwrap();
        let out = tree.evaluate(&ctx(&g)).unwrap();
        assert!(glm::length(&(out[1].translate - glm::vec3(1.0, 2.0, 0.0))) < EPS);
        tree.set_param(w, 1.0).unwrap();
        let out = tree.evaluate(&ctx(&g)).unwrap();
        assert!(glm::length(&(out[1].translate - glm::vec3(0.0, 4.0, 0.0))) < EPS);
    }

    #[test]
    fn shared_node_is_evaluated_once_per_tick() {
        let g = group();
        let mut tree = BlendTree::new(g.hierarchy(), RotationRepr::Euler);
        let s = tree.add_param(0.5);
        let shared = tree
            .add_node(BlendOp::Identity, &[BlendInput::Sample(1)], &[])
            .unwrap();
        let left = tree
            .add_node(BlendOp::Scale, &[BlendInput::Node(shared)], &[s])
            .unwrap();
        let right = tree
            .add_node(BlendOp::Invert, &[BlendInput::Node(shared)], &[])
            .unwrap();
        let top = tree
            .add_node(
                BlendOp::Concatenate,
                &[BlendInput::Node(left), BlendInput::Node(right)],
                &[],
            )
            .unwrap();
        tree.set_root(top).unwrap();
        let out = tree.evaluate(&ctx(&g)).unwrap();
        // 0.5 * 2 - 2
        assert!((out[1].translate.x + 1.0).abs() < EPS);
        assert_eq!(tree.node(shared).unwrap().evaluations(), 1);
        tree.evaluate(&ctx(&g)).unwrap();
        assert_eq!(tree.node(shared).unwrap().evaluations(), 2);
        assert_eq!(tree.node(top).unwrap().evaluations(), 2);
    }

    #[test]
    fn incomplete_node_keeps_stale_result() {
        let g = group();
        let mut tree = BlendTree::new(g.hierarchy(), RotationRepr::Euler);
        let ok = tree
            .add_node(BlendOp::Identity, &[BlendInput::Sample(1)], &[])
            .unwrap();
        let broken = tree
            .add_node(BlendOp::Lerp, &[BlendInput::Node(ok)], &[])
            .unwrap();
        tree.set_root(broken).unwrap();
        assert!(matches!(
            tree.evaluate(&ctx(&g)),
            Err(AnimError::IncompleteNode(id)) if id == broken
        ));
        let node = tree.node(broken).unwrap();
        assert_eq!(node.evaluations(), 0);
        assert!(glm::length(&node.result()[1].translate) < EPS);
    }

    #[test]
    fn missing_controller_is_incomplete() {
        let g = group();
        let mut tree = BlendTree::new(g.hierarchy(), RotationRepr::Euler);
        let id = tree
            .add_node(BlendOp::ClipSample { controller: 0 }, &[], &[])
            .unwrap();
        tree.set_root(id).unwrap();
        assert!(matches!(
            tree.evaluate(&ctx(&g)),
            Err(AnimError::IncompleteNode(0))
        ));
    }

    #[test]
    fn clip_sample_reads_controller() {
        let g = group();
        let mut keys = KeyframePool::create(1).unwrap();
        let k = keys.keyframe_mut(0).unwrap();
        k.sample_index0 = 1;
        k.sample_index1 = 2;
        let keys = Arc::new(keys);
        let mut clips = ClipPool::create(1).unwrap();
        clips.init_clip(0, "blend", &keys, 0, 0).unwrap();
        let mut controller = ClipController::new(&Arc::new(clips), 0).unwrap();
        controller.update(0.25);
        let controllers = [controller];

        let mut tree = BlendTree::new(g.hierarchy(), RotationRepr::Euler);
        let id = tree
            .add_node(BlendOp::ClipSample { controller: 0 }, &[], &[])
            .unwrap();
        tree.set_root(id).unwrap();
        let out = tree
            .evaluate(&BlendContext {
                group: &g,
                controllers: &controllers,
            })
            .unwrap();
        assert!(glm::length(&(out[1].translate - glm::vec3(1.5, 1.0, 0.0))) < EPS);
    }

    #[test]
    fn forward_references_are_rejected() {
        let g = group();
        let mut tree = BlendTree::new(g.hierarchy(), RotationRepr::Euler);
        assert!(matches!(
            tree.add_node(BlendOp::Identity, &[BlendInput::Node(0)], &[]),
            Err(AnimError::Range { .. })
        ));
        assert!(matches!(
            tree.add_node(BlendOp::Scale, &[BlendInput::Sample(0)], &[0]),
            Err(AnimError::Range { .. })
        ));
        assert!(tree.set_root(0).is_err());
    }

    #[test]
    fn surplus_inputs_are_rejected() {
        let g = group();
        let mut tree = BlendTree::new(g.hierarchy(), RotationRepr::Euler);
        let w = tree.add_param(0.5);
        let a = tree
            .add_node(BlendOp::Identity, &[BlendInput::Sample(1)], &[])
            .unwrap();
        let three = [
            BlendInput::Node(a),
            BlendInput::Sample(1),
            BlendInput::Sample(2),
        ];
        assert!(matches!(
            tree.add_node(BlendOp::Lerp, &three, &[w]),
            Err(AnimError::Range { index: 2, bound: 2, .. })
        ));
        assert!(matches!(
            tree.add_node(BlendOp::Concatenate, &three, &[]),
            Err(AnimError::Range { .. })
        ));
        assert!(matches!(
            tree.add_node(BlendOp::Identity, &[BlendInput::Sample(1)], &[w]),
            Err(AnimError::Range { .. })
        ));
        // Nothing was added by the failed calls
        assert!(tree.node(1).is_none());
    }

    #[test]
    fn built_from_yaml() {
        let g = group();
        let desc: BlendTreeDesc = serde_yaml::from_str(
            "
params: [0.25]
nodes:
  - op: Identity
    inputs: [!Sample 1]
  - op: Scale
    inputs: [!Node 0]
    params: [0]
root: 1
",
        )
        .unwrap();
        let mut tree = BlendTree::from_desc(g.hierarchy(), RotationRepr::Euler, &desc).unwrap();
        let out = tree.evaluate(&ctx(&g)).unwrap();
        assert!((out[1].translate.x - 0.5).abs() < EPS);
    }
}
