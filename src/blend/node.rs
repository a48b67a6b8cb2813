use crate::pose::HierarchyPose;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Operation performed by a blend node
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum BlendOp {
    /// Copies input 0
    Identity,
    /// Interpolates input 0 toward input 1 by parameter 0
    Lerp,
    /// Applies input 1 on top of input 0
    Concatenate,
    /// Scales input 0 from identity by parameter 0
    Scale,
    /// Inverts input 0
    Invert,
    /// Samples the clip of controller `controller` of the evaluation
    /// context
    ClipSample { controller: usize },
}

impl BlendOp {
    /// Number of pose inputs the operation requires
    #[must_use]
    pub const fn input_count(self) -> usize {
        match self {
            Self::ClipSample { .. } => 0,
            Self::Identity | Self::Scale | Self::Invert => 1,
            Self::Lerp | Self::Concatenate => 2,
        }
    }

    /// Number of scalar parameters the operation requires
    #[must_use]
    pub const fn param_count(self) -> usize {
        match self {
            Self::Lerp | Self::Scale => 1,
            _ => 0,
        }
    }
}

/// Where a blend node reads one pose input from
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum BlendInput {
    /// Result of another node of the same tree
    Node(usize),
    /// Sample pose of the evaluation context's pose group
    Sample(usize),
}

pub type Inputs = SmallVec<[BlendInput; 2]>;
pub type Params = SmallVec<[usize; 2]>;

/// One node of a `BlendTree`. Parameters are indices into the tree's
/// parameter table so several nodes can share a control value.
#[derive(Clone, Debug)]
pub struct BlendNode {
    pub(super) op: BlendOp,
    pub(super) inputs: Inputs,
    pub(super) params: Params,
    pub(super) result: HierarchyPose,
    // Tick in which `result` was last computed
    pub(super) tick: u64,
    pub(super) evaluations: u64,
}

impl BlendNode {
    pub(super) fn new(
        op: BlendOp,
        inputs: &[BlendInput],
        params: &[usize],
        result: HierarchyPose,
    ) -> Self {
        Self {
            op,
            inputs: inputs.iter().copied().collect(),
            params: params.iter().copied().collect(),
            result,
            tick: 0,
            evaluations: 0,
        }
    }

    #[must_use]
    pub const fn op(&self) -> BlendOp {
        self.op
    }

    #[must_use]
    pub fn inputs(&self) -> &[BlendInput] {
        &self.inputs
    }

    #[must_use]
    pub fn params(&self) -> &[usize] {
        &self.params
    }

    /// Last successfully computed result
    #[must_use]
    pub const fn result(&self) -> &HierarchyPose {
        &self.result
    }

    /// Number of times the node has been computed since creation
    #[must_use]
    pub const fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// True if the node has every input and parameter its operation needs
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.inputs.len() == self.op.input_count()
            && self.params.len() == self.op.param_count()
    }
}
