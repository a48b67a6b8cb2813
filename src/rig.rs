//! One animated skeleton instance and its per tick pipeline
//!
//! A tick runs clip controllers, the blend tree, forward kinematics, the
//! effector solvers and the skinning derivation in that order. Work happens
//! in scratch states and the published state is replaced only when the
//! whole tick succeeds, so a failed tick leaves the previous pose visible.

use crate::{
    anim::{util::weight, ClipController, ClipPool},
    anim_error::AnimError,
    blend::{BlendContext, BlendOp, BlendTree},
    config::{LimbNames, RigConfig},
    hierarchy::Hierarchy,
    ik::{look_at, two_bone, TwoBoneChain},
    kinematics,
    pose::{hierarchy_pose, HierarchyPoseGroup, HierarchyState},
    skin::SkinBuffers,
    types::RootMotion,
};
use log::{debug, info, warn};
use nalgebra_glm as glm;
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use std::sync::Arc;

/// Immutable data shared by every instance of one character
#[derive(Clone, Debug)]
pub struct RigAssets {
    pub group: Arc<HierarchyPoseGroup>,
    pub clips: Arc<ClipPool>,
    /// Rest state derived from the group's base pose
    pub rest: Arc<HierarchyState>,
}

impl RigAssets {
    /// # Errors
    /// Returns `AnimError::SingularTransform` if the base pose cannot be
    /// inverted
    pub fn new(
        group: Arc<HierarchyPoseGroup>,
        clips: Arc<ClipPool>,
    ) -> Result<Self, AnimError> {
        let rest = Arc::new(HierarchyState::from_base(&group)?);
        Ok(Self { group, clips, rest })
    }

    #[must_use]
    pub fn hierarchy(&self) -> &Arc<Hierarchy> {
        self.group.hierarchy()
    }
}

/// Effector target and the pole point the limb bends toward, both in the
/// skeleton's object space
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EffectorTarget {
    pub target: glm::Vec3,
    pub constraint: glm::Vec3,
}

/// Control signals for one tick. Solvers without a target are skipped.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RigInputs {
    pub move_axis: glm::Vec2,
    pub look_axis: glm::Vec2,
    pub jump: bool,
    pub look_target: Option<glm::Vec3>,
    pub right_hand: Option<EffectorTarget>,
    pub left_foot: Option<EffectorTarget>,
    pub right_foot: Option<EffectorTarget>,
}

#[derive(Clone, Copy, Debug, Default)]
struct RigJoints {
    neck: Option<usize>,
    spine: Option<(usize, usize)>,
    right_arm: Option<TwoBoneChain>,
    left_leg: Option<TwoBoneChain>,
    right_leg: Option<TwoBoneChain>,
}

impl RigJoints {
    fn resolve(hierarchy: &Hierarchy, config: &RigConfig) -> Result<Self, AnimError> {
        let limb = |names: Option<&LimbNames>| {
            names
                .map(|l| TwoBoneChain::from_names(hierarchy, &l.base, &l.mid, &l.end))
                .transpose()
        };
        let spine = match &config.spine {
            Some((first, last)) => {
                let (first, last) = (hierarchy.find(first)?, hierarchy.find(last)?);
                hierarchy.chain(first, last)?;
                Some((first, last))
            }
            None => None,
        };
        Ok(Self {
            neck: config.neck.as_deref().map(|n| hierarchy.find(n)).transpose()?,
            spine,
            right_arm: limb(config.right_arm.as_ref())?,
            left_leg: limb(config.left_leg.as_ref())?,
            right_leg: limb(config.right_leg.as_ref())?,
        })
    }
}

/// One animated instance
#[derive(Clone, Debug)]
pub struct Rig {
    assets: RigAssets,
    config: RigConfig,
    joints: RigJoints,
    controllers: Vec<ClipController>,
    blend: BlendTree,
    fk: HierarchyState,
    ik: HierarchyState,
    output: HierarchyState,
    skin: SkinBuffers,
    pitch: f32,
}

impl Rig {
    /// Creates an instance playing `controllers`
    ///
    /// The blend tree comes from the configuration when it has one, else a
    /// single node samples controller 0. The published state starts at the
    /// rest pose.
    ///
    /// # Errors
    /// Returns `AnimError::NotFound` if a configured joint is missing from
    /// the hierarchy, `AnimError::Range` if the root motion controller is
    /// not one of `controllers`, and the blend tree construction errors
    pub fn new(
        assets: RigAssets,
        config: RigConfig,
        controllers: Vec<ClipController>,
    ) -> Result<Self, AnimError> {
        let hierarchy = Arc::clone(assets.hierarchy());
        let repr = assets.group.repr();
        let joints = RigJoints::resolve(&hierarchy, &config)?;
        let source = config.root_motion_controller;
        if !controllers.is_empty() && source >= controllers.len() {
            return Err(AnimError::range(
                "root motion controller",
                source,
                controllers.len(),
            ));
        }
        let blend = match &config.blend_tree {
            Some(desc) => BlendTree::from_desc(&hierarchy, repr, desc)?,
            None => {
                let mut tree = BlendTree::new(&hierarchy, repr);
                let id = tree.add_node(BlendOp::ClipSample { controller: 0 }, &[], &[])?;
                tree.set_root(id)?;
                tree
            }
        };
        let rest: &HierarchyState = &assets.rest;
        let mut skin = SkinBuffers::default();
        skin.update(rest);
        info!(
            "Rig created with {} joints and {} controllers",
            hierarchy.len(),
            controllers.len()
        );
        Ok(Self {
            fk: rest.clone(),
            ik: rest.clone(),
            output: rest.clone(),
            assets,
            config,
            joints,
            controllers,
            blend,
            skin,
            pitch: 0.0,
        })
    }

    /// Replaces the blend tree
    ///
    /// # Errors
    /// Returns `AnimError::HierarchyMismatch` if the tree was built for
    /// another hierarchy
    pub fn set_blend_tree(&mut self, tree: BlendTree) -> Result<(), AnimError> {
        if !Arc::ptr_eq(tree.hierarchy(), self.assets.hierarchy()) {
            return Err(AnimError::HierarchyMismatch);
        }
        self.blend = tree;
        Ok(())
    }

    /// Advances the instance by `dt` seconds
    ///
    /// Controllers and the look pitch advance even when the tick fails.
    ///
    /// # Errors
    /// Any error from the blend tree, pose operations or solvers. The
    /// published state and skinning buffers keep the last good tick.
    pub fn update(&mut self, dt: f32, inputs: &RigInputs) -> Result<(), AnimError> {
        self.advance_controls(dt, inputs)?;
        self.evaluate(inputs).map_err(|e| {
            warn!("rig tick dropped: {}", e);
            e
        })?;
        std::mem::swap(&mut self.output, &mut self.ik);
        self.skin.update(&self.output);
        Ok(())
    }

    fn advance_controls(&mut self, dt: f32, inputs: &RigInputs) -> Result<(), AnimError> {
        if inputs.jump {
            if let Some(j) = self.config.jump_controller {
                let bound = self.controllers.len();
                self.controllers
                    .get_mut(j)
                    .ok_or(AnimError::range("jump controller", j, bound))?
                    .jump_to_start();
                debug!("jump restarted controller {}", j);
            }
        }
        for controller in &mut self.controllers {
            controller.update(dt);
        }
        if let Some(p) = self.config.locomotion_param {
            let speed = weight(0.0, 1.0, glm::length(&inputs.move_axis));
            self.blend.set_param(p, speed)?;
        }
        let (low, high) = self.config.pitch_range();
        self.pitch = inputs
            .look_axis
            .y
            .mul_add(-self.config.look_sensitivity, self.pitch)
            .clamp(low, high);
        Ok(())
    }

    fn evaluate(&mut self, inputs: &RigInputs) -> Result<(), AnimError> {
        let group: &HierarchyPoseGroup = &self.assets.group;
        let n = self.fk.len();

        let ctx = BlendContext {
            group,
            controllers: &self.controllers,
        };
        let blended = self.blend.evaluate(&ctx)?;
        hierarchy_pose::copy(&mut self.fk.anim_pose, blended, n)?;
        if let Some((first, last)) = self.joints.spine {
            let pitch = glm::vec3(self.pitch, 0.0, 0.0);
            hierarchy_pose::rotate_range(
                &mut self.fk.anim_pose,
                first,
                last,
                &pitch,
                group.order(),
            )?;
        }

        hierarchy_pose::concat(
            &mut self.fk.local_space,
            group.base_pose(),
            &self.fk.anim_pose,
            n,
        )?;
        let root_motion = self
            .controllers
            .get(self.config.root_motion_controller)
            .map_or(RootMotion::all(), |c| c.clip().root_motion);
        hierarchy_pose::convert(
            &mut self.fk.local_space,
            n,
            group.channels(),
            group.order(),
            root_motion,
        );
        kinematics::solve_forward(&mut self.fk)?;

        self.ik.copy_from(&self.fk)?;
        if self.config.ik_enabled {
            self.solve_effectors(inputs)?;
        }

        self.ik.update_local_inverse()?;
        self.ik.update_object_inverse()?;
        self.ik.update_bind_to_current(&self.assets.rest)
    }

    fn solve_effectors(&mut self, inputs: &RigInputs) -> Result<(), AnimError> {
        let up = self.config.world_up();
        if let (Some(neck), Some(target)) = (self.joints.neck, inputs.look_target) {
            look_at::solve(&mut self.ik, neck, &target, &up)?;
        }
        let limbs = [
            (self.joints.right_arm, inputs.right_hand),
            (self.joints.left_leg, inputs.left_foot),
            (self.joints.right_leg, inputs.right_foot),
        ];
        for (chain, effector) in limbs {
            if let (Some(chain), Some(e)) = (chain, effector) {
                two_bone::solve(
                    &mut self.ik,
                    &self.assets.rest,
                    &chain,
                    &e.target,
                    &e.constraint,
                    &up,
                )?;
            }
        }
        Ok(())
    }

    /// State published by the last successful tick
    #[must_use]
    pub const fn output(&self) -> &HierarchyState {
        &self.output
    }

    /// Forward kinematics result of the last tick, before effectors
    #[must_use]
    pub const fn fk_state(&self) -> &HierarchyState {
        &self.fk
    }

    #[must_use]
    pub const fn skin(&self) -> &SkinBuffers {
        &self.skin
    }

    #[must_use]
    pub fn controllers(&self) -> &[ClipController] {
        &self.controllers
    }

    pub fn controllers_mut(&mut self) -> &mut [ClipController] {
        &mut self.controllers
    }

    #[must_use]
    pub const fn blend_tree(&self) -> &BlendTree {
        &self.blend
    }

    pub fn blend_tree_mut(&mut self) -> &mut BlendTree {
        &mut self.blend
    }

    #[must_use]
    pub const fn config(&self) -> &RigConfig {
        &self.config
    }

    /// Current spine pitch in degrees
    #[must_use]
    pub const fn pitch(&self) -> f32 {
        self.pitch
    }
}

/// Updates independent instances, in parallel when the `rayon` feature is
/// enabled. Instance `i` reads `inputs[i]`, or default inputs if there are
/// fewer inputs than instances. Returns one result per instance.
pub fn update_all(
    rigs: &mut [Rig],
    dt: f32,
    inputs: &[RigInputs],
) -> Vec<Result<(), AnimError>> {
    let idle = RigInputs::default();
    #[cfg(feature = "rayon")]
    let results = rigs
        .par_iter_mut()
        .enumerate()
        .map(|(i, rig)| rig.update(dt, inputs.get(i).unwrap_or(&idle)))
        .collect();
    #[cfg(not(feature = "rayon"))]
    let results = rigs
        .iter_mut()
        .enumerate()
        .map(|(i, rig)| rig.update(dt, inputs.get(i).unwrap_or(&idle)))
        .collect();
    results
}
