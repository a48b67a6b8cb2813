//! Recommend using with
//! `RUSTFLAGS="-C target-cpu=x86-64-v2" cargo bench`
//! which enables SSE4.2 and gives a measurable improvement in the matrix
//! heavy benchmarks.
//!
//! These cover the per tick hot paths: skinning conversion, forward
//! kinematics over a long chain, the two bone triangle and the clip
//! controller walk.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra_glm as glm;
use skelanim::{
    anim::{ClipController, ClipPool, Keyframe, KeyframePool},
    dualquat::{self, DualQuat},
    hierarchy::Hierarchy,
    ik::two_bone,
    kinematics,
    pose::{hierarchy_pose, HierarchyPoseGroup, HierarchyState},
    types::{EulerOrder, RootMotion, RotationRepr},
};
use std::sync::Arc;

const COUNT: usize = 100;
const MUL: f32 = 1.0_f32 / (COUNT as f32);
const JOINTS: usize = 64;

fn mat4_to_dq(c: &mut Criterion) {
    let arr = [
        [1.0f32, 0.0f32, 0.0f32, 0.0f32],
        [0.0f32, 0.3584f32, -0.9336f32, 0.0f32],
        [0.0f32, 0.9336f32, 0.3584f32, 0.0f32],
        [5.0f32, 7.0f32, 9.0f32, 1.0f32],
    ];
    let m: glm::Mat4 = black_box(arr.into());
    c.bench_function("mat4_to_dq", |b| b.iter(|| dualquat::from_mat4(&m)));
}

fn dlb_interpolate(c: &mut Criterion) {
    let dq1 = black_box(DualQuat::new(
        &glm::quat_angle_axis(0.376_f32, &glm::vec3(0.0, 0.0, 1.0)),
        &glm::vec3(3.0, 1.4, 0.0),
    ));
    let dq2 = black_box(DualQuat::new(
        &glm::quat_angle_axis(0.512_f32, &glm::vec3(0.0, 1.0, 0.0)),
        &glm::vec3(1.2, 0.0, -4.0),
    ));
    c.bench_function("dlb interpolate", |b| {
        b.iter(|| {
            for i in 0..=COUNT {
                let _ = dualquat::dlb(&dq1, &dq2, (i as f32) * MUL);
            }
        })
    });
}

/// A single chain of `JOINTS` nodes, each bent a little from its parent
fn chain_state() -> HierarchyState {
    let nodes: Vec<(String, Option<usize>)> = (0..JOINTS)
        .map(|i| (format!("joint{i}"), i.checked_sub(1)))
        .collect();
    let h = Arc::new(Hierarchy::new(&nodes).unwrap());
    let mut group = HierarchyPoseGroup::new(&h, 1, RotationRepr::Euler, EulerOrder::Xyz).unwrap();
    for p in group.pose_mut(0).unwrap().poses_mut().iter_mut().skip(1) {
        p.translate = glm::vec3(0.0, 0.1, 0.0);
        p.rotate = glm::vec4(2.0, 5.0, 1.0, 1.0);
    }
    HierarchyState::from_base(&group).unwrap()
}

fn forward_kinematics(c: &mut Criterion) {
    let mut state = chain_state();
    let channels = vec![skelanim::types::Channels::all(); JOINTS];
    c.bench_function("convert and solve_forward", |b| {
        b.iter(|| {
            hierarchy_pose::convert(
                &mut state.local_space,
                JOINTS,
                &channels,
                EulerOrder::Xyz,
                RootMotion::all(),
            );
            kinematics::solve_forward(black_box(&mut state)).unwrap();
        })
    });
}

fn two_bone_positions(c: &mut Criterion) {
    let base = black_box(glm::vec3(0.0, 1.5, 0.0));
    let constraint = glm::vec3(0.5, 1.0, -1.0);
    let up = glm::vec3(0.0, 1.0, 0.0);
    c.bench_function("two bone positions", |b| {
        b.iter(|| {
            for i in 0..=COUNT {
                let target = glm::vec3(0.2 + (i as f32) * MUL, 0.3, 0.1);
                let _ = two_bone::solve_positions(
                    &base,
                    &target,
                    &constraint,
                    (0.45, 0.4),
                    &glm::Vec3::x(),
                    &up,
                );
            }
        })
    });
}

fn controller_update(c: &mut Criterion) {
    let mut keys = KeyframePool::create(32).unwrap();
    for i in 0..32 {
        *keys.keyframe_mut(i).unwrap() = Keyframe::new(1.0 / 30.0, 0, 0);
    }
    let keys = Arc::new(keys);
    let mut clips = ClipPool::create(1).unwrap();
    clips.init_clip(0, "walk", &keys, 0, 31).unwrap();
    let mut controller = ClipController::new(&Arc::new(clips), 0).unwrap();
    c.bench_function("clip controller update", |b| {
        b.iter(|| {
            for _ in 0..COUNT {
                controller.update(black_box(1.0 / 60.0));
            }
        })
    });
}

criterion_group!(
    benches,
    mat4_to_dq,
    dlb_interpolate,
    forward_kinematics,
    two_bone_positions,
    controller_update
);
criterion_main!(benches);
