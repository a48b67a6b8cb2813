//! Skinning handoff
//!
//! The renderer is outside this crate. It receives one bind-to-current
//! transform per joint, both as column major matrices and as dual
//! quaternions, laid out so they can be copied straight into a GPU buffer.

use crate::{dualquat, pose::HierarchyState};

/// Per joint skinning data of one instance, index aligned with the hierarchy
#[derive(Clone, Debug, Default)]
pub struct SkinBuffers {
    matrices: Vec<[[f32; 4]; 4]>,
    dual_quats: Vec<[[f32; 4]; 2]>,
}

impl SkinBuffers {
    /// Rebuilds both buffers from `state.object_space_bind_to_current`
    pub fn update(&mut self, state: &HierarchyState) {
        let transforms = state.object_space_bind_to_current.transforms();
        self.matrices.clear();
        self.dual_quats.clear();
        for m in transforms {
            self.matrices.push((*m).into());
            self.dual_quats.push(dualquat::from_mat4(m).into());
        }
    }

    #[must_use]
    pub fn matrices(&self) -> &[[[f32; 4]; 4]] {
        &self.matrices
    }

    #[must_use]
    pub fn dual_quats(&self) -> &[[[f32; 4]; 2]] {
        &self.dual_quats
    }

    /// Matrix buffer as raw bytes for upload
    #[must_use]
    pub fn matrix_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.matrices)
    }

    /// Dual quaternion buffer as raw bytes for upload
    #[must_use]
    pub fn dual_quat_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.dual_quats)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }
}
