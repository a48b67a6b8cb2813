use crate::{anim_error::AnimError, blend::BlendTreeDesc};
use log::info;
use nalgebra_glm as glm;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Names of the three joints of a limb
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimbNames {
    pub base: String,
    pub mid: String,
    pub end: String,
}

impl LimbNames {
    fn mixamo(base: &str, mid: &str, end: &str) -> Self {
        Self {
            base: format!("mixamorig:{base}"),
            mid: format!("mixamorig:{mid}"),
            end: format!("mixamorig:{end}"),
        }
    }
}

/// Settings of one animated rig
///
/// Missing fields take their default values, which use the Mixamo joint
/// names. A limb or joint set to `None` disables the solver using it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    pub neck: Option<String>,
    /// First and last joints the look pitch is spread over
    pub spine: Option<(String, String)>,
    pub right_arm: Option<LimbNames>,
    pub left_leg: Option<LimbNames>,
    pub right_leg: Option<LimbNames>,
    /// Lower and upper spine pitch in degrees
    pub pitch_limits: (f32, f32),
    /// Degrees of pitch per unit of vertical look input
    pub look_sensitivity: f32,
    pub ik_enabled: bool,
    /// Controller restarted by the jump trigger
    pub jump_controller: Option<usize>,
    /// Controller whose clip decides which root channels move the rig
    pub root_motion_controller: usize,
    /// Blend tree parameter driven by the move axis magnitude
    pub locomotion_param: Option<usize>,
    pub world_up: [f32; 3],
    pub blend_tree: Option<BlendTreeDesc>,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            neck: Some("mixamorig:Neck".to_string()),
            spine: Some((
                "mixamorig:Spine".to_string(),
                "mixamorig:Spine2".to_string(),
            )),
            right_arm: Some(LimbNames::mixamo("RightArm", "RightForeArm", "RightHand")),
            left_leg: Some(LimbNames::mixamo("LeftUpLeg", "LeftLeg", "LeftFoot")),
            right_leg: Some(LimbNames::mixamo("RightUpLeg", "RightLeg", "RightFoot")),
            pitch_limits: (-45.0, 45.0),
            look_sensitivity: 1.0,
            ik_enabled: true,
            jump_controller: None,
            root_motion_controller: 0,
            locomotion_param: None,
            world_up: [0.0, 1.0, 0.0],
            blend_tree: None,
        }
    }
}

impl RigConfig {
    /// Parses a configuration from YAML text
    ///
    /// # Errors
    /// Returns `AnimError::SerdeYamlError` if the text is not valid
    pub fn from_yaml(text: &str) -> Result<Self, AnimError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Loads a configuration from a YAML file
    ///
    /// # Errors
    /// Returns `AnimError::StdIoError` if the file cannot be read and
    /// `AnimError::SerdeYamlError` if it is not valid
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AnimError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&text)?;
        info!("Rig configuration loaded from {:?}", path);
        Ok(config)
    }

    /// Serializes the configuration to YAML text
    ///
    /// # Errors
    /// Returns `AnimError::SerdeYamlError` if serialization fails
    pub fn to_yaml(&self) -> Result<String, AnimError> {
        Ok(serde_yaml::to_string(self)?)
    }

    #[must_use]
    pub fn world_up(&self) -> glm::Vec3 {
        glm::make_vec3(&self.world_up)
    }

    /// Pitch limits ordered low to high
    #[must_use]
    pub fn pitch_range(&self) -> (f32, f32) {
        let (a, b) = self.pitch_limits;
        (a.min(b), a.max(b))
    }
}
