use bevy_heavy::ComputeMassProperties3d;
use bevy_math::primitives::{Capsule3d, Cuboid, Cylinder, Sphere};
use glam::{Mat3, Vec3};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// A unique identifier for a frame (world, link or tool) in the tree.
pub type Name = String;

/// Identifier of a physical actuator on the bus.
pub type ActuatorId = u8;

/// Length of a component's world-frame velocity/acceleration (3 linear + 3 angular).
pub const COMPONENT_STATE_DIM: usize = 6;

/// Length of the world record's velocity/acceleration (linear terms only).
pub const WORLD_STATE_DIM: usize = 3;

/// A rigid transform: position plus rotation matrix.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Mat3,
}

impl Pose {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Mat3::IDENTITY,
    };

    pub fn new(position: Vec3, orientation: Mat3) -> Self {
        Self {
            position,
            orientation,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Velocity and acceleration of a frame, expressed in the world frame.
///
/// Components carry [`COMPONENT_STATE_DIM`] entries; the world record carries
/// [`WORLD_STATE_DIM`]. The two are kept distinct on purpose.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub velocity: DVector<f64>,
    pub acceleration: DVector<f64>,
}

impl State {
    /// A state at rest with `dim` entries per vector.
    pub fn zeros(dim: usize) -> Self {
        Self {
            velocity: DVector::zeros(dim),
            acceleration: DVector::zeros(dim),
        }
    }
}

/// Actuation descriptor of a link.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    /// Actuator driving this joint, `None` for a passive joint.
    pub id: Option<ActuatorId>,
    /// Transmission coefficient (gear ratio or sign).
    pub coefficient: f64,
    /// Axis of rotation in the link frame.
    pub axis: Vec3,
    pub angle: f64,
    pub velocity: f64,
    pub acceleration: f64,
}

impl Joint {
    /// A passive joint with no actuator and no axis.
    pub fn passive() -> Self {
        Self {
            id: None,
            coefficient: 0.0,
            axis: Vec3::ZERO,
            angle: 0.0,
            velocity: 0.0,
            acceleration: 0.0,
        }
    }

    /// Whether an actuator drives this joint.
    pub fn is_active(&self) -> bool {
        self.id.is_some()
    }
}

/// End-effector descriptor of a link.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Actuator driving the tool, `None` when the link carries no tool.
    pub id: Option<ActuatorId>,
    pub coefficient: f64,
    pub on_off: bool,
    /// Continuous command value (e.g. gripper opening).
    pub value: f64,
}

impl Tool {
    pub fn none() -> Self {
        Self {
            id: None,
            coefficient: 0.0,
            on_off: false,
            value: 0.0,
        }
    }
}

/// Mass properties of a link.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Inertial {
    /// Mass in kg.
    pub mass: f32,
    /// Inertia tensor about the center of mass, in the link frame.
    pub inertia_tensor: Mat3,
    /// Center of mass in the link frame.
    pub center_of_mass: Vec3,
}

impl Default for Inertial {
    fn default() -> Self {
        Self {
            mass: 0.0,
            inertia_tensor: Mat3::ZERO,
            center_of_mass: Vec3::ZERO,
        }
    }
}

impl Inertial {
    pub fn new(mass: f32, inertia_tensor: Mat3, center_of_mass: Vec3) -> Self {
        Self {
            mass,
            inertia_tensor,
            center_of_mass,
        }
    }

    /// Derives mass properties of a solid link shape with uniform `density` (kg/m³).
    ///
    /// The shape's principal axes coincide with the link frame, so the
    /// resulting tensor is diagonal.
    pub fn from_shape(shape: LinkShape, density: f32) -> Self {
        match shape {
            LinkShape::Box(half_size) => Self::from_primitive(&Cuboid { half_size }, density),
            LinkShape::Cylinder { radius, length } => {
                Self::from_primitive(&Cylinder::new(radius, length), density)
            }
            LinkShape::Sphere(radius) => Self::from_primitive(&Sphere::new(radius), density),
            LinkShape::Capsule { radius, length } => {
                Self::from_primitive(&Capsule3d::new(radius, length), density)
            }
        }
    }

    fn from_primitive(primitive: &impl ComputeMassProperties3d, density: f32) -> Self {
        let mass = primitive.mass(density);
        Self {
            mass,
            inertia_tensor: Mat3::from_diagonal(primitive.unit_principal_angular_inertia() * mass),
            center_of_mass: primitive.center_of_mass(),
        }
    }
}

/// Solid approximations of a link body, used to estimate its [`Inertial`].
///
/// Cylinders and capsules run along the link's Y axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum LinkShape {
    /// Half-extents along x, y, z.
    Box(Vec3),
    Cylinder { radius: f32, length: f32 },
    Sphere(f32),
    Capsule { radius: f32, length: f32 },
}

/// The fixed global reference frame at the root of the tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub name: Name,
    /// The single component attached directly to the world.
    pub child: Name,
    pub pose: Pose,
    /// Linear velocity/acceleration only, [`WORLD_STATE_DIM`] entries.
    pub state: State,
}

impl Default for World {
    fn default() -> Self {
        Self {
            name: Name::new(),
            child: Name::new(),
            pose: Pose::IDENTITY,
            state: State::zeros(WORLD_STATE_DIM),
        }
    }
}

/// One link of the kinematic tree.
///
/// A component is either joint-typed (`tool.id` is `None`) or tool-typed
/// (`tool.id` is set and the joint is passive). Neighbours are referenced by
/// name only; all navigation goes through the owning manipulator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub parent: Name,
    pub children: Vec<Name>,
    /// Rigid offset from the parent frame, fixed at construction.
    pub relative_to_parent: Pose,
    /// Written by an external forward-kinematics pass.
    pub pose_to_world: Pose,
    /// Written by an external forward-kinematics pass.
    pub state: State,
    pub joint: Joint,
    pub tool: Tool,
    pub inertial: Inertial,
}

impl Component {
    /// Whether this component models an end-effector tool.
    pub fn is_tool(&self) -> bool {
        self.tool.id.is_some()
    }

    pub(crate) fn from_link(def: LinkDefinition) -> Self {
        Self {
            parent: def.parent,
            children: def.child.into_iter().collect(),
            relative_to_parent: def.relative_to_parent,
            pose_to_world: Pose::IDENTITY,
            state: State::zeros(COMPONENT_STATE_DIM),
            joint: Joint {
                id: def.actuator_id,
                coefficient: def.coefficient,
                axis: def.axis,
                angle: 0.0,
                velocity: 0.0,
                acceleration: 0.0,
            },
            tool: Tool::none(),
            inertial: def.inertial,
        }
    }

    pub(crate) fn from_tool(def: ToolDefinition) -> Self {
        Self {
            parent: def.parent,
            children: Vec::new(),
            relative_to_parent: def.relative_to_parent,
            pose_to_world: Pose::IDENTITY,
            state: State::zeros(COMPONENT_STATE_DIM),
            joint: Joint::passive(),
            tool: Tool {
                id: Some(def.tool_id),
                coefficient: def.coefficient,
                on_off: false,
                value: 0.0,
            },
            inertial: def.inertial,
        }
    }
}

/// Construction parameters for a jointed link.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkDefinition {
    /// The world or an existing component.
    pub parent: Name,
    /// The next link outward, which may be declared later.
    pub child: Option<Name>,
    pub relative_to_parent: Pose,
    pub axis: Vec3,
    /// Actuator id; `None` declares a passive joint that adds no DOF.
    pub actuator_id: Option<ActuatorId>,
    pub coefficient: f64,
    pub inertial: Inertial,
}

impl LinkDefinition {
    /// A passive, massless link at the parent's origin.
    pub fn new(parent: impl Into<Name>) -> Self {
        Self {
            parent: parent.into(),
            child: None,
            relative_to_parent: Pose::IDENTITY,
            axis: Vec3::ZERO,
            actuator_id: None,
            coefficient: 1.0,
            inertial: Inertial::default(),
        }
    }

    pub fn with_child(mut self, child: impl Into<Name>) -> Self {
        self.child = Some(child.into());
        self
    }

    pub fn with_offset(mut self, position: Vec3, orientation: Mat3) -> Self {
        self.relative_to_parent = Pose::new(position, orientation);
        self
    }

    pub fn with_actuator(mut self, id: ActuatorId, axis: Vec3, coefficient: f64) -> Self {
        self.actuator_id = Some(id);
        self.axis = axis;
        self.coefficient = coefficient;
        self
    }

    pub fn with_inertial(mut self, inertial: Inertial) -> Self {
        self.inertial = inertial;
        self
    }
}

/// Construction parameters for an end-effector tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub parent: Name,
    pub relative_to_parent: Pose,
    pub tool_id: ActuatorId,
    pub coefficient: f64,
    pub inertial: Inertial,
}

impl ToolDefinition {
    pub fn new(parent: impl Into<Name>, tool_id: ActuatorId) -> Self {
        Self {
            parent: parent.into(),
            relative_to_parent: Pose::IDENTITY,
            tool_id,
            coefficient: 1.0,
            inertial: Inertial::default(),
        }
    }

    pub fn with_offset(mut self, position: Vec3, orientation: Mat3) -> Self {
        self.relative_to_parent = Pose::new(position, orientation);
        self
    }

    pub fn with_coefficient(mut self, coefficient: f64) -> Self {
        self.coefficient = coefficient;
        self
    }

    pub fn with_inertial(mut self, inertial: Inertial) -> Self {
        self.inertial = inertial;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn link_defaults_are_identity_and_at_rest() {
        let def = LinkDefinition::new("world")
            .with_child("link2")
            .with_actuator(11, Vec3::Z, -1.0);
        let component = Component::from_link(def);

        assert_eq!(component.parent, "world");
        assert_eq!(component.children, vec!["link2".to_string()]);
        assert_eq!(component.pose_to_world, Pose::IDENTITY);
        assert_eq!(component.state, State::zeros(COMPONENT_STATE_DIM));
        assert_eq!(component.joint.id, Some(11));
        assert_eq!(component.joint.axis, Vec3::Z);
        assert!(!component.is_tool());
    }

    #[test]
    fn tool_has_passive_joint() {
        let component = Component::from_tool(ToolDefinition::new("link4", 15));
        assert!(component.is_tool());
        assert!(!component.joint.is_active());
        assert!(component.children.is_empty());
        assert!(!component.tool.on_off);
    }

    #[test]
    fn inertial_from_box_shape() {
        // 1 m cube at 1000 kg/m³.
        let inertial = Inertial::from_shape(LinkShape::Box(Vec3::splat(0.5)), 1000.0);
        assert_relative_eq!(inertial.mass, 1000.0f32, epsilon = 1e-2);
        // I = m (a² + b²) / 12 for each axis of a cube with side 1.
        let expected: f32 = 1000.0 * 2.0 / 12.0;
        assert_relative_eq!(inertial.inertia_tensor.x_axis.x, expected, epsilon = 1e-2);
        assert_relative_eq!(inertial.inertia_tensor.y_axis.y, expected, epsilon = 1e-2);
        assert_relative_eq!(inertial.inertia_tensor.z_axis.z, expected, epsilon = 1e-2);
        assert_eq!(inertial.inertia_tensor.x_axis.y, 0.0);
        assert_eq!(inertial.center_of_mass, Vec3::ZERO);
    }
}
