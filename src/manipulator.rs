//! The kinematic tree of a manipulator.
//!
//! A [`Manipulator`] owns one [`World`] record and a name-keyed map of
//! [`Component`]s. Components refer to their parent and children by name only;
//! every cross-component step goes through a map lookup here.
//!
//! Components live in a [`BTreeMap`], so every aggregate query
//! ([`all_active_joint_angle`](Manipulator::all_active_joint_angle),
//! [`set_all_active_joint_angle`](Manipulator::set_all_active_joint_angle), ...)
//! visits components in lexicographic name order. Callers that map the
//! resulting sequences onto actuators must use the same order.

use std::collections::{BTreeMap, HashSet};

use glam::{Mat3, Vec3};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::component::{
    ActuatorId, COMPONENT_STATE_DIM, Component, Inertial, Joint, LinkDefinition, Name, Pose,
    State, Tool, ToolDefinition, WORLD_STATE_DIM, World,
};
use crate::error::{ManipulatorError, Result};
use crate::minimum_jerk::BoundaryState;

/// A manipulator's world frame plus its tree of links and tools.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Manipulator {
    world: World,
    components: BTreeMap<Name, Component>,
}

impl Manipulator {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Construction ---

    /// (Re)initializes the world record. Its velocity and acceleration reset to zero.
    ///
    /// # Errors
    ///
    /// [`ManipulatorError::DuplicateName`] if a component already uses `name`.
    pub fn add_world(
        &mut self,
        name: impl Into<Name>,
        child: impl Into<Name>,
        position: Vec3,
        orientation: Mat3,
    ) -> Result<()> {
        let name = name.into();
        if self.components.contains_key(&name) {
            return Err(ManipulatorError::duplicate_name(name));
        }
        self.world = World {
            name,
            child: child.into(),
            pose: Pose::new(position, orientation),
            state: State::zeros(WORLD_STATE_DIM),
        };
        debug!(world = %self.world.name, child = %self.world.child, "world added");
        Ok(())
    }

    /// Inserts a jointed link under `name`.
    ///
    /// The link is appended to its parent's child list when the parent is an
    /// existing component that does not list it yet.
    ///
    /// # Errors
    ///
    /// [`ManipulatorError::DuplicateName`] if `name` is already taken.
    pub fn add_component(&mut self, name: impl Into<Name>, def: LinkDefinition) -> Result<()> {
        let name = name.into();
        debug!(
            component = %name,
            parent = %def.parent,
            actuator = ?def.actuator_id,
            "adding component"
        );
        self.insert(name, Component::from_link(def))
    }

    /// Appends `child` to the child list of component `name`.
    pub fn add_component_child(&mut self, name: &str, child: impl Into<Name>) -> Result<()> {
        let child = child.into();
        let component = self.component_mut(name)?;
        if !component.children.contains(&child) {
            component.children.push(child);
        }
        Ok(())
    }

    /// Inserts an end-effector tool under `name`. Tools never add a DOF.
    pub fn add_tool(&mut self, name: impl Into<Name>, def: ToolDefinition) -> Result<()> {
        let name = name.into();
        debug!(tool = %name, parent = %def.parent, id = def.tool_id, "adding tool");
        self.insert(name, Component::from_tool(def))
    }

    fn insert(&mut self, name: Name, component: Component) -> Result<()> {
        if self.components.contains_key(&name) || (!name.is_empty() && name == self.world.name) {
            return Err(ManipulatorError::duplicate_name(name));
        }
        if let Some(parent) = self.components.get_mut(&component.parent)
            && !parent.children.contains(&name)
        {
            parent.children.push(name.clone());
        }
        self.components.insert(name, component);
        Ok(())
    }

    /// Validates the tree shape.
    ///
    /// Checks that the world is named and points at an existing child, that
    /// every parent exists and lists its child, that every listed child exists
    /// and names the lister as its parent, and that every component reaches
    /// the world without a cycle.
    pub fn check_tree(&self) -> Result<()> {
        let world = &self.world.name;
        if world.is_empty() {
            return Err(ManipulatorError::invalid_tree("world has not been added"));
        }
        if !self.components.is_empty() && !self.components.contains_key(&self.world.child) {
            return Err(ManipulatorError::invalid_tree(format!(
                "world child '{}' does not exist",
                self.world.child
            )));
        }

        for (name, component) in &self.components {
            if name == world {
                return Err(ManipulatorError::invalid_tree(format!(
                    "component '{name}' shares the world's name"
                )));
            }
            if component.parent == *name {
                return Err(ManipulatorError::invalid_tree(format!(
                    "'{name}' is its own parent"
                )));
            }
            if component.parent != *world {
                let parent = self.components.get(&component.parent).ok_or_else(|| {
                    ManipulatorError::invalid_tree(format!(
                        "parent '{}' of '{name}' does not exist",
                        component.parent
                    ))
                })?;
                if !parent.children.contains(name) {
                    return Err(ManipulatorError::invalid_tree(format!(
                        "'{}' does not list child '{name}'",
                        component.parent
                    )));
                }
            } else if self.world.child != *name {
                return Err(ManipulatorError::invalid_tree(format!(
                    "'{name}' is attached to the world but the world's child is '{}'",
                    self.world.child
                )));
            }

            for child in &component.children {
                match self.components.get(child) {
                    Some(c) if c.parent == *name => {}
                    Some(c) => {
                        return Err(ManipulatorError::invalid_tree(format!(
                            "'{name}' lists child '{child}' whose parent is '{}'",
                            c.parent
                        )));
                    }
                    None => {
                        return Err(ManipulatorError::invalid_tree(format!(
                            "child '{child}' of '{name}' does not exist"
                        )));
                    }
                }
            }
        }

        for name in self.components.keys() {
            let mut visited = HashSet::new();
            let mut current = name;
            while current != world {
                if !visited.insert(current) {
                    return Err(ManipulatorError::invalid_tree(format!(
                        "cycle through '{current}'"
                    )));
                }
                current = &self.components[current].parent;
            }
        }
        Ok(())
    }

    // --- Lookup ---

    fn component_ref(&self, name: &str) -> Result<&Component> {
        self.components
            .get(name)
            .ok_or_else(|| ManipulatorError::unknown_name(name))
    }

    fn component_mut(&mut self, name: &str) -> Result<&mut Component> {
        self.components
            .get_mut(name)
            .ok_or_else(|| ManipulatorError::unknown_name(name))
    }

    /// Mutable joint of a joint-typed component.
    fn joint_mut(&mut self, name: &str) -> Result<&mut Joint> {
        let component = self.component_mut(name)?;
        if component.is_tool() {
            warn!(component = name, "joint mutation rejected on a tool");
            return Err(ManipulatorError::type_mismatch(name, "joint"));
        }
        Ok(&mut component.joint)
    }

    /// Mutable tool of a tool-typed component.
    fn tool_mut(&mut self, name: &str) -> Result<&mut Tool> {
        let component = self.component_mut(name)?;
        if !component.is_tool() {
            warn!(component = name, "tool mutation rejected on a joint");
            return Err(ManipulatorError::type_mismatch(name, "tool"));
        }
        Ok(&mut component.tool)
    }

    // --- World ---

    pub fn world_name(&self) -> &str {
        &self.world.name
    }

    pub fn world_child_name(&self) -> &str {
        &self.world.child
    }

    pub fn world_pose(&self) -> Pose {
        self.world.pose
    }

    pub fn world_position(&self) -> Vec3 {
        self.world.pose.position
    }

    pub fn world_orientation(&self) -> Mat3 {
        self.world.pose.orientation
    }

    pub fn world_state(&self) -> &State {
        &self.world.state
    }

    pub fn world_velocity(&self) -> &DVector<f64> {
        &self.world.state.velocity
    }

    pub fn world_acceleration(&self) -> &DVector<f64> {
        &self.world.state.acceleration
    }

    pub fn set_world_pose(&mut self, pose: Pose) {
        self.world.pose = pose;
    }

    pub fn set_world_position(&mut self, position: Vec3) {
        self.world.pose.position = position;
    }

    pub fn set_world_orientation(&mut self, orientation: Mat3) {
        self.world.pose.orientation = orientation;
    }

    pub fn set_world_state(&mut self, state: State) -> Result<()> {
        check_len("world velocity", WORLD_STATE_DIM, state.velocity.len())?;
        check_len("world acceleration", WORLD_STATE_DIM, state.acceleration.len())?;
        self.world.state = state;
        Ok(())
    }

    pub fn set_world_velocity(&mut self, velocity: &[f64]) -> Result<()> {
        check_len("world velocity", WORLD_STATE_DIM, velocity.len())?;
        self.world.state.velocity = DVector::from_column_slice(velocity);
        Ok(())
    }

    pub fn set_world_acceleration(&mut self, acceleration: &[f64]) -> Result<()> {
        check_len("world acceleration", WORLD_STATE_DIM, acceleration.len())?;
        self.world.state.acceleration = DVector::from_column_slice(acceleration);
        Ok(())
    }

    // --- Components: whole-record access ---

    /// Number of degrees of freedom: components whose joint has an actuator.
    pub fn dof(&self) -> usize {
        self.active_joints().count()
    }

    pub fn component_size(&self) -> usize {
        self.components.len()
    }

    /// All components in name order.
    pub fn components(&self) -> &BTreeMap<Name, Component> {
        &self.components
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Name, &Component)> {
        self.components.iter()
    }

    pub fn component(&self, name: &str) -> Result<&Component> {
        self.component_ref(name)
    }

    /// Replaces an existing component wholesale.
    ///
    /// Tree links are owned by the construction calls, so the replacement must
    /// keep the current parent and child list.
    ///
    /// # Errors
    ///
    /// [`ManipulatorError::UnknownName`] for an absent component,
    /// [`ManipulatorError::TypeMismatch`] if both a joint actuator and a tool
    /// are set, [`ManipulatorError::InvalidTree`] if the parent or children change.
    pub fn set_component(&mut self, name: &str, component: Component) -> Result<()> {
        let current = self.component_mut(name)?;
        if component.is_tool() && component.joint.is_active() {
            warn!(component = name, "replacement has both a joint actuator and a tool");
            return Err(ManipulatorError::type_mismatch(name, "joint or tool, not both"));
        }
        if component.parent != current.parent {
            return Err(ManipulatorError::invalid_tree(format!(
                "replacement moves '{name}' from '{}' to '{}'",
                current.parent, component.parent
            )));
        }
        if component.children != current.children {
            return Err(ManipulatorError::invalid_tree(format!(
                "replacement changes the children of '{name}'"
            )));
        }
        *current = component;
        Ok(())
    }

    // --- Components: tree links ---

    pub fn component_parent_name(&self, name: &str) -> Result<&str> {
        Ok(self.component_ref(name)?.parent.as_str())
    }

    pub fn component_child_names(&self, name: &str) -> Result<&[Name]> {
        Ok(self.component_ref(name)?.children.as_slice())
    }

    // --- Components: frames ---

    pub fn component_pose_to_world(&self, name: &str) -> Result<Pose> {
        Ok(self.component_ref(name)?.pose_to_world)
    }

    pub fn component_position_to_world(&self, name: &str) -> Result<Vec3> {
        Ok(self.component_ref(name)?.pose_to_world.position)
    }

    pub fn component_orientation_to_world(&self, name: &str) -> Result<Mat3> {
        Ok(self.component_ref(name)?.pose_to_world.orientation)
    }

    pub fn component_state_to_world(&self, name: &str) -> Result<&State> {
        Ok(&self.component_ref(name)?.state)
    }

    pub fn component_velocity_to_world(&self, name: &str) -> Result<&DVector<f64>> {
        Ok(&self.component_ref(name)?.state.velocity)
    }

    pub fn component_acceleration_to_world(&self, name: &str) -> Result<&DVector<f64>> {
        Ok(&self.component_ref(name)?.state.acceleration)
    }

    pub fn component_relative_pose_to_parent(&self, name: &str) -> Result<Pose> {
        Ok(self.component_ref(name)?.relative_to_parent)
    }

    pub fn component_relative_position_to_parent(&self, name: &str) -> Result<Vec3> {
        Ok(self.component_ref(name)?.relative_to_parent.position)
    }

    pub fn component_relative_orientation_to_parent(&self, name: &str) -> Result<Mat3> {
        Ok(self.component_ref(name)?.relative_to_parent.orientation)
    }

    pub fn set_component_pose_to_world(&mut self, name: &str, pose: Pose) -> Result<()> {
        self.component_mut(name)?.pose_to_world = pose;
        Ok(())
    }

    pub fn set_component_position_to_world(&mut self, name: &str, position: Vec3) -> Result<()> {
        self.component_mut(name)?.pose_to_world.position = position;
        Ok(())
    }

    pub fn set_component_orientation_to_world(
        &mut self,
        name: &str,
        orientation: Mat3,
    ) -> Result<()> {
        self.component_mut(name)?.pose_to_world.orientation = orientation;
        Ok(())
    }

    pub fn set_component_state_to_world(&mut self, name: &str, state: State) -> Result<()> {
        check_len("component velocity", COMPONENT_STATE_DIM, state.velocity.len())?;
        check_len(
            "component acceleration",
            COMPONENT_STATE_DIM,
            state.acceleration.len(),
        )?;
        self.component_mut(name)?.state = state;
        Ok(())
    }

    /// Sets the 6-dimensional world-frame velocity (3 linear, 3 angular).
    pub fn set_component_velocity_to_world(&mut self, name: &str, velocity: &[f64]) -> Result<()> {
        check_len("component velocity", COMPONENT_STATE_DIM, velocity.len())?;
        self.component_mut(name)?.state.velocity = DVector::from_column_slice(velocity);
        Ok(())
    }

    pub fn set_component_acceleration_to_world(
        &mut self,
        name: &str,
        acceleration: &[f64],
    ) -> Result<()> {
        check_len("component acceleration", COMPONENT_STATE_DIM, acceleration.len())?;
        self.component_mut(name)?.state.acceleration = DVector::from_column_slice(acceleration);
        Ok(())
    }

    // --- Components: joint ---

    pub fn component_joint(&self, name: &str) -> Result<Joint> {
        Ok(self.component_ref(name)?.joint)
    }

    pub fn component_joint_id(&self, name: &str) -> Result<Option<ActuatorId>> {
        Ok(self.component_ref(name)?.joint.id)
    }

    pub fn component_joint_coefficient(&self, name: &str) -> Result<f64> {
        Ok(self.component_ref(name)?.joint.coefficient)
    }

    pub fn component_joint_axis(&self, name: &str) -> Result<Vec3> {
        Ok(self.component_ref(name)?.joint.axis)
    }

    pub fn component_joint_angle(&self, name: &str) -> Result<f64> {
        Ok(self.component_ref(name)?.joint.angle)
    }

    pub fn component_joint_velocity(&self, name: &str) -> Result<f64> {
        Ok(self.component_ref(name)?.joint.velocity)
    }

    pub fn component_joint_acceleration(&self, name: &str) -> Result<f64> {
        Ok(self.component_ref(name)?.joint.acceleration)
    }

    /// # Errors
    ///
    /// [`ManipulatorError::UnknownName`] for an absent component,
    /// [`ManipulatorError::TypeMismatch`] for a tool.
    pub fn set_component_joint_angle(&mut self, name: &str, angle: f64) -> Result<()> {
        self.joint_mut(name)?.angle = angle;
        Ok(())
    }

    pub fn set_component_joint_velocity(&mut self, name: &str, velocity: f64) -> Result<()> {
        self.joint_mut(name)?.velocity = velocity;
        Ok(())
    }

    pub fn set_component_joint_acceleration(
        &mut self,
        name: &str,
        acceleration: f64,
    ) -> Result<()> {
        self.joint_mut(name)?.acceleration = acceleration;
        Ok(())
    }

    // --- Components: tool ---

    pub fn component_tool(&self, name: &str) -> Result<Tool> {
        Ok(self.component_ref(name)?.tool)
    }

    pub fn component_tool_id(&self, name: &str) -> Result<Option<ActuatorId>> {
        Ok(self.component_ref(name)?.tool.id)
    }

    pub fn component_tool_coefficient(&self, name: &str) -> Result<f64> {
        Ok(self.component_ref(name)?.tool.coefficient)
    }

    pub fn component_tool_on_off(&self, name: &str) -> Result<bool> {
        Ok(self.component_ref(name)?.tool.on_off)
    }

    pub fn component_tool_value(&self, name: &str) -> Result<f64> {
        Ok(self.component_ref(name)?.tool.value)
    }

    pub fn set_component_tool_on_off(&mut self, name: &str, on_off: bool) -> Result<()> {
        self.tool_mut(name)?.on_off = on_off;
        Ok(())
    }

    pub fn set_component_tool_value(&mut self, name: &str, value: f64) -> Result<()> {
        self.tool_mut(name)?.value = value;
        Ok(())
    }

    // --- Components: inertial ---

    pub fn component_inertial(&self, name: &str) -> Result<Inertial> {
        Ok(self.component_ref(name)?.inertial)
    }

    pub fn component_mass(&self, name: &str) -> Result<f32> {
        Ok(self.component_ref(name)?.inertial.mass)
    }

    pub fn component_inertia_tensor(&self, name: &str) -> Result<Mat3> {
        Ok(self.component_ref(name)?.inertial.inertia_tensor)
    }

    pub fn component_center_of_mass(&self, name: &str) -> Result<Vec3> {
        Ok(self.component_ref(name)?.inertial.center_of_mass)
    }

    // --- Aggregates ---

    /// Actuated joints of joint-typed components.
    fn active_joints(&self) -> impl Iterator<Item = &Joint> {
        self.components
            .values()
            .filter(|c| !c.is_tool())
            .map(|c| &c.joint)
            .filter(|j| j.is_active())
    }

    fn active_joints_mut(&mut self) -> impl Iterator<Item = &mut Joint> {
        self.components
            .values_mut()
            .filter(|c| !c.is_tool())
            .map(|c| &mut c.joint)
            .filter(|j| j.is_active())
    }

    /// Angles of every joint-typed component, active or passive, in name order.
    pub fn all_joint_angle(&self) -> Vec<f64> {
        self.components
            .values()
            .filter(|c| !c.is_tool())
            .map(|c| c.joint.angle)
            .collect()
    }

    /// Angles of actuated joints in name order.
    pub fn all_active_joint_angle(&self) -> Vec<f64> {
        self.active_joints().map(|j| j.angle).collect()
    }

    /// Actuator ids of actuated joints in name order.
    pub fn all_active_joint_id(&self) -> Vec<ActuatorId> {
        self.active_joints().filter_map(|j| j.id).collect()
    }

    /// Angle, velocity and acceleration of actuated joints in name order.
    ///
    /// Suitable as the start boundary of a joint-space trajectory.
    pub fn all_active_joint_state(&self) -> Vec<BoundaryState> {
        self.active_joints()
            .map(|j| BoundaryState::new(j.angle, j.velocity, j.acceleration))
            .collect()
    }

    /// Assigns `angles` to the actuated joints in name order.
    ///
    /// # Errors
    ///
    /// [`ManipulatorError::DimensionMismatch`] unless `angles.len() == self.dof()`;
    /// no joint is modified in that case.
    pub fn set_all_active_joint_angle(&mut self, angles: &[f64]) -> Result<()> {
        self.assign_active("active joint angles", angles, |j, v| j.angle = v)
    }

    pub fn set_all_active_joint_velocity(&mut self, velocities: &[f64]) -> Result<()> {
        self.assign_active("active joint velocities", velocities, |j, v| j.velocity = v)
    }

    pub fn set_all_active_joint_acceleration(&mut self, accelerations: &[f64]) -> Result<()> {
        self.assign_active("active joint accelerations", accelerations, |j, v| {
            j.acceleration = v
        })
    }

    fn assign_active(
        &mut self,
        what: &'static str,
        values: &[f64],
        assign: impl Fn(&mut Joint, f64),
    ) -> Result<()> {
        check_len(what, self.dof(), values.len())?;
        for (joint, value) in self.active_joints_mut().zip(values) {
            assign(joint, *value);
        }
        Ok(())
    }
}

fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(ManipulatorError::dimension_mismatch(what, expected, actual))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_link_arm() -> Manipulator {
        let mut manipulator = Manipulator::new();
        manipulator
            .add_world("world", "joint1", Vec3::ZERO, Mat3::IDENTITY)
            .unwrap();
        manipulator
            .add_component(
                "joint1",
                LinkDefinition::new("world")
                    .with_child("joint2")
                    .with_actuator(1, Vec3::Z, 1.0),
            )
            .unwrap();
        manipulator
            .add_component(
                "joint2",
                LinkDefinition::new("joint1")
                    .with_child("tool")
                    .with_offset(Vec3::new(0.0, 0.0, 0.2), Mat3::IDENTITY)
                    .with_actuator(2, Vec3::Y, 1.0),
            )
            .unwrap();
        manipulator
            .add_tool("tool", ToolDefinition::new("joint2", 3))
            .unwrap();
        manipulator
    }

    #[test]
    fn construction_defaults() {
        let manipulator = two_link_arm();
        assert_eq!(manipulator.world_name(), "world");
        assert_eq!(manipulator.world_child_name(), "joint1");
        assert_eq!(manipulator.world_velocity().len(), WORLD_STATE_DIM);
        assert_eq!(
            manipulator.component_velocity_to_world("joint2").unwrap().len(),
            COMPONENT_STATE_DIM
        );
        assert_eq!(
            manipulator.component_pose_to_world("joint2").unwrap(),
            Pose::IDENTITY
        );
        assert_eq!(
            manipulator
                .component_relative_position_to_parent("joint2")
                .unwrap(),
            Vec3::new(0.0, 0.0, 0.2)
        );
        assert_eq!(manipulator.component_tool_id("joint1").unwrap(), None);
        assert_eq!(manipulator.component_joint_id("tool").unwrap(), None);
        assert_eq!(manipulator.component_size(), 3);
        assert_eq!(manipulator.dof(), 2);
        manipulator.check_tree().unwrap();
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut manipulator = two_link_arm();
        let err = manipulator
            .add_component("joint1", LinkDefinition::new("world").with_actuator(9, Vec3::X, 1.0))
            .unwrap_err();
        assert_eq!(err, ManipulatorError::duplicate_name("joint1"));

        let err = manipulator
            .add_tool("world", ToolDefinition::new("joint2", 4))
            .unwrap_err();
        assert_eq!(err, ManipulatorError::duplicate_name("world"));

        assert_eq!(manipulator.dof(), 2);
        assert_eq!(manipulator.component_joint_id("joint1").unwrap(), Some(1));
    }

    #[test]
    fn insertion_registers_with_parent() {
        let mut manipulator = two_link_arm();
        manipulator
            .add_component("camera_mount", LinkDefinition::new("joint1"))
            .unwrap();
        assert_eq!(
            manipulator.component_child_names("joint1").unwrap(),
            &["joint2".to_string(), "camera_mount".to_string()]
        );
        manipulator.check_tree().unwrap();
    }

    #[test]
    fn add_component_child_requires_known_name() {
        let mut manipulator = two_link_arm();
        let err = manipulator.add_component_child("nope", "joint2").unwrap_err();
        assert_eq!(err, ManipulatorError::unknown_name("nope"));

        manipulator.add_component_child("joint2", "tool").unwrap();
        assert_eq!(
            manipulator.component_child_names("joint2").unwrap(),
            &["tool".to_string()]
        );
    }

    #[test]
    fn joint_mutation_is_guarded() {
        let mut manipulator = two_link_arm();

        let err = manipulator.set_component_joint_angle("tool", 1.0).unwrap_err();
        assert_eq!(err, ManipulatorError::type_mismatch("tool", "joint"));
        assert_eq!(manipulator.component_joint_angle("tool").unwrap(), 0.0);

        let err = manipulator.set_component_joint_velocity("ghost", 1.0).unwrap_err();
        assert_eq!(err, ManipulatorError::unknown_name("ghost"));

        manipulator.set_component_joint_acceleration("joint2", -0.5).unwrap();
        assert_eq!(manipulator.component_joint_acceleration("joint2").unwrap(), -0.5);
    }

    #[test]
    fn tool_mutation_is_guarded() {
        let mut manipulator = two_link_arm();

        let err = manipulator.set_component_tool_on_off("joint1", true).unwrap_err();
        assert_eq!(err, ManipulatorError::type_mismatch("joint1", "tool"));

        manipulator.set_component_tool_on_off("tool", true).unwrap();
        manipulator.set_component_tool_value("tool", 0.01).unwrap();
        assert!(manipulator.component_tool_on_off("tool").unwrap());
        assert_eq!(manipulator.component_tool_value("tool").unwrap(), 0.01);
    }

    #[test]
    fn state_setters_check_dimension() {
        let mut manipulator = two_link_arm();

        let err = manipulator
            .set_component_velocity_to_world("joint1", &[1.0, 2.0, 3.0])
            .unwrap_err();
        assert_eq!(
            err,
            ManipulatorError::dimension_mismatch("component velocity", 6, 3)
        );
        assert_eq!(
            manipulator.component_velocity_to_world("joint1").unwrap(),
            &DVector::<f64>::zeros(6)
        );

        manipulator
            .set_component_acceleration_to_world("joint1", &[0.0, 0.0, 9.81, 0.0, 0.0, 0.0])
            .unwrap();
        assert_eq!(
            manipulator.component_acceleration_to_world("joint1").unwrap()[2],
            9.81
        );

        assert!(manipulator.set_world_velocity(&[0.0; 6]).is_err());
        manipulator.set_world_velocity(&[0.1, 0.0, 0.0]).unwrap();
        assert_eq!(manipulator.world_velocity()[0], 0.1);

        let err = manipulator
            .set_component_state_to_world("joint1", State::zeros(WORLD_STATE_DIM))
            .unwrap_err();
        assert!(matches!(err, ManipulatorError::DimensionMismatch { .. }));
    }

    #[test]
    fn set_component_replaces_existing_only() {
        let mut manipulator = two_link_arm();
        let mut replacement = manipulator.component("joint2").unwrap().clone();
        replacement.joint.angle = 0.7;

        manipulator.set_component("joint2", replacement.clone()).unwrap();
        assert_eq!(manipulator.component_joint_angle("joint2").unwrap(), 0.7);

        let err = manipulator.set_component("joint3", replacement).unwrap_err();
        assert_eq!(err, ManipulatorError::unknown_name("joint3"));
        assert_eq!(manipulator.component_size(), 3);
    }

    #[test]
    fn set_component_rejects_joint_and_tool_together() {
        let mut manipulator = two_link_arm();
        let mut replacement = manipulator.component("joint1").unwrap().clone();
        replacement.tool.id = Some(9);

        let err = manipulator.set_component("joint1", replacement).unwrap_err();
        assert!(matches!(err, ManipulatorError::TypeMismatch { .. }));
        assert!(!manipulator.component("joint1").unwrap().is_tool());
        assert_eq!(manipulator.dof(), 2);
    }

    #[test]
    fn set_component_keeps_tree_links() {
        let mut manipulator = two_link_arm();
        let mut moved = manipulator.component("joint2").unwrap().clone();
        moved.parent = "nowhere".to_string();
        let err = manipulator.set_component("joint2", moved).unwrap_err();
        assert!(matches!(err, ManipulatorError::InvalidTree(_)));

        let mut rewired = manipulator.component("joint2").unwrap().clone();
        rewired.children.clear();
        let err = manipulator.set_component("joint2", rewired).unwrap_err();
        assert!(matches!(err, ManipulatorError::InvalidTree(_)));

        assert_eq!(manipulator.component_parent_name("joint2").unwrap(), "joint1");
        manipulator.check_tree().unwrap();
    }

    #[test]
    fn tool_typed_components_are_not_active_joints() {
        let mut manipulator = two_link_arm();
        let mut gripper = manipulator.component("tool").unwrap().clone();
        gripper.joint.id = Some(7);
        // Bypass the replacement guard to model a corrupted record.
        manipulator.components.insert("tool".to_string(), gripper);

        assert_eq!(manipulator.dof(), 2);
        assert_eq!(manipulator.all_active_joint_id(), vec![1, 2]);
        manipulator.set_all_active_joint_angle(&[0.4, 0.5]).unwrap();
        assert_eq!(manipulator.component_joint_angle("tool").unwrap(), 0.0);
        assert!(manipulator.set_all_active_joint_angle(&[0.4, 0.5, 0.6]).is_err());
    }

    #[test]
    fn aggregates_follow_name_order() {
        let mut manipulator = two_link_arm();
        manipulator.set_all_active_joint_angle(&[0.1, 0.2]).unwrap();

        assert_eq!(manipulator.all_active_joint_angle(), vec![0.1, 0.2]);
        assert_eq!(manipulator.all_active_joint_id(), vec![1, 2]);
        assert_eq!(manipulator.all_joint_angle(), vec![0.1, 0.2]);
        assert_eq!(manipulator.component_joint_angle("joint2").unwrap(), 0.2);

        let err = manipulator.set_all_active_joint_angle(&[1.0]).unwrap_err();
        assert_eq!(
            err,
            ManipulatorError::dimension_mismatch("active joint angles", 2, 1)
        );
        assert_eq!(manipulator.all_active_joint_angle(), vec![0.1, 0.2]);
    }

    #[test]
    fn all_joint_angle_includes_passive_joints() {
        let mut manipulator = two_link_arm();
        manipulator
            .add_component("joint0", LinkDefinition::new("joint2"))
            .unwrap();
        manipulator.set_component_joint_angle("joint0", 0.3).unwrap();

        assert_eq!(manipulator.all_joint_angle(), vec![0.3, 0.0, 0.0]);
        assert_eq!(manipulator.all_active_joint_angle(), vec![0.0, 0.0]);
    }

    #[test]
    fn check_tree_detects_inconsistencies() {
        let mut manipulator = Manipulator::new();
        assert!(manipulator.check_tree().is_err());

        manipulator
            .add_world("world", "a", Vec3::ZERO, Mat3::IDENTITY)
            .unwrap();
        manipulator
            .add_component("a", LinkDefinition::new("world").with_child("b"))
            .unwrap();
        let err = manipulator.check_tree().unwrap_err();
        assert_eq!(
            err,
            ManipulatorError::invalid_tree("child 'b' of 'a' does not exist")
        );

        manipulator
            .add_component("b", LinkDefinition::new("missing"))
            .unwrap();
        assert!(matches!(
            manipulator.check_tree(),
            Err(ManipulatorError::InvalidTree(_))
        ));
    }

    #[test]
    fn check_tree_detects_cycles() {
        let mut manipulator = Manipulator::new();
        manipulator
            .add_world("world", "root", Vec3::ZERO, Mat3::IDENTITY)
            .unwrap();
        manipulator
            .add_component("root", LinkDefinition::new("world"))
            .unwrap();
        manipulator
            .add_component("x", LinkDefinition::new("y").with_child("y"))
            .unwrap();
        manipulator
            .add_component("y", LinkDefinition::new("x").with_child("x"))
            .unwrap();

        let err = manipulator.check_tree().unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn world_name_cannot_shadow_a_component() {
        let mut manipulator = Manipulator::new();
        manipulator
            .add_component("base", LinkDefinition::new("base").with_actuator(1, Vec3::Z, 1.0))
            .unwrap();

        let err = manipulator
            .add_world("base", "base", Vec3::ZERO, Mat3::IDENTITY)
            .unwrap_err();
        assert_eq!(err, ManipulatorError::duplicate_name("base"));
        assert_eq!(manipulator.world_name(), "");
        assert!(manipulator.check_tree().is_err());
    }

    #[test]
    fn check_tree_rejects_self_parent_and_world_named_component() {
        let mut manipulator = Manipulator::new();
        manipulator
            .add_world("world", "root", Vec3::ZERO, Mat3::IDENTITY)
            .unwrap();
        manipulator
            .add_component("root", LinkDefinition::new("world"))
            .unwrap();
        manipulator
            .add_component("loop", LinkDefinition::new("loop"))
            .unwrap();
        assert_eq!(
            manipulator.check_tree().unwrap_err(),
            ManipulatorError::invalid_tree("'loop' is its own parent")
        );

        // A deserialized record can carry a component named like the world.
        let mut shadowed = Manipulator::new();
        shadowed
            .add_world("world", "world", Vec3::ZERO, Mat3::IDENTITY)
            .unwrap();
        shadowed
            .components
            .insert("world".to_string(), manipulator.component("root").unwrap().clone());
        assert_eq!(
            shadowed.check_tree().unwrap_err(),
            ManipulatorError::invalid_tree("component 'world' shares the world's name")
        );
    }
}
