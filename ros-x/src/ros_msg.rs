use serde::{Deserialize, Serialize};

use crate::entity::{TypeHash, TypeInfo};

/// Trait for ROS messages that have associated type information.
///
/// Type descriptions are resolved once per concrete type, at compile time;
/// the node factories call `T::type_info()` when the entity descriptor is
/// assembled, never afterwards.
pub trait WithTypeInfo {
    fn type_info() -> TypeInfo;
}

/// Trait for ROS services that have associated type information.
pub trait ServiceTypeInfo {
    fn service_type_info() -> TypeInfo;
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, Copy)]
pub struct Vector3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl WithTypeInfo for Vector3D {
    fn type_info() -> TypeInfo {
        TypeInfo::new("geometry_msgs::msg::dds_::Vector3_", TypeHash::zero())
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, Copy)]
pub struct Twist {
    pub linear: Vector3D,
    pub angular: Vector3D,
}

impl WithTypeInfo for Twist {
    fn type_info() -> TypeInfo {
        TypeInfo::new("geometry_msgs::msg::dds_::Twist_", TypeHash::zero())
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, Copy)]
pub struct Empty {}

impl WithTypeInfo for Empty {
    fn type_info() -> TypeInfo {
        TypeInfo::new("std_msgs::msg::dds_::Empty_", TypeHash::zero())
    }
}
