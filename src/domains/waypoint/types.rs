use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position2D {
    pub x: f64,
    pub y: f64,
}

/// Planar Euclidean distance between two positions.
pub fn distance(a: &Position2D, b: &Position2D) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    /// Rotation about the z axis only (roll = pitch = 0).
    pub fn from_yaw(yaw: f64) -> Self {
        let half = yaw * 0.5;
        Self { x: 0.0, y: 0.0, z: half.sin(), w: half.cos() }.normalize()
    }

    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }

    pub fn normalize(self) -> Self {
        let n = self.norm();
        if n == 0.0 {
            return Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };
        }
        Self { x: self.x / n, y: self.y / n, z: self.z / n, w: self.w / n }
    }

    /// Yaw component of the ZYX Euler decomposition, in (-pi, pi].
    pub fn yaw(&self) -> f64 {
        let siny_cosp = 2.0 * (self.w * self.z + self.x * self.y);
        let cosy_cosp = 1.0 - 2.0 * (self.y * self.y + self.z * self.z);
        siny_cosp.atan2(cosy_cosp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Position2D,
    pub orientation: Quaternion,
}

/// An immutable patrol target: planar position plus heading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pose: Pose,
}

impl Waypoint {
    pub fn new(x: f64, y: f64, yaw: f64) -> Self {
        Self {
            pose: Pose {
                position: Position2D { x, y },
                orientation: Quaternion::from_yaw(yaw),
            },
        }
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn position(&self) -> &Position2D {
        &self.pose.position
    }

    pub fn yaw(&self) -> f64 {
        self.pose.orientation.yaw()
    }
}

/// Waypoint as it appears in configuration and waypoint files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaypointEntry {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
}

impl From<WaypointEntry> for Waypoint {
    fn from(entry: WaypointEntry) -> Self {
        Waypoint::new(entry.x, entry.y, entry.yaw)
    }
}

/// Request sent to the navigation service for one dispatch attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationGoal {
    pub goal_id: Uuid,
    pub frame_id: String,
    pub waypoint_index: usize,
    pub pose: Pose,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn yaw_survives_quaternion_round_trip() {
        for yaw in [0.0, 0.977, 0.25, -0.57, 2.55, 1.69, -2.17, 2.47, PI - 1e-9, -PI + 1e-9] {
            let wp = Waypoint::new(1.0, 2.0, yaw);
            let q = wp.pose().orientation;
            assert!((q.norm() - 1.0).abs() < 1e-6, "norm {} for yaw {}", q.norm(), yaw);
            assert!((wp.yaw() - yaw).abs() < 1e-9, "yaw {} came back as {}", yaw, wp.yaw());
        }
    }

    #[test]
    fn construction_is_idempotent() {
        assert_eq!(Waypoint::new(20.5, 47.12, 0.977), Waypoint::new(20.5, 47.12, 0.977));
    }

    #[test]
    fn yaw_outside_principal_range_is_wrapped() {
        let wp = Waypoint::new(0.0, 0.0, 2.0 * PI + 0.5);
        assert!((wp.yaw() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn zero_quaternion_normalizes_to_identity() {
        let q = Quaternion { x: 0.0, y: 0.0, z: 0.0, w: 0.0 }.normalize();
        assert_eq!(q.w, 1.0);
    }

    #[test]
    fn distance_is_planar() {
        let a = Position2D { x: 0.0, y: 0.0 };
        let b = Position2D { x: 3.0, y: 4.0 };
        assert_eq!(distance(&a, &b), 5.0);
    }
}
