//! Six degree-of-freedom pose shared between the host and the bridge.
//!
//! Positions are metres in a Z-up frame; angles are radians. A pose is a
//! plain value: it carries no frame or timestamp and is copied freely.

use std::fmt;
use std::str::FromStr;

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

use crate::error::PoseParseError;

/// Position (`x`, `y`, `z`) and orientation (`pitch`, `roll`, `yaw`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Metres east.
    pub x: f64,
    /// Metres north.
    pub y: f64,
    /// Metres up.
    pub z: f64,
    /// Radians, nose up.
    pub pitch: f64,
    /// Radians about the forward axis.
    pub roll: f64,
    /// Radians about +z, zero facing +x.
    pub yaw: f64,
}

impl Pose {
    /// Builds a pose from its six components.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64, pitch: f64, roll: f64, yaw: f64) -> Self {
        Self {
            x,
            y,
            z,
            pitch,
            roll,
            yaw,
        }
    }

    /// Pose at `position` with zero pitch and roll and the given yaw.
    #[must_use]
    pub const fn from_position_yaw(position: DVec3, yaw: f64) -> Self {
        Self::new(position.x, position.y, position.z, 0.0, 0.0, yaw)
    }

    /// Translation part.
    #[must_use]
    pub const fn position(&self) -> DVec3 {
        DVec3::new(self.x, self.y, self.z)
    }

    /// Ground-plane projection of the position.
    #[must_use]
    pub const fn planar(&self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }

    /// Replaces the position while keeping the orientation.
    pub fn set_position(&mut self, position: DVec3) {
        self.x = position.x;
        self.y = position.y;
        self.z = position.z;
    }

    /// Returns `true` when every component is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        [self.x, self.y, self.z, self.pitch, self.roll, self.yaw]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Parses `"x y z pitch roll yaw"` into `self`.
    ///
    /// On failure `self` is left exactly as it was.
    ///
    /// # Errors
    /// Returns [`PoseParseError`] if the text does not hold exactly six
    /// finite numbers.
    ///
    /// # Examples
    ///
    /// ```
    /// use crowd_bridge::Pose;
    /// let mut pose = Pose::default();
    /// assert!(pose.parse_into("1 2 3 0 0").is_err());
    /// assert_eq!(pose, Pose::default());
    /// pose.parse_into("1 2 3 0 0 1.5708").expect("six tokens");
    /// assert_eq!(pose.yaw, 1.5708);
    /// ```
    pub fn parse_into(&mut self, text: &str) -> Result<(), PoseParseError> {
        *self = text.parse()?;
        Ok(())
    }

    /// Expresses an engine pose in a host model's frame.
    ///
    /// Every component of `offset` is added, so a yaw offset turns the model
    /// relative to the engine heading.
    #[must_use]
    pub fn offset_by(&self, offset: &Self) -> Self {
        Self::new(
            self.x + offset.x,
            self.y + offset.y,
            self.z + offset.z,
            self.pitch + offset.pitch,
            self.roll + offset.roll,
            self.yaw + offset.yaw,
        )
    }
}

impl FromStr for Pose {
    type Err = PoseParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let [x, y, z, pitch, roll, yaw] = tokens.as_slice() else {
            return Err(PoseParseError::TokenCount {
                found: tokens.len(),
            });
        };

        let mut values = [0.0_f64; 6];
        for (position, (slot, token)) in values
            .iter_mut()
            .zip([x, y, z, pitch, roll, yaw])
            .enumerate()
        {
            *slot = token
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| PoseParseError::InvalidToken {
                    position,
                    token: (*token).to_owned(),
                })?;
        }

        let [x, y, z, pitch, roll, yaw] = values;
        Ok(Self::new(x, y, z, pitch, roll, yaw))
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.x, self.y, self.z, self.pitch, self.roll, self.yaw
        )
    }
}
