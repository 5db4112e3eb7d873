//! Spatial transform capability
//!
//! Every host object carries one. Scripts read and write it through
//! [`ScriptContext::get_component`](crate::ScriptContext::get_component).

/// Position, rotation (degrees, XYZ order) and scale of a host object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

impl Transform {
    pub fn from_position(position: [f32; 3]) -> Self {
        Self { position, ..Self::default() }
    }

    pub fn set_position(&mut self, position: [f32; 3]) {
        self.position = position;
    }

    pub fn set_rotation(&mut self, rotation: [f32; 3]) {
        self.rotation = rotation;
    }

    pub fn set_scale(&mut self, scale: [f32; 3]) {
        self.scale = scale;
    }

    /// Move along `direction` by `distance`
    pub fn translate(&mut self, direction: [f32; 3], distance: f32) {
        for (axis, d) in self.position.iter_mut().zip(direction) {
            *axis += d * distance;
        }
    }

    /// Local forward axis in world space.
    ///
    /// Rest forward is (0, 0, -1); rotations are applied as Rx * Ry * Rz.
    pub fn forward(&self) -> [f32; 3] {
        let pitch = self.rotation[0].to_radians();
        let yaw = self.rotation[1].to_radians();
        [
            -yaw.sin(),
            pitch.sin() * yaw.cos(),
            -pitch.cos() * yaw.cos(),
        ]
    }
}
