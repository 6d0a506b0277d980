//! Camera and light parameters for the frame uniforms
//!
//! The raymarcher reconstructs view rays from the camera-to-world matrix and
//! the inverse projection, so both are computed here once per frame and
//! handed to the binding layer explicitly.

use glam::{Mat4, Quat, Vec3};

use crate::gpu_types::FrameUniforms;

/// Perspective camera described by position and yaw/pitch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameCamera {
    /// Camera position
    pub eye: Vec3,
    /// Up vector
    pub up: Vec3,
    /// Render target aspect ratio
    pub aspect: f32,
    /// Field of view in radians
    pub fovy: f32,
    /// Near clipping plane distance
    pub znear: f32,
    /// Far clipping plane distance
    pub zfar: f32,
    /// Horizontal rotation of the camera
    pub yaw: f32,
    /// Vertical rotation of the camera
    pub pitch: f32,
}

impl FrameCamera {
    /// Camera at `eye` looking towards `target`.
    pub fn looking_at(eye: Vec3, target: Vec3, width: u32, height: u32) -> Self {
        let forward = (target - eye).normalize_or_zero();
        // yaw/pitch are measured from -Z, matching `forward()`.
        let yaw = (-forward.x).atan2(-forward.z);
        let pitch = forward.y.clamp(-1.0, 1.0).asin();

        Self {
            eye,
            up: Vec3::Y,
            aspect: width as f32 / height.max(1) as f32,
            fovy: 45.0f32.to_radians(),
            znear: 0.1,
            zfar: 100.0,
            yaw,
            pitch,
        }
    }

    /// Update aspect ratio when the render target is resized
    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    fn orientation(&self) -> Quat {
        Quat::from_axis_angle(Vec3::Y, self.yaw) * Quat::from_axis_angle(Vec3::X, self.pitch)
    }

    /// Get the camera's forward direction vector
    pub fn forward(&self) -> Vec3 {
        self.orientation() * Vec3::NEG_Z
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.eye + self.forward(), self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy, self.aspect, self.znear, self.zfar)
    }

    pub fn camera_to_world(&self) -> Mat4 {
        self.view_matrix().inverse()
    }
}

/// Main directional light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Direction the light travels in
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

impl Default for DirectionalLight {
    /// Used when the scene has no light: shining along +Z, white.
    fn default() -> Self {
        Self {
            direction: Vec3::Z,
            color: Vec3::ONE,
            intensity: 1.0,
        }
    }
}

impl FrameUniforms {
    /// Builds the uniforms for one frame. A missing light falls back to
    /// [`DirectionalLight::default`].
    pub fn new(camera: &FrameCamera, light: Option<&DirectionalLight>) -> Self {
        let light = light.copied().unwrap_or_default();
        let direction = light.direction.try_normalize().unwrap_or(Vec3::Z);
        let color = light.color * light.intensity;
        Self {
            camera_to_world: camera.camera_to_world().to_cols_array_2d(),
            camera_inverse_projection: camera.projection_matrix().inverse().to_cols_array_2d(),
            camera_position: camera.eye.extend(1.0).to_array(),
            light_direction: direction.extend(0.0).to_array(),
            light_color: color.extend(1.0).to_array(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looking_at_faces_target() {
        let camera = FrameCamera::looking_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, 800, 600);
        assert!((camera.forward() - Vec3::NEG_Z).length() < 1e-5);

        let camera = FrameCamera::looking_at(Vec3::new(5.0, 3.0, 8.0), Vec3::new(0.0, 1.0, 0.0), 800, 600);
        let expected = (Vec3::new(0.0, 1.0, 0.0) - Vec3::new(5.0, 3.0, 8.0)).normalize();
        assert!((camera.forward() - expected).length() < 1e-4);
    }

    #[test]
    fn camera_to_world_maps_origin_to_eye() {
        let camera = FrameCamera::looking_at(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, 1, 1);
        let origin = camera.camera_to_world().transform_point3(Vec3::ZERO);
        assert!((origin - camera.eye).length() < 1e-4);
    }

    #[test]
    fn missing_light_falls_back_to_forward_white() {
        let camera = FrameCamera::looking_at(Vec3::Z, Vec3::ZERO, 1, 1);
        let uniforms = FrameUniforms::new(&camera, None);
        assert_eq!(uniforms.light_direction, [0.0, 0.0, 1.0, 0.0]);
        assert_eq!(uniforms.light_color, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn light_color_is_premultiplied() {
        let camera = FrameCamera::looking_at(Vec3::Z, Vec3::ZERO, 1, 1);
        let light = DirectionalLight {
            direction: Vec3::new(0.0, -2.0, 0.0),
            color: Vec3::new(1.0, 0.5, 0.25),
            intensity: 2.0,
        };
        let uniforms = FrameUniforms::new(&camera, Some(&light));
        assert_eq!(uniforms.light_direction, [0.0, -1.0, 0.0, 0.0]);
        assert_eq!(uniforms.light_color, [2.0, 1.0, 0.5, 1.0]);
    }
}
