use glam::Vec3;
use serde::Deserialize;

/// Tunables shared by the pool builder, the viewport and the renderer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Clear color of the viewport, `0xRRGGBB` in sRGB.
    pub background: u32,
    /// Color of the material shared by every procedural shape.
    pub shape_color: u32,
    /// Color of the box substituted for assets that fail to load.
    pub fallback_color: u32,
    /// Largest dimension of a loaded asset after normalization, in world units.
    pub target_size: f32,
    pub camera: CameraConfig,
    pub trackball: TrackballSettings,
    pub lights: LightConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            background: 0x6d6d6d,
            shape_color: 0x007bff,
            fallback_color: 0xff0000,
            target_size: 3.0,
            camera: CameraConfig::default(),
            trackball: TrackballSettings::default(),
            lights: LightConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Pose forced on every selection.
    pub home_position: Vec3,
    pub home_target: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            home_position: Vec3::new(0.0, 0.0, 5.0),
            home_target: Vec3::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackballSettings {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub no_rotate: bool,
    pub no_zoom: bool,
    pub no_pan: bool,
    /// When set, motion stops as soon as the pointer stops.
    pub static_moving: bool,
    pub dynamic_damping_factor: f32,
    /// Closest the camera may get to its target.
    pub min_distance: f32,
    /// Farthest the camera may get from its target.
    pub max_distance: f32,
}

impl Default for TrackballSettings {
    fn default() -> Self {
        Self {
            rotate_speed: 4.0,
            zoom_speed: 1.2,
            pan_speed: 0.8,
            no_rotate: false,
            no_zoom: false,
            no_pan: false,
            static_moving: true,
            dynamic_damping_factor: 0.3,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub ambient_color: u32,
    pub ambient_intensity: f32,
    pub directional_color: u32,
    pub directional_intensity: f32,
    pub directional_position: Vec3,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            ambient_color: 0xffffff,
            ambient_intensity: 0.6,
            directional_color: 0xffffff,
            directional_intensity: 1.0,
            directional_position: Vec3::new(5.0, 10.0, 7.5),
        }
    }
}

/// Converts a `0xRRGGBB` sRGB color into linear RGB.
pub fn linear_rgb(hex: u32) -> Vec3 {
    let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
    Vec3::new(channel(16), channel(8), channel(0))
}

fn srgb_to_linear(value: f32) -> f32 {
    if value <= 0.04045 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}
