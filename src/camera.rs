//! Perspective camera and the trackball rig that orbits it around a target.

use glam::{Mat4, Quat, Vec2, Vec3};

use crate::config::{CameraConfig, TrackballSettings};

pub struct PerspectiveCamera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub aspect: f32,
    /// Vertical field of view in radians.
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl PerspectiveCamera {
    pub fn new(config: &CameraConfig, aspect: f32) -> Self {
        Self {
            eye: config.home_position,
            target: config.home_target,
            up: Vec3::Y,
            aspect,
            fovy: config.fov_degrees.to_radians(),
            znear: config.near,
            zfar: config.far,
        }
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// Projection with a `[0, 1]` depth range.
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy, self.aspect, self.znear, self.zfar)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }

    pub fn distance(&self) -> f32 {
        self.eye.distance(self.target)
    }
}

/// Interaction started by a pointer button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Rotate,
    Zoom,
    Pan,
}

/// Scroll amount in the unit reported by the platform; positive values
/// scroll down (away from the content), which zooms out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WheelDelta {
    Pixels(f32),
    Lines(f32),
    Pages(f32),
}

/// Area of the window covered by the viewport, in CSS or logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Screen {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Screen {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width: width.max(1) as f32,
            height: height.max(1) as f32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pose {
    eye: Vec3,
    target: Vec3,
    up: Vec3,
}

/// Trackball camera controls.
///
/// Dragging rotates the camera freely around the target without an
/// enforced up direction, zooming moves along the view direction and
/// panning shifts camera and target together. With `static_moving` off,
/// motion continues after release and decays by the damping factor.
pub struct TrackballControls {
    pub settings: TrackballSettings,
    screen: Screen,
    drag: Option<DragMode>,
    home: Pose,
    move_prev: Vec2,
    move_curr: Vec2,
    last_axis: Vec3,
    last_angle: f32,
    zoom_start: Vec2,
    zoom_end: Vec2,
    pan_start: Vec2,
    pan_end: Vec2,
}

impl TrackballControls {
    /// Captures the camera's current pose as the home pose used by [`reset`].
    ///
    /// [`reset`]: TrackballControls::reset
    pub fn new(camera: &PerspectiveCamera, settings: TrackballSettings, screen: Screen) -> Self {
        Self {
            settings,
            screen,
            drag: None,
            home: Pose {
                eye: camera.eye,
                target: camera.target,
                up: camera.up,
            },
            move_prev: Vec2::ZERO,
            move_curr: Vec2::ZERO,
            last_axis: Vec3::ZERO,
            last_angle: 0.0,
            zoom_start: Vec2::ZERO,
            zoom_end: Vec2::ZERO,
            pan_start: Vec2::ZERO,
            pan_end: Vec2::ZERO,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn handle_resize(&mut self, screen: Screen) {
        self.screen = screen;
    }

    pub fn drag_mode(&self) -> Option<DragMode> {
        self.drag
    }

    /// Pointer position normalized to `[0, 1]` over the screen.
    pub fn mouse_on_screen(&self, x: f32, y: f32) -> Vec2 {
        Vec2::new(
            (x - self.screen.left) / self.screen.width,
            (y - self.screen.top) / self.screen.height,
        )
    }

    /// Pointer position relative to the screen center, scaled by half the width.
    pub fn mouse_on_circle(&self, x: f32, y: f32) -> Vec2 {
        let Screen {
            left,
            top,
            width,
            height,
        } = self.screen;
        Vec2::new(
            (x - width * 0.5 - left) / (width * 0.5),
            (height + 2.0 * (top - y)) / width,
        )
    }

    pub fn pointer_down(&mut self, mode: DragMode, x: f32, y: f32) {
        let enabled = match mode {
            DragMode::Rotate => !self.settings.no_rotate,
            DragMode::Zoom => !self.settings.no_zoom,
            DragMode::Pan => !self.settings.no_pan,
        };
        if !enabled {
            return;
        }
        match mode {
            DragMode::Rotate => {
                self.move_curr = self.mouse_on_circle(x, y);
                self.move_prev = self.move_curr;
            }
            DragMode::Zoom => {
                self.zoom_start = self.mouse_on_screen(x, y);
                self.zoom_end = self.zoom_start;
            }
            DragMode::Pan => {
                self.pan_start = self.mouse_on_screen(x, y);
                self.pan_end = self.pan_start;
            }
        }
        self.drag = Some(mode);
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        match self.drag {
            Some(DragMode::Rotate) => {
                self.move_prev = self.move_curr;
                self.move_curr = self.mouse_on_circle(x, y);
            }
            Some(DragMode::Zoom) => self.zoom_end = self.mouse_on_screen(x, y),
            Some(DragMode::Pan) => self.pan_end = self.mouse_on_screen(x, y),
            None => {}
        }
    }

    pub fn pointer_up(&mut self) {
        self.drag = None;
    }

    pub fn wheel(&mut self, delta: WheelDelta) {
        if self.settings.no_zoom {
            return;
        }
        self.zoom_start.y -= match delta {
            WheelDelta::Pages(y) => y * 0.025,
            WheelDelta::Lines(y) => y * 0.01,
            WheelDelta::Pixels(y) => y * 0.000_25,
        };
    }

    /// Applies pending rotation, zoom and pan to the camera.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) {
        let mut eye = camera.eye - camera.target;
        if !self.settings.no_rotate {
            self.rotate(&mut eye, &mut camera.up);
        }
        if !self.settings.no_zoom {
            self.zoom(&mut eye);
        }
        if !self.settings.no_pan {
            self.pan(eye, camera);
        }

        let distance = eye.length();
        if distance > self.settings.max_distance {
            eye = eye.normalize() * self.settings.max_distance;
        } else if distance < self.settings.min_distance {
            eye = eye.normalize_or_zero() * self.settings.min_distance;
        }
        camera.eye = camera.target + eye;
    }

    /// Restores the home pose and drops any motion in progress.
    pub fn reset(&mut self, camera: &mut PerspectiveCamera) {
        self.drag = None;
        camera.eye = self.home.eye;
        camera.target = self.home.target;
        camera.up = self.home.up;
        self.move_prev = self.move_curr;
        self.last_angle = 0.0;
        self.zoom_start = self.zoom_end;
        self.pan_start = self.pan_end;
    }

    fn rotate(&mut self, eye: &mut Vec3, up: &mut Vec3) {
        let delta = self.move_curr - self.move_prev;
        let angle = delta.length();
        if angle > 0.0 {
            let eye_direction = eye.normalize_or_zero();
            let up_direction = up.normalize_or_zero();
            let sideways = up_direction.cross(eye_direction).normalize_or_zero();
            let move_direction = up_direction * delta.y + sideways * delta.x;
            let axis = move_direction.cross(*eye).normalize_or_zero();
            let angle = angle * self.settings.rotate_speed;
            let rotation = Quat::from_axis_angle(axis, angle);
            *eye = rotation * *eye;
            *up = rotation * *up;
            self.last_axis = axis;
            self.last_angle = angle;
        } else if !self.settings.static_moving && self.last_angle != 0.0 {
            self.last_angle *= (1.0 - self.settings.dynamic_damping_factor).sqrt();
            let rotation = Quat::from_axis_angle(self.last_axis, self.last_angle);
            *eye = rotation * *eye;
            *up = rotation * *up;
        }
        self.move_prev = self.move_curr;
    }

    fn zoom(&mut self, eye: &mut Vec3) {
        let factor = 1.0 + (self.zoom_end.y - self.zoom_start.y) * self.settings.zoom_speed;
        if factor != 1.0 && factor > 0.0 {
            *eye *= factor;
        }
        if self.settings.static_moving {
            self.zoom_start = self.zoom_end;
        } else {
            self.zoom_start.y +=
                (self.zoom_end.y - self.zoom_start.y) * self.settings.dynamic_damping_factor;
        }
    }

    fn pan(&mut self, eye: Vec3, camera: &mut PerspectiveCamera) {
        let change = self.pan_end - self.pan_start;
        if change.length_squared() == 0.0 {
            return;
        }
        let change = change * eye.length() * self.settings.pan_speed;
        let offset = eye.cross(camera.up).normalize_or_zero() * change.x
            + camera.up.normalize_or_zero() * change.y;
        camera.eye += offset;
        camera.target += offset;
        if self.settings.static_moving {
            self.pan_start = self.pan_end;
        } else {
            self.pan_start += (self.pan_end - self.pan_start) * self.settings.dynamic_damping_factor;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rig() -> (PerspectiveCamera, TrackballControls) {
        let camera = PerspectiveCamera::new(&CameraConfig::default(), 800.0 / 600.0);
        let controls = TrackballControls::new(
            &camera,
            TrackballSettings::default(),
            Screen::new(800, 600),
        );
        (camera, controls)
    }

    #[test]
    fn camera_starts_at_home() {
        let (camera, _) = rig();
        assert_eq!(camera.eye, Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(camera.target, Vec3::ZERO);
        assert!((camera.fovy - 75f32.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn rotation_keeps_distance_to_target() {
        let (mut camera, mut controls) = rig();
        controls.pointer_down(DragMode::Rotate, 400.0, 300.0);
        controls.pointer_move(520.0, 260.0);
        controls.update(&mut camera);

        assert!(!camera.eye.abs_diff_eq(Vec3::new(0.0, 0.0, 5.0), 1e-3));
        assert!((camera.distance() - 5.0).abs() < 1e-4);
        assert!((camera.up.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn static_rotation_stops_with_the_pointer() {
        let (mut camera, mut controls) = rig();
        controls.pointer_down(DragMode::Rotate, 400.0, 300.0);
        controls.pointer_move(450.0, 300.0);
        controls.update(&mut camera);
        let eye = camera.eye;
        controls.update(&mut camera);
        assert_eq!(camera.eye, eye);
    }

    #[test]
    fn damped_rotation_keeps_drifting() {
        let (mut camera, mut controls) = rig();
        controls.settings.static_moving = false;
        controls.pointer_down(DragMode::Rotate, 400.0, 300.0);
        controls.pointer_move(450.0, 300.0);
        controls.update(&mut camera);
        controls.pointer_up();
        let eye = camera.eye;
        controls.update(&mut camera);
        assert!(!camera.eye.abs_diff_eq(eye, 1e-6));
    }

    #[test]
    fn wheel_down_zooms_out() {
        let (mut camera, mut controls) = rig();
        controls.wheel(WheelDelta::Pixels(400.0));
        controls.update(&mut camera);
        assert!((camera.distance() - 5.6).abs() < 1e-4);

        // consumed in one step with static moving
        controls.update(&mut camera);
        assert!((camera.distance() - 5.6).abs() < 1e-4);
    }

    #[test]
    fn zoom_respects_distance_limits() {
        let (mut camera, mut controls) = rig();
        controls.settings.max_distance = 5.3;
        controls.wheel(WheelDelta::Pixels(400.0));
        controls.update(&mut camera);
        assert!((camera.distance() - 5.3).abs() < 1e-4);

        controls.settings.min_distance = 5.1;
        controls.wheel(WheelDelta::Pages(-20.0));
        controls.update(&mut camera);
        assert!((camera.distance() - 5.1).abs() < 1e-4);
    }

    #[test]
    fn no_zoom_ignores_wheel() {
        let (mut camera, mut controls) = rig();
        controls.settings.no_zoom = true;
        controls.wheel(WheelDelta::Lines(-3.0));
        controls.update(&mut camera);
        assert!((camera.distance() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn pan_moves_eye_and_target_together() {
        let (mut camera, mut controls) = rig();
        controls.pointer_down(DragMode::Pan, 400.0, 300.0);
        controls.pointer_move(480.0, 300.0);
        controls.update(&mut camera);

        assert!(camera.target.x.abs() > 0.1);
        assert!((camera.eye - camera.target).abs_diff_eq(Vec3::new(0.0, 0.0, 5.0), 1e-4));
    }

    #[test]
    fn reset_restores_home_pose() {
        let (mut camera, mut controls) = rig();
        controls.pointer_down(DragMode::Rotate, 100.0, 100.0);
        controls.pointer_move(700.0, 500.0);
        controls.update(&mut camera);
        controls.wheel(WheelDelta::Lines(5.0));

        controls.reset(&mut camera);
        assert_eq!(camera.eye, Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(camera.target, Vec3::ZERO);
        assert_eq!(camera.up, Vec3::Y);
        assert_eq!(controls.drag_mode(), None);

        // pending wheel input was dropped
        controls.update(&mut camera);
        assert_eq!(camera.eye, Vec3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn resize_rescales_pointer_mapping() {
        let (_, mut controls) = rig();
        assert_eq!(controls.mouse_on_screen(400.0, 300.0), Vec2::new(0.5, 0.5));
        controls.handle_resize(Screen::new(1600, 1200));
        assert_eq!(controls.mouse_on_screen(400.0, 300.0), Vec2::new(0.25, 0.25));
        assert_eq!(controls.mouse_on_circle(800.0, 600.0), Vec2::ZERO);
    }

    #[test]
    fn aspect_ignores_zero_height() {
        let (mut camera, _) = rig();
        camera.set_aspect(640, 0);
        assert_eq!(camera.aspect, 640.0);
    }
}
