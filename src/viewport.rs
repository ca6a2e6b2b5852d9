use anyhow::Result;

use crate::camera::{PerspectiveCamera, Screen, TrackballControls};
use crate::config::{CameraConfig, ViewerConfig};
use crate::scene::SceneGraph;

/// Something a frame can be drawn into.
pub trait FrameTarget {
    fn resize(&mut self, width: u32, height: u32);

    fn draw(&mut self, scene: &SceneGraph, camera: &PerspectiveCamera) -> Result<()>;
}

/// Camera, trackball and output size of the 3D view.
pub struct Viewport {
    pub camera: PerspectiveCamera,
    pub controls: TrackballControls,
    home: CameraConfig,
    size: (u32, u32),
}

impl Viewport {
    pub fn new(config: &ViewerConfig, width: u32, height: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let mut camera = PerspectiveCamera::new(&config.camera, 1.0);
        camera.set_aspect(width, height);
        let controls = TrackballControls::new(&camera, config.trackball, Screen::new(width, height));
        Self {
            camera,
            controls,
            home: config.camera.clone(),
            size: (width, height),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Advances the trackball and draws the visible scene.
    pub fn frame(&mut self, scene: &SceneGraph, target: &mut dyn FrameTarget) -> Result<()> {
        self.controls.update(&mut self.camera);
        target.draw(scene, &self.camera)
    }

    pub fn resize(&mut self, width: u32, height: u32, target: &mut dyn FrameTarget) {
        let (width, height) = (width.max(1), height.max(1));
        self.size = (width, height);
        self.camera.set_aspect(width, height);
        target.resize(width, height);
        self.controls.handle_resize(Screen::new(width, height));
    }

    /// Puts the camera back at its home pose looking at the home target.
    pub fn reset_view(&mut self) {
        self.controls.reset(&mut self.camera);
        self.camera.eye = self.home.home_position;
        self.camera.target = self.home.home_target;
    }
}
