//! Camera, projection and orbit controls.
//!
//! - [`Camera`] is a position looking at a target, +Y up
//! - [`Projection`] is a perspective projection that follows the surface size
//! - [`OrbitController`] orbits, zooms and pans around the target with damping
//!   and keeps the camera above the ground plane
//! - [`Tween`] drives the intro flight once the scene is ready

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3};
use instant::Duration;
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const SAFE_EPS: f32 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>, T: Into<Point3<f32>>>(position: P, target: T) -> Self {
        Self {
            position: position.into(),
            target: target.into(),
        }
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, Vector3::unit_y())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Projection {
    aspect: f32,
    pub fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
    /// Inverse of `view_proj`, the sky pass uses it to reconstruct view rays.
    inv_view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: cgmath::Matrix4::identity().into(),
            inv_view_proj: cgmath::Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        use cgmath::SquareMatrix;
        self.view_position = camera.position.to_homogeneous().into();
        let view_proj = projection.calc_matrix() * camera.calc_matrix();
        self.view_proj = view_proj.into();
        self.inv_view_proj = view_proj
            .invert()
            .unwrap_or_else(cgmath::Matrix4::identity)
            .into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// `power3.inOut`.
pub fn ease_power3_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// A delayed, eased move between two points.
#[derive(Clone, Debug)]
pub struct Tween {
    from: Point3<f32>,
    to: Point3<f32>,
    delay: Duration,
    duration: Duration,
    elapsed: Duration,
}

impl Tween {
    pub fn new(from: Point3<f32>, to: Point3<f32>, delay: Duration, duration: Duration) -> Self {
        Self {
            from,
            to,
            delay,
            duration,
            elapsed: Duration::ZERO,
        }
    }

    /// The camera intro: from high above down to the default viewpoint.
    pub fn intro() -> Self {
        Self::new(
            Point3::new(42.0, 62.0, 74.0),
            Point3::new(20.0, 32.0, 50.0),
            Duration::from_secs(1),
            Duration::from_secs(2),
        )
    }

    pub fn advance(&mut self, dt: Duration) -> Point3<f32> {
        self.elapsed += dt;
        self.sample()
    }

    pub fn sample(&self) -> Point3<f32> {
        let running = self.elapsed.saturating_sub(self.delay).as_secs_f32();
        let t = if self.duration.is_zero() {
            1.0
        } else {
            running / self.duration.as_secs_f32()
        };
        let k = ease_power3_in_out(t);
        self.from + (self.to - self.from) * k
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.delay + self.duration
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Drag {
    None,
    Rotate,
    Pan,
}

/// Orbit controls around `Camera::target`.
///
/// Left drag orbits, right drag pans, the wheel zooms. Input accumulates into
/// deltas that are applied a fraction per frame and decay by the same
/// fraction, which gives the damped glide.
#[derive(Debug)]
pub struct OrbitController {
    pub damping_factor: f32,
    pub max_polar_angle: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    fovy: Rad<f32>,
    drag: Drag,
    cursor: Option<PhysicalPosition<f64>>,
    viewport_height: f32,
    delta_theta: f32,
    delta_phi: f32,
    zoom: f32,
    pan: Vector3<f32>,
}

impl OrbitController {
    pub fn new(fovy: Rad<f32>, viewport_height: u32) -> Self {
        Self {
            damping_factor: 0.05,
            max_polar_angle: FRAC_PI_2,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            fovy,
            drag: Drag::None,
            cursor: None,
            viewport_height: viewport_height.max(1) as f32,
            delta_theta: 0.0,
            delta_phi: 0.0,
            zoom: 1.0,
            pan: Vector3::new(0.0, 0.0, 0.0),
        }
    }

    pub fn resize(&mut self, height: u32) {
        self.viewport_height = height.max(1) as f32;
    }

    /// Returns true if the event was used.
    pub fn handle_window_events(&mut self, camera: &Camera, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                self.drag = match (state, button) {
                    (ElementState::Pressed, MouseButton::Left) => Drag::Rotate,
                    (ElementState::Pressed, MouseButton::Right) => Drag::Pan,
                    (ElementState::Released, _) => Drag::None,
                    _ => self.drag,
                };
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                let previous = self.cursor.replace(*position);
                if let Some(previous) = previous {
                    let dx = (position.x - previous.x) as f32;
                    let dy = (position.y - previous.y) as f32;
                    match self.drag {
                        Drag::Rotate => self.rotate(dx, dy),
                        Drag::Pan => self.pan(camera, dx, dy),
                        Drag::None => return false,
                    }
                    return true;
                }
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y, .. }) => *y as f32 / 50.0,
                };
                if scroll != 0.0 {
                    self.zoom *= 0.95f32.powf(scroll);
                }
                true
            }
            _ => false,
        }
    }

    fn rotate(&mut self, dx: f32, dy: f32) {
        self.delta_theta -= TAU * dx / self.viewport_height;
        self.delta_phi -= TAU * dy / self.viewport_height;
    }

    fn pan(&mut self, camera: &Camera, dx: f32, dy: f32) {
        let offset = camera.position - camera.target;
        let distance = offset.magnitude() * (self.fovy.0 / 2.0).tan();
        let forward = (-offset).normalize();
        let right = forward.cross(Vector3::unit_y()).normalize();
        let up = right.cross(forward);
        let left = -right * (2.0 * dx * distance / self.viewport_height);
        let up = up * (2.0 * dy * distance / self.viewport_height);
        self.pan += left + up;
    }

    /// Drops pending input, used while the intro flight owns the camera.
    pub fn reset(&mut self) {
        self.delta_theta = 0.0;
        self.delta_phi = 0.0;
        self.zoom = 1.0;
        self.pan = Vector3::new(0.0, 0.0, 0.0);
    }

    pub fn update(&mut self, camera: &mut Camera, _dt: Duration) {
        let offset = camera.position - camera.target;
        let mut radius = offset.magnitude();
        if radius == 0.0 {
            return;
        }
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();

        let damping = self.damping_factor;
        theta += self.delta_theta * damping;
        phi += self.delta_phi * damping;
        phi = phi.clamp(0.0, self.max_polar_angle).clamp(SAFE_EPS, PI - SAFE_EPS);

        radius = (radius * self.zoom).clamp(self.min_distance, self.max_distance);
        self.zoom = 1.0;

        camera.target += self.pan * damping;

        let sin_phi = phi.sin();
        let offset = Vector3::new(
            radius * sin_phi * theta.sin(),
            radius * phi.cos(),
            radius * sin_phi * theta.cos(),
        );
        camera.position = camera.target + offset;

        self.delta_theta *= 1.0 - damping;
        self.delta_phi *= 1.0 - damping;
        self.pan *= 1.0 - damping;
    }
}

#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controller: OrbitController,
    pub intro: Option<Tween>,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    /// Advances the intro flight or the orbit controls, never both.
    pub fn update(&mut self, dt: Duration) {
        match self.intro.as_mut() {
            Some(tween) => {
                self.camera.position = tween.advance(dt);
                self.controller.reset();
                if tween.is_finished() {
                    self.intro = None;
                }
            }
            None => self.controller.update(&mut self.camera, dt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_point(a: Point3<f32>, b: Point3<f32>) {
        assert!((a - b).magnitude() < 1e-4, "{a:?} != {b:?}");
    }

    #[test]
    fn easing_is_symmetric_and_bounded() {
        assert_eq!(ease_power3_in_out(0.0), 0.0);
        assert_eq!(ease_power3_in_out(0.5), 0.5);
        assert_eq!(ease_power3_in_out(1.0), 1.0);
        assert_eq!(ease_power3_in_out(2.0), 1.0);
        let a = ease_power3_in_out(0.2);
        let b = ease_power3_in_out(0.8);
        assert!((a + b - 1.0).abs() < 1e-6);
    }

    #[test]
    fn intro_waits_then_lands_on_the_viewpoint() {
        let mut tween = Tween::intro();
        assert_point(tween.advance(Duration::from_millis(900)), Point3::new(42.0, 62.0, 74.0));
        let halfway = tween.advance(Duration::from_millis(1100));
        assert_point(halfway, Point3::new(31.0, 47.0, 62.0));
        assert!(!tween.is_finished());
        assert_point(tween.advance(Duration::from_secs(1)), Point3::new(20.0, 32.0, 50.0));
        assert!(tween.is_finished());
    }

    #[test]
    fn orbit_never_goes_below_the_horizon() {
        let mut camera = Camera::new((20.0, 32.0, 50.0), (0.0, 8.0, -2.0));
        let mut controller = OrbitController::new(cgmath::Deg(40.0).into(), 600);
        // drag far downwards, i.e. try to look from below
        controller.rotate(0.0, -10_000.0);
        for _ in 0..200 {
            controller.update(&mut camera, Duration::from_millis(16));
        }
        assert!(camera.position.y >= camera.target.y - 1e-3);
    }

    #[test]
    fn damping_glides_to_a_stop() {
        let mut camera = Camera::new((20.0, 32.0, 50.0), (0.0, 8.0, -2.0));
        let mut controller = OrbitController::new(cgmath::Deg(40.0).into(), 600);
        controller.rotate(100.0, 0.0);
        controller.update(&mut camera, Duration::from_millis(16));
        let first = camera.position;
        for _ in 0..1000 {
            controller.update(&mut camera, Duration::from_millis(16));
        }
        let settled = camera.position;
        controller.update(&mut camera, Duration::from_millis(16));
        assert!((camera.position - settled).magnitude() < 1e-4);
        assert!((settled - first).magnitude() > 1e-2);
    }

    #[test]
    fn orbiting_keeps_the_distance() {
        let mut camera = Camera::new((20.0, 32.0, 50.0), (0.0, 8.0, -2.0));
        let distance = (camera.position - camera.target).magnitude();
        let mut controller = OrbitController::new(cgmath::Deg(40.0).into(), 600);
        controller.rotate(40.0, 10.0);
        for _ in 0..10 {
            controller.update(&mut camera, Duration::from_millis(16));
        }
        assert!(((camera.position - camera.target).magnitude() - distance).abs() < 1e-3);
    }
}
