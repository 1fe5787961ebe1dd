use crate::{Mat4, Vec2, Vec3, vec3};

/// Fixed world up axis used for strafing and the view matrix.
pub const WORLD_UP: Vec3 = Vec3::Y;

/// Pitch limit in degrees; keeps the view from flipping over the poles.
pub const PITCH_LIMIT_DEG: f32 = 89.0;

/// Movement keys held during a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Movement {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl Movement {
    #[inline]
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

/// Free-flying camera state. Angles are in degrees; yaw -90 looks down -Z.
///
/// Mouse input is accumulated into a pending delta by the input callback and
/// folded into yaw/pitch once per frame by [`CameraState::apply_mouse`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    pub front: Vec3,
    pub up: Vec3,
    pub yaw_deg: f32,
    pub pitch_deg: f32,
    /// Degrees per unit of mouse motion.
    pub sensitivity: f32,
    /// World units per second.
    pub speed: f32,
    pending_mouse: Vec2,
}

impl Default for CameraState {
    fn default() -> Self {
        Self::new(vec3(0.291234, 22.452366, 24.892710), -90.0, 0.0)
    }
}

impl CameraState {
    pub fn new(position: Vec3, yaw_deg: f32, pitch_deg: f32) -> Self {
        let pitch_deg = pitch_deg.clamp(-PITCH_LIMIT_DEG, PITCH_LIMIT_DEG);
        Self {
            position,
            front: front_from_angles(yaw_deg, pitch_deg),
            up: WORLD_UP,
            yaw_deg,
            pitch_deg,
            sensitivity: 0.1,
            speed: 25.0,
            pending_mouse: Vec2::ZERO,
        }
    }

    #[inline]
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Queue raw mouse motion (pixels, screen y pointing down).
    #[inline]
    pub fn push_mouse_delta(&mut self, dx: f32, dy: f32) {
        self.pending_mouse += Vec2::new(dx, dy);
    }

    #[inline]
    pub fn pending_mouse(&self) -> Vec2 {
        self.pending_mouse
    }

    /// Consume queued mouse motion into yaw/pitch and rebuild `front`.
    pub fn apply_mouse(&mut self) {
        let delta = std::mem::take(&mut self.pending_mouse);
        if delta == Vec2::ZERO {
            return;
        }
        self.yaw_deg += delta.x * self.sensitivity;
        self.pitch_deg = (self.pitch_deg - delta.y * self.sensitivity)
            .clamp(-PITCH_LIMIT_DEG, PITCH_LIMIT_DEG);
        self.front = front_from_angles(self.yaw_deg, self.pitch_deg);
    }

    /// Normalized strafe axis (`front x up`).
    #[inline]
    pub fn right(&self) -> Vec3 {
        self.front.cross(self.up).normalize()
    }

    /// Move along front/right/up by `speed * dt` per held key.
    pub fn integrate(&mut self, movement: Movement, dt: f32) {
        let step = self.speed * dt;
        if movement.forward {
            self.position += self.front * step;
        }
        if movement.backward {
            self.position -= self.front * step;
        }
        if movement.left {
            self.position -= self.right() * step;
        }
        if movement.right {
            self.position += self.right() * step;
        }
        if movement.up {
            self.position += self.up * step;
        }
        if movement.down {
            self.position -= self.up * step;
        }
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }
}

/// Unit view direction for the given yaw/pitch in degrees.
pub fn front_from_angles(yaw_deg: f32, pitch_deg: f32) -> Vec3 {
    let (yaw, pitch) = (yaw_deg.to_radians(), pitch_deg.to_radians());
    vec3(
        yaw.cos() * pitch.cos(),
        pitch.sin(),
        yaw.sin() * pitch.cos(),
    )
    .normalize()
}

/// Perspective projection parameters (right-handed, depth in [0, 1]).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    pub fov_y_rad: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub aspect: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fov_y_rad: 45f32.to_radians(),
            z_near: 0.1,
            z_far: 100.0,
            aspect: 800.0 / 600.0,
        }
    }
}

impl Projection {
    #[inline]
    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_rad,
            self.aspect.max(1e-6),
            self.z_near,
            self.z_far,
        )
    }

    #[inline]
    pub fn with_aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }
}
