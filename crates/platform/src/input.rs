//! Held-key tracking for the six movement keys.

use corelib::camera::Movement;
use winit::keyboard::KeyCode;

#[derive(Clone, Copy, Debug, Default)]
pub struct KeyState {
    movement: Movement,
}

impl KeyState {
    /// Record a press/release. Returns `false` for keys that do not move the
    /// camera.
    pub fn set(&mut self, key: KeyCode, pressed: bool) -> bool {
        let slot = match key {
            KeyCode::KeyW => &mut self.movement.forward,
            KeyCode::KeyS => &mut self.movement.backward,
            KeyCode::KeyA => &mut self.movement.left,
            KeyCode::KeyD => &mut self.movement.right,
            KeyCode::Space => &mut self.movement.up,
            KeyCode::ShiftLeft => &mut self.movement.down,
            _ => return false,
        };
        *slot = pressed;
        true
    }

    /// Drop all held keys (focus lost: releases would never arrive).
    pub fn clear(&mut self) {
        self.movement = Movement::default();
    }

    #[inline]
    pub fn movement(&self) -> Movement {
        self.movement
    }
}
