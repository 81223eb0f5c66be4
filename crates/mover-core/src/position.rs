use serde::{Deserialize, Serialize};

/// A point in the plane, owned by one slot of the position table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub x: f32,
    pub y: f32,
}

impl PositionRecord {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Shift the record by a relative offset.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.x += dx;
        self.y += dy;
    }

    /// Overwrite both coordinates.
    pub fn set(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
    }
}
