//! The dice display area.
//!
//! Faces are addressed through [`FaceHandle`]s tagged with the tray
//! generation. Clearing the tray bumps the generation, so handles held by an
//! older roll silently stop painting.

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct FaceHandle {
    generation: u64,
    slot: usize,
}

/// What a face slot depicts.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FaceRole {
    Standard { faces: u8 },
    Tens,
    Ones,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Face {
    pub role: FaceRole,
    pub label: String,
    /// Rotation jitter in degrees.
    pub rotation: f32,
    pub rolling: bool,
    pub settled: bool,
}

impl Face {
    fn new(role: FaceRole) -> Self {
        Self {
            role,
            label: String::new(),
            rotation: 0.0,
            rolling: true,
            settled: false,
        }
    }
}

/// One on-screen die: a single face, or a tens/ones pair for `d100`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DieVisual {
    Single(FaceHandle),
    Percentile { tens: FaceHandle, ones: FaceHandle },
}

impl DieVisual {
    pub fn handles(&self) -> impl Iterator<Item = FaceHandle> {
        let (first, second) = match *self {
            DieVisual::Single(h) => (h, None),
            DieVisual::Percentile { tens, ones } => (tens, Some(ones)),
        };
        std::iter::once(first).chain(second)
    }
}

#[derive(Clone, Debug, Default)]
pub struct DiceTray {
    generation: u64,
    faces: Vec<Face>,
}

impl DiceTray {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every face; handles issued before this call become stale.
    pub fn clear(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.faces.clear();
    }

    pub fn spawn(&mut self, role: FaceRole) -> FaceHandle {
        self.faces.push(Face::new(role));
        FaceHandle {
            generation: self.generation,
            slot: self.faces.len() - 1,
        }
    }

    pub fn face(&self, handle: FaceHandle) -> Option<&Face> {
        if handle.generation != self.generation {
            return None;
        }
        self.faces.get(handle.slot)
    }

    fn face_mut(&mut self, handle: FaceHandle) -> Option<&mut Face> {
        if handle.generation != self.generation {
            return None;
        }
        self.faces.get_mut(handle.slot)
    }

    /// Paints a transient animation frame. Returns `false` for stale handles.
    pub fn paint(&mut self, handle: FaceHandle, label: impl Into<String>, rotation: f32) -> bool {
        match self.face_mut(handle) {
            Some(face) => {
                face.label = label.into();
                face.rotation = rotation;
                true
            }
            None => false,
        }
    }

    /// Paints the final value and stops the face rolling.
    pub fn settle(&mut self, handle: FaceHandle, label: impl Into<String>) -> bool {
        match self.face_mut(handle) {
            Some(face) => {
                face.label = label.into();
                face.rotation = 0.0;
                face.rolling = false;
                face.settled = true;
                true
            }
            None => false,
        }
    }

    /// Stops the rolling marker, keeping whatever value is shown.
    pub fn stop(&mut self, handle: FaceHandle) {
        if let Some(face) = self.face_mut(handle) {
            face.rolling = false;
        }
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn paint__updates_label_and_rotation() {
        let mut tray = DiceTray::new();
        let h = tray.spawn(FaceRole::Standard { faces: 6 });

        assert!(tray.paint(h, "4", 3.5));

        let face = tray.face(h).unwrap();
        assert_eq!(face.label, "4");
        assert_eq!(face.rotation, 3.5);
        assert!(face.rolling);
    }

    #[test]
    fn clear__invalidates_outstanding_handles() {
        // given
        let mut tray = DiceTray::new();
        let old = tray.spawn(FaceRole::Tens);

        // when
        tray.clear();
        let fresh = tray.spawn(FaceRole::Ones);

        // then
        assert!(!tray.paint(old, "90", 0.0));
        assert!(!tray.settle(old, "90"));
        assert_eq!(tray.face(fresh).unwrap().label, "");
        assert_eq!(tray.faces().len(), 1);
    }

    #[test]
    fn settle__stops_rolling_and_marks_result() {
        let mut tray = DiceTray::new();
        let h = tray.spawn(FaceRole::Ones);
        tray.paint(h, "3", -8.0);

        tray.settle(h, "7");

        let face = tray.face(h).unwrap();
        assert_eq!(face.label, "7");
        assert!(!face.rolling);
        assert!(face.settled);
        assert_eq!(face.rotation, 0.0);
    }

    #[test]
    fn die_visual__percentile_yields_tens_then_ones() {
        let mut tray = DiceTray::new();
        let tens = tray.spawn(FaceRole::Tens);
        let ones = tray.spawn(FaceRole::Ones);
        let visual = DieVisual::Percentile { tens, ones };
        assert_eq!(visual.handles().collect::<Vec<_>>(), vec![tens, ones]);
    }
}
