use crate::camera::types::TransformMatrix;

/// Last transform published to the render pipeline.
///
/// Render thread only. Starts empty, so the first observation always
/// publishes.
#[derive(Debug, Default)]
pub struct TransformCache {
    published: Option<TransformMatrix>,
}

impl TransformCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `matrix` against the cached one. On any differing element the
    /// cache takes the new value and `true` is returned.
    pub fn observe(&mut self, matrix: &TransformMatrix) -> bool {
        let changed = match &self.published {
            Some(published) => published.differs_from(matrix),
            None => true,
        };
        if changed {
            self.published = Some(*matrix);
        }
        changed
    }

    /// Forget the cached value so the next observation publishes again.
    pub fn reset(&mut self) {
        self.published = None;
    }

    pub fn last_published(&self) -> Option<TransformMatrix> {
        self.published
    }
}
