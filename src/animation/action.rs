/// A clip that is playing, plus how long it has been playing.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveAnimation {
    /// Name of the clip inside the model's clip table
    pub clip_key: String,
    /// Milliseconds since the clip was pushed
    pub elapsed_ms: f32,
}

impl ActiveAnimation {
    #[must_use]
    pub fn new(clip_key: impl Into<String>) -> Self {
        Self {
            clip_key: clip_key.into(),
            elapsed_ms: 0.0,
        }
    }

    #[inline]
    pub fn advance(&mut self, delta_ms: f32) {
        self.elapsed_ms += delta_ms;
    }
}
