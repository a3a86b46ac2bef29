/// Particle system handle as seen by render targets.
///
/// Only the fields that decide whether a system is drawn into a target are
/// modelled: its start state and its emitter entity.

use super::drawable::EntityKey;

#[derive(Debug, Clone)]
pub struct ParticleSystem {
    name: String,
    emitter: Option<EntityKey>,
    started: bool,
}

impl ParticleSystem {
    /// New, not yet started system. `emitter` is None for point emitters.
    pub fn new(name: impl Into<String>, emitter: Option<EntityKey>) -> Self {
        Self {
            name: name.into(),
            emitter,
            started: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Emitting entity, None when the system is emitted from a point
    pub fn emitter(&self) -> Option<EntityKey> {
        self.emitter
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn start(&mut self) {
        self.started = true;
    }

    pub fn stop(&mut self) {
        self.started = false;
    }
}
