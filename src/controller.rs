//! Surface lifecycle: configuration publication and the per-surface hub.
//!
//! Each embedded surface runs its own [`Engine`] instance; the hub owns them
//! keyed by surface id and tears one down when its view unmounts or its
//! configuration is re-published. Publication into a sandboxed view races the
//! view's startup, so it retries on a fixed cadence until the view reports
//! ready.

use std::collections::HashMap;
use std::sync::mpsc::Receiver;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::bridge::{Completion, SandboxSignaler};
use crate::config::EngineConfig;
use crate::engine::{Engine, EngineEvent};
use crate::error::{AtalhoError, Result};
use crate::session::DisarmReason;
use crate::surface::EditableSurface;

/// Cadence of configuration publication retries
pub const PUBLISH_RETRY_DELAY_MS: u64 = 1_000;

/// Default attempt budget: the initial publish plus one retry
pub const PUBLISH_MAX_ATTEMPTS: u32 = 2;

/// A sandboxed view that accepts a published engine configuration.
///
/// `publish` fails while the view is still starting up; the controller
/// retries rather than treating that as an error.
pub trait ConfigTarget {
    fn publish(&mut self, config: &EngineConfig) -> Result<()>;
}

/// Publish a configuration into a view, retrying until it is ready.
///
/// Attempts are spaced by `delay`; the last error is returned once the
/// attempt budget is exhausted.
pub fn publish_with_retry(
    target: &mut dyn ConfigTarget,
    config: &EngineConfig,
    attempts: u32,
    delay: Duration,
) -> Result<()> {
    let mut last_err = AtalhoError::SurfaceNotReady("no publish attempt made".to_string());
    for attempt in 1..=attempts {
        match target.publish(config) {
            Ok(()) => {
                info!(attempt, "Configuration published");
                return Ok(());
            }
            Err(e) => {
                debug!(attempt, error = %e, "Publish attempt failed, view not ready yet");
                last_err = e;
            }
        }
        if attempt < attempts {
            thread::sleep(delay);
        }
    }
    warn!(attempts, "Giving up on configuration publication");
    Err(last_err)
}

/// One engine and its event receiver, owned by the hub
struct SurfaceSlot {
    engine: Engine,
    events: Receiver<EngineEvent>,
}

/// Registry of running engines, one per embedded surface
#[derive(Default)]
pub struct SurfaceHub {
    slots: HashMap<String, SurfaceSlot>,
}

impl SurfaceHub {
    pub fn new() -> Self {
        SurfaceHub::default()
    }

    /// Start an engine for a newly mounted surface, replacing any previous
    /// instance under the same id.
    pub fn mount(&mut self, surface_id: impl Into<String>, config: EngineConfig, signaler: SandboxSignaler) {
        let surface_id = surface_id.into();
        let (engine, events) = Engine::new(config, signaler);
        if self
            .slots
            .insert(surface_id.clone(), SurfaceSlot { engine, events })
            .is_some()
        {
            debug!(surface_id = %surface_id, "Replaced running engine");
        }
        info!(surface_id = %surface_id, "Surface mounted");
    }

    /// Drop a surface's engine; its timers cancel with it.
    pub fn unmount(&mut self, surface_id: &str) {
        if self.slots.remove(surface_id).is_some() {
            info!(surface_id, "Surface unmounted");
        }
    }

    /// Replace every engine's configuration in place
    pub fn reconfigure_all(&mut self, config: &EngineConfig) {
        for (surface_id, slot) in &mut self.slots {
            slot.engine.reconfigure(config.clone());
            debug!(surface_id = %surface_id, "Engine reconfigured");
        }
    }

    pub fn engine_mut(&mut self, surface_id: &str) -> Option<&mut Engine> {
        self.slots.get_mut(surface_id).map(|slot| &mut slot.engine)
    }

    /// Drain pending timer events into the surface's engine
    pub fn pump(&mut self, surface_id: &str, surface: &mut dyn EditableSurface) {
        if let Some(slot) = self.slots.get_mut(surface_id) {
            while let Ok(event) = slot.events.try_recv() {
                slot.engine.handle_event(surface, event);
            }
        }
    }

    /// Forward a host completion to the owning engine
    pub fn deliver_completion(
        &mut self,
        surface_id: &str,
        surface: &mut dyn EditableSurface,
        completion: Completion,
    ) {
        if let Some(slot) = self.slots.get_mut(surface_id) {
            slot.engine.handle_event(
                surface,
                EngineEvent::InsertionComplete {
                    id: completion.id,
                    ok: completion.ok,
                },
            );
        } else {
            warn!(surface_id, id = completion.id, "Completion for unknown surface");
        }
    }

    /// Tear all engines down, e.g. on shell shutdown
    pub fn shutdown(&mut self) {
        for slot in self.slots.values_mut() {
            slot.engine.teardown(DisarmReason::Reconfigured);
        }
        self.slots.clear();
    }
}
