//! Restriction prop bookkeeping.
//!
//! Every prop the plugin creates is tracked here until the next clear. Model
//! and scale are applied one host tick after creation, once the entity's
//! scene node exists.

use std::collections::{BTreeSet, VecDeque};

use bevy::math::Vec3;

use crate::{
    config::Angles,
    host::{Host, PropHandle, PropSpawnRequest},
};

/// Post-creation mutation waiting for the next tick.
#[derive(Debug, Clone, PartialEq)]
pub enum DeferredPropTask {
    SetModel { prop: PropHandle, model: String },
    SetScale { prop: PropHandle, scale: f32 },
}

impl DeferredPropTask {
    pub fn prop(&self) -> PropHandle {
        match self {
            DeferredPropTask::SetModel { prop, .. } | DeferredPropTask::SetScale { prop, .. } => {
                *prop
            }
        }
    }
}

/// Outcome of [`PropSpawner::clear_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearSummary {
    pub removed: usize,
    pub stale: usize,
}

/// Exclusive owner of the active-prop set.
#[derive(Debug, Default)]
pub struct PropSpawner {
    active: BTreeSet<PropHandle>,
    deferred: VecDeque<DeferredPropTask>,
}

impl PropSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> impl Iterator<Item = PropHandle> + '_ {
        self.active.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn contains(&self, prop: PropHandle) -> bool {
        self.active.contains(&prop)
    }

    pub fn pending_tasks(&self) -> usize {
        self.deferred.len()
    }

    /// Create one prop and queue its model and scale for the next tick.
    ///
    /// Creation failures are absorbed; props are cosmetic.
    pub fn spawn<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        model: &str,
        origin: Vec3,
        angles: Angles,
        scale: Option<f32>,
    ) -> Option<PropHandle> {
        let request = PropSpawnRequest::restriction_prop(origin, angles);
        let prop = match host.create_prop(&request) {
            Ok(prop) => prop,
            Err(err) => {
                tracing::debug!(
                    target: "map_restrictions::props",
                    error = %err,
                    origin = ?origin,
                    "prop.spawn_skipped"
                );
                return None;
            }
        };

        self.active.insert(prop);
        self.deferred.push_back(DeferredPropTask::SetModel {
            prop,
            model: model.to_string(),
        });
        if let Some(scale) = scale {
            self.deferred
                .push_back(DeferredPropTask::SetScale { prop, scale });
        }

        tracing::debug!(
            target: "map_restrictions::props",
            %prop,
            origin = ?origin,
            angles = %angles,
            "prop.spawned"
        );
        Some(prop)
    }

    /// Apply every task queued before this tick. Returns how many were applied.
    pub fn run_deferred<H: Host + ?Sized>(&mut self, host: &mut H) -> usize {
        let mut applied = 0;
        for task in std::mem::take(&mut self.deferred) {
            let prop = task.prop();
            if !self.active.contains(&prop) || !host.is_prop_valid(prop) {
                continue;
            }
            let result = match &task {
                DeferredPropTask::SetModel { model, .. } => host.set_prop_model(prop, model),
                DeferredPropTask::SetScale { scale, .. } => host.set_prop_scale(prop, *scale),
            };
            match result {
                Ok(()) => applied += 1,
                Err(err) => tracing::debug!(
                    target: "map_restrictions::props",
                    %prop,
                    error = %err,
                    "prop.deferred_failed"
                ),
            }
        }
        applied
    }

    /// Remove every tracked prop still alive in the host and forget the rest.
    pub fn clear_all<H: Host + ?Sized>(&mut self, host: &mut H) -> ClearSummary {
        let mut summary = ClearSummary::default();
        for prop in std::mem::take(&mut self.active) {
            if host.is_prop_valid(prop) {
                host.remove_prop(prop);
                summary.removed += 1;
            } else {
                summary.stale += 1;
            }
        }
        self.deferred.clear();

        if summary.removed > 0 || summary.stale > 0 {
            tracing::debug!(
                target: "map_restrictions::props",
                removed = summary.removed,
                stale = summary.stale,
                "props.cleared"
            );
        }
        summary
    }
}
