//! Trigger brush policy
//!
//! A trigger brush watches its volume and, when an entity satisfies its
//! policy, forwards a target event to another entity by id. This module
//! holds the policy state machine; the per-frame scan that feeds it
//! candidates lives in the simulation runtime.
//!
//! Policy evaluation order for a candidate (or `None` on an exit edge):
//! 1. `trigger_on`: enter/exit edge filter
//! 2. `trigger_type`: once / counted / re-arm on leave
//! 3. tools and brushes never activate a trigger
//! 4. `trigger_by`: who may activate it

use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityType};
use super::event::{EntityEvent, EventValue};
use super::handle::EntityKey;
use crate::math::{BoundingBox, Quat, Vec3};

/// Value of the tri-state bool slot meaning "no bool payload"
pub const BOOL_UNSET: i32 = -1;

/// Which overlap edge fires the trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TriggerOn {
    /// Either entering or leaving
    #[default]
    Trigger,
    Enter,
    Exit,
}

/// How many times the trigger may fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TriggerType {
    #[default]
    Once,
    /// Up to `trigger_count` times
    Count,
    /// Any number of times, but not twice in a row for the same occupant
    Multiple,
}

/// Which entities may fire the trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TriggerBy {
    #[default]
    All,
    Player,
    Npcs,
}

/// Coarse firing state. There is no way back from `Exhausted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Armed,
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerBrush {
    /// Id of the entity that receives the events
    pub target: Option<String>,
    pub target_event: EntityEvent,
    pub trigger_on: TriggerOn,
    pub trigger_type: TriggerType,
    pub trigger_by: TriggerBy,
    /// Firing limit in `Count` mode
    pub trigger_count: u32,

    // Payload slots. `None` (or BOOL_UNSET) means the slot is empty, so zero
    // vectors, identity rotations and the unit box are all valid payloads.
    pub int_value: Option<i32>,
    pub float_value: Option<f32>,
    /// Negative = unset, 0 = false, positive = true
    pub bool_value: i32,
    pub vector_value: Option<Vec3>,
    pub rotation_value: Option<Quat>,
    pub entity_value: Option<Box<Entity>>,
    pub bounds_value: Option<BoundingBox>,

    #[serde(skip)]
    pub triggered_count: u32,
    #[serde(skip)]
    pub has_triggered: bool,
    /// Last occupant that fired (or was seen leaving)
    #[serde(skip)]
    pub previous_occupant: Option<EntityKey>,
}

impl Default for TriggerBrush {
    fn default() -> Self {
        Self {
            target: None,
            target_event: EntityEvent::None,
            trigger_on: TriggerOn::default(),
            trigger_type: TriggerType::default(),
            trigger_by: TriggerBy::default(),
            trigger_count: 0,
            int_value: None,
            float_value: None,
            bool_value: BOOL_UNSET,
            vector_value: None,
            rotation_value: None,
            entity_value: None,
            bounds_value: None,
            triggered_count: 0,
            has_triggered: false,
            previous_occupant: None,
        }
    }
}

impl TriggerBrush {
    pub fn new(target: impl Into<String>, target_event: EntityEvent) -> Self {
        Self {
            target: Some(target.into()),
            target_event,
            ..Self::default()
        }
    }

    pub fn with_policy(mut self, on: TriggerOn, kind: TriggerType, by: TriggerBy) -> Self {
        self.trigger_on = on;
        self.trigger_type = kind;
        self.trigger_by = by;
        self
    }

    /// Switch to `Count` mode with the given limit
    pub fn with_count(mut self, count: u32) -> Self {
        self.trigger_type = TriggerType::Count;
        self.trigger_count = count;
        self
    }

    /// Clear runtime counters. Called when the brush spawns.
    pub fn reset(&mut self) {
        self.triggered_count = 0;
        self.has_triggered = false;
        self.previous_occupant = None;
    }

    pub fn state(&self) -> TriggerState {
        let exhausted = match self.trigger_type {
            TriggerType::Once => self.has_triggered,
            TriggerType::Count => self.triggered_count >= self.trigger_count,
            TriggerType::Multiple => false,
        };
        if exhausted {
            TriggerState::Exhausted
        } else {
            TriggerState::Armed
        }
    }

    /// Early exit for the per-frame overlap scan
    pub fn scan_finished(&self) -> bool {
        match self.trigger_type {
            TriggerType::Once => self.has_triggered,
            TriggerType::Count => self.triggered_count > self.trigger_count,
            TriggerType::Multiple => false,
        }
    }

    pub fn bool_payload(&self) -> Option<bool> {
        if self.bool_value < 0 {
            None
        } else {
            Some(self.bool_value > 0)
        }
    }

    /// One value per filled payload slot, in slot order
    pub fn payloads(&self) -> Vec<EventValue> {
        let mut values = Vec::new();
        if let Some(i) = self.int_value {
            values.push(EventValue::Int(i));
        }
        if let Some(f) = self.float_value {
            values.push(EventValue::Float(f));
        }
        if let Some(b) = self.bool_payload() {
            values.push(EventValue::Bool(b));
        }
        if let Some(v) = self.vector_value {
            values.push(EventValue::Vector(v));
        }
        if let Some(q) = self.rotation_value {
            values.push(EventValue::Rotation(q));
        }
        if let Some(e) = &self.entity_value {
            values.push(EventValue::Entity(e.clone()));
        }
        if let Some(b) = self.bounds_value {
            values.push(EventValue::Bounds(b));
        }
        values
    }

    /// Run the policy filters for `candidate` (`None` = occupant left)
    pub fn accepts(&self, candidate: Option<(EntityKey, EntityType)>) -> bool {
        let key = candidate.map(|(k, _)| k);

        let edge_ok = match self.trigger_on {
            TriggerOn::Trigger => true,
            TriggerOn::Enter => key.is_some() && self.previous_occupant != key,
            TriggerOn::Exit => key.is_none() && self.previous_occupant.is_some(),
        };
        edge_ok && self.passes_policy(candidate)
    }

    /// Steps 2-4: firing limit, tool/brush exclusion, `trigger_by`
    fn passes_policy(&self, candidate: Option<(EntityKey, EntityType)>) -> bool {
        let key = candidate.map(|(k, _)| k);

        let type_ok = match self.trigger_type {
            TriggerType::Once => !self.has_triggered,
            TriggerType::Count => self.triggered_count < self.trigger_count,
            TriggerType::Multiple => self.previous_occupant != key,
        };
        if !type_ok {
            return false;
        }

        let entity_type = candidate.map(|(_, t)| t);
        if matches!(entity_type, Some(EntityType::Tool | EntityType::Brush)) {
            return false;
        }

        match self.trigger_by {
            TriggerBy::All => true,
            TriggerBy::Player => entity_type == Some(EntityType::Player),
            TriggerBy::Npcs => entity_type == Some(EntityType::Npc),
        }
    }

    /// Remember an overlapping candidate an `Exit` brush turned away, so
    /// its departure can be detected. Returns whether it was recorded.
    pub fn note_occupant(&mut self, candidate: EntityKey, entity_type: EntityType) -> bool {
        if self.trigger_on != TriggerOn::Exit
            || self.previous_occupant.is_some()
            || self.state() == TriggerState::Exhausted
        {
            return false;
        }
        if !self.passes_policy(Some((candidate, entity_type))) {
            return false;
        }
        self.previous_occupant = Some(candidate);
        true
    }

    /// Bookkeeping after a successful fire
    pub fn record_fire(&mut self, candidate: Option<EntityKey>) {
        self.triggered_count += 1;
        self.has_triggered = true;
        self.previous_occupant = candidate;
    }
}
