//! Scene
//!
//! The scene is the single owner of one map's entities and static brushes:
//! - Ordered entity list (order drives update scans and positional ids)
//! - Ordered brush list (static geometry, no behaviour)
//! - Generational keys so stale references stop resolving
//! - Deferred removal, so entities can be deleted mid-frame without
//!   invalidating anyone's iteration

use std::collections::HashMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityKind, EntityType};
use super::handle::{EntityKey, KeyAllocator};
use super::render::{BrushView, EntityView, RenderSnapshot};
use crate::error::ConfigError;
use crate::math::BoundingBox;

/// Static world geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brush {
    #[serde(default)]
    pub id: String,
    pub bbox: BoundingBox,
}

impl Brush {
    pub fn new(id: impl Into<String>, bbox: BoundingBox) -> Self {
        Self { id: id.into(), bbox }
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    entities: Vec<Entity>,
    brushes: Vec<Brush>,
    keys: KeyAllocator,
    /// Entities queued for removal at end of frame
    removal_queue: Vec<EntityKey>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Entity Management
    // =========================================================================

    /// Take ownership of `entity` and append it to the entity list
    pub fn add_entity(&mut self, mut entity: Entity) -> EntityKey {
        let key = self.keys.allocate();
        entity.set_key(key);
        debug!("scene: added {} as {}", entity, key);
        self.entities.push(entity);
        key
    }

    /// Queue an entity for removal at end of frame
    pub fn remove_entity(&mut self, key: EntityKey) {
        if self.contains(key) && !self.removal_queue.contains(&key) {
            self.removal_queue.push(key);
        }
    }

    /// Remove an entity right now. Only safe outside of iteration.
    pub fn remove_entity_immediate(&mut self, key: EntityKey) -> Option<Entity> {
        let index = self.index_of(key)?;
        self.keys.free(key);
        self.removal_queue.retain(|k| *k != key);
        Some(self.entities.remove(index))
    }

    /// Process all queued removals. Returns the removed entities in queue order.
    pub fn flush_removals(&mut self) -> Vec<Entity> {
        let queue = std::mem::take(&mut self.removal_queue);
        queue
            .into_iter()
            .filter_map(|key| self.remove_entity_immediate(key))
            .collect()
    }

    pub fn is_pending_removal(&self, key: EntityKey) -> bool {
        self.removal_queue.contains(&key)
    }

    pub fn contains(&self, key: EntityKey) -> bool {
        self.keys.is_live(key)
    }

    /// Position of `key` in the entity list
    pub fn index_of(&self, key: EntityKey) -> Option<usize> {
        if !self.keys.is_live(key) {
            return None;
        }
        self.entities.iter().position(|e| e.key() == key)
    }

    pub fn get(&self, key: EntityKey) -> Option<&Entity> {
        self.index_of(key).and_then(|i| self.entities.get(i))
    }

    pub fn get_mut(&mut self, key: EntityKey) -> Option<&mut Entity> {
        let index = self.index_of(key)?;
        self.entities.get_mut(index)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// First entity with the given id
    pub fn find_entity(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn find_entity_mut(&mut self, id: &str) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    pub fn key_of(&self, id: &str) -> Option<EntityKey> {
        self.find_entity(id).map(Entity::key)
    }

    /// First entity with the given id, only if it has the given type
    pub fn find_entity_of_type(&self, id: &str, entity_type: EntityType) -> Option<&Entity> {
        self.find_entity(id).filter(|e| e.entity_type() == entity_type)
    }

    pub fn entities_of_type(&self, entity_type: EntityType) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |e| e.entity_type() == entity_type)
    }

    pub fn player(&self) -> Option<&Entity> {
        self.entities_of_type(EntityType::Player).next()
    }

    pub fn player_key(&self) -> Option<EntityKey> {
        self.player().map(Entity::key)
    }

    // =========================================================================
    // Brushes
    // =========================================================================

    pub fn add_brush(&mut self, brush: Brush) {
        self.brushes.push(brush);
    }

    pub fn remove_brush(&mut self, id: &str) -> Option<Brush> {
        let index = self.brushes.iter().position(|b| b.id == id)?;
        Some(self.brushes.remove(index))
    }

    pub fn brushes(&self) -> &[Brush] {
        &self.brushes
    }

    /// Replace static brush `index` with a brush entity occupying the same
    /// volume. The entity is centred on the brush and still needs spawning.
    pub fn promote_brush(
        &mut self,
        index: usize,
        kind: EntityKind,
    ) -> Result<Option<EntityKey>, ConfigError> {
        if kind.entity_type() != EntityType::Brush {
            warn!("cannot turn a brush into a {}", kind.name());
            return Ok(None);
        }
        let Some(brush) = self.brushes.get(index) else {
            warn!("no brush at index {}", index);
            return Ok(None);
        };

        let center = brush.bbox.center();
        let local = BoundingBox::new(brush.bbox.mins - center, brush.bbox.maxs - center);
        let entity = Entity::new(kind, center)?
            .with_id(brush.id.clone())
            .with_bbox(local);
        entity.check_bbox()?;

        self.brushes.remove(index);
        Ok(Some(self.add_entity(entity)))
    }

    // =========================================================================
    // Ids
    // =========================================================================

    /// Give `key` the id its list position implies
    pub fn generate_id(&mut self, key: EntityKey) -> Option<String> {
        let index = self.index_of(key)?;
        let entity = self.entities.get_mut(index)?;
        entity.id = Entity::positional_id(entity.entity_type(), index);
        Some(entity.id.clone())
    }

    /// Regenerate every entity and brush id positionally and rewrite
    /// references (entity targets, trigger targets) to match.
    pub fn regenerate_ids(&mut self) {
        let mut renames: HashMap<String, String> = HashMap::new();

        for (i, entity) in self.entities.iter_mut().enumerate() {
            let id = Entity::positional_id(entity.entity_type(), i);
            if !entity.id.is_empty() && entity.id != id {
                renames.entry(entity.id.clone()).or_insert_with(|| id.clone());
            }
            entity.id = id;
        }

        for (i, brush) in self.brushes.iter_mut().enumerate() {
            brush.id = format!("brush {}", i);
        }

        if renames.is_empty() {
            return;
        }

        let rename = |target: &mut Option<String>| {
            if let Some(new) = target.as_ref().and_then(|t| renames.get(t)) {
                *target = Some(new.clone());
            }
        };
        for entity in &mut self.entities {
            rename(&mut entity.target);
            if let Some(brush) = entity.trigger_brush_mut() {
                rename(&mut brush.target);
            }
        }
    }

    // =========================================================================
    // Views
    // =========================================================================

    pub fn snapshot(&self, frame: u64) -> RenderSnapshot {
        RenderSnapshot {
            frame,
            entities: self
                .entities
                .iter()
                .map(|e| EntityView {
                    key: e.key(),
                    id: e.id.clone(),
                    entity_type: e.entity_type(),
                    position: e.position,
                    bbox: e.world_bbox(),
                    alive: e.alive,
                })
                .collect(),
            brushes: self
                .brushes
                .iter()
                .map(|b| BrushView { id: b.id.clone(), bbox: b.bbox })
                .collect(),
        }
    }
}
