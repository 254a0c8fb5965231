//! Entities
//!
//! An [`Entity`] is the shared state every simulated object carries
//! (position, velocity, box, health, liveness, relations) plus an
//! [`EntityKind`] payload for the behaviour variant. The scene owns every
//! entity; relations to other entities are ids or [`EntityKey`]s, never
//! owning references.
//!
//! Bounding boxes are local extents around `position`. Spatial queries use
//! [`Entity::world_bbox`].

use std::fmt;

use serde::{Deserialize, Serialize};

use super::handle::EntityKey;
use super::tools::{EntitySpawner, SoundEntity};
use super::trigger::TriggerBrush;
use crate::config::SimConfig;
use crate::error::ConfigError;
use crate::math::{BoundingBox, Quat, Vec3};

/// Id reserved for the player entity
pub const PLAYER_ID: &str = "player";

/// Standing volume of players and NPCs
pub const ACTOR_BOX: BoundingBox = BoundingBox::new(
    Vec3::new(-32.0, -32.0, 0.0),
    Vec3::new(32.0, 32.0, 64.0),
);

/// Volume of tool entities
pub const TOOL_BOX: BoundingBox = BoundingBox::cube(8.0);

/// Starting health for players, NPCs and damageable brushes
pub const DEFAULT_MAX_HEALTH: f32 = 100.0;

/// Classification of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EntityType {
    /// Unclassified. Never valid on a constructed entity.
    #[default]
    None,
    Player,
    Item,
    Prop,
    Npc,
    Tool,
    Brush,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Behaviour variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityKind {
    /// Passive entity of the given type (props, items)
    Basic(EntityType),
    Player,
    Npc,
    /// Brush volume that can be damaged and destroyed
    DamageableBrush,
    Trigger(TriggerBrush),
    Spawner(EntitySpawner),
    Sound(SoundEntity),
}

impl EntityKind {
    pub fn entity_type(&self) -> EntityType {
        match self {
            EntityKind::Basic(t) => *t,
            EntityKind::Player => EntityType::Player,
            EntityKind::Npc => EntityType::Npc,
            EntityKind::DamageableBrush | EntityKind::Trigger(_) => EntityType::Brush,
            EntityKind::Spawner(_) | EntityKind::Sound(_) => EntityType::Tool,
        }
    }

    /// Short label for logs
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Basic(_) => "Entity",
            EntityKind::Player => "Player",
            EntityKind::Npc => "NPC",
            EntityKind::DamageableBrush => "DamageableBrush",
            EntityKind::Trigger(_) => "TriggerBrush",
            EntityKind::Spawner(_) => "EntitySpawner",
            EntityKind::Sound(_) => "SoundEntity",
        }
    }

    fn default_bbox(&self) -> BoundingBox {
        match self.entity_type() {
            EntityType::Player | EntityType::Npc => ACTOR_BOX,
            EntityType::Tool => TOOL_BOX,
            _ => BoundingBox::ONE,
        }
    }

    fn default_max_health(&self) -> f32 {
        match self {
            EntityKind::Player | EntityKind::Npc | EntityKind::DamageableBrush => {
                DEFAULT_MAX_HEALTH
            }
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EntityRecord")]
pub struct Entity {
    /// Scene-unique name, regenerated positionally on save
    pub id: String,
    pub kind: EntityKind,
    pub position: Vec3,
    pub rotation: Quat,
    pub bbox: BoundingBox,
    pub max_health: f32,
    pub health: f32,
    /// Id of the entity this one is focused on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(skip)]
    pub velocity: Vec3,
    #[serde(skip)]
    pub alive: bool,
    #[serde(skip)]
    pub last_attacker: Option<EntityKey>,
    #[serde(skip)]
    key: EntityKey,
}

/// Entity as written in a map file. Omitted fields take the kind's defaults.
#[derive(Deserialize)]
struct EntityRecord {
    #[serde(default)]
    id: String,
    kind: EntityKind,
    #[serde(default)]
    position: Vec3,
    #[serde(default)]
    rotation: Quat,
    bbox: Option<BoundingBox>,
    max_health: Option<f32>,
    health: Option<f32>,
    #[serde(default)]
    target: Option<String>,
}

impl From<EntityRecord> for Entity {
    fn from(record: EntityRecord) -> Self {
        let mut entity = Entity::with_kind(record.kind, record.position).with_id(record.id);
        entity.rotation = record.rotation;
        if let Some(bbox) = record.bbox {
            entity.bbox = bbox;
        }
        if let Some(max_health) = record.max_health {
            entity = entity.with_max_health(max_health);
        }
        if let Some(health) = record.health {
            entity.health = health;
        }
        entity.target = record.target;
        entity
    }
}

impl Entity {
    /// Build an entity with the defaults of its kind
    ///
    /// Fails for `Basic(EntityType::None)`: every entity needs a type.
    pub fn new(kind: EntityKind, position: Vec3) -> Result<Self, ConfigError> {
        let entity = Self::with_kind(kind, position);
        entity.check_type()?;
        Ok(entity)
    }

    fn with_kind(kind: EntityKind, position: Vec3) -> Self {
        let bbox = kind.default_bbox();
        let max_health = kind.default_max_health();
        Self {
            id: String::new(),
            kind,
            position,
            rotation: Quat::IDENTITY,
            bbox,
            max_health,
            health: max_health,
            target: None,
            velocity: Vec3::ZERO,
            alive: false,
            last_attacker: None,
            key: EntityKey::NULL,
        }
    }

    pub fn player(position: Vec3) -> Self {
        Self::with_kind(EntityKind::Player, position)
    }

    pub fn npc(position: Vec3) -> Self {
        Self::with_kind(EntityKind::Npc, position)
    }

    pub fn prop(position: Vec3) -> Self {
        Self::with_kind(EntityKind::Basic(EntityType::Prop), position)
    }

    pub fn item(position: Vec3) -> Self {
        Self::with_kind(EntityKind::Basic(EntityType::Item), position)
    }

    pub fn trigger(position: Vec3, bbox: BoundingBox, brush: TriggerBrush) -> Self {
        Self::with_kind(EntityKind::Trigger(brush), position).with_bbox(bbox)
    }

    pub fn damageable_brush(position: Vec3, bbox: BoundingBox) -> Self {
        Self::with_kind(EntityKind::DamageableBrush, position).with_bbox(bbox)
    }

    pub fn spawner(position: Vec3, spawner: EntitySpawner) -> Self {
        Self::with_kind(EntityKind::Spawner(spawner), position)
    }

    pub fn sound(position: Vec3, sound: SoundEntity) -> Self {
        Self::with_kind(EntityKind::Sound(sound), position)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = bbox;
        self
    }

    pub fn with_max_health(mut self, max_health: f32) -> Self {
        self.max_health = max_health;
        self.health = max_health;
        self
    }

    /// Scene key; `EntityKey::NULL` until added to a scene
    pub fn key(&self) -> EntityKey {
        self.key
    }

    pub(crate) fn set_key(&mut self, key: EntityKey) {
        self.key = key;
    }

    pub fn entity_type(&self) -> EntityType {
        self.kind.entity_type()
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Bounding box placed at the entity's position
    pub fn world_bbox(&self) -> BoundingBox {
        self.bbox.translated(self.position)
    }

    pub fn check_type(&self) -> Result<(), ConfigError> {
        if self.entity_type() == EntityType::None {
            return Err(ConfigError::UntypedEntity { id: self.id.clone() });
        }
        Ok(())
    }

    pub fn check_bbox(&self) -> Result<(), ConfigError> {
        if !self.bbox.is_valid() {
            return Err(ConfigError::InvalidBoundingBox {
                id: self.id.clone(),
                bbox: self.bbox,
            });
        }
        Ok(())
    }

    /// Both fatal configuration checks
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.check_type()?;
        self.check_bbox()
    }

    pub fn add_force(&mut self, force: Vec3, multiplier: f32) {
        self.velocity += force * multiplier;
    }

    /// Advance position by velocity, then apply drag
    pub fn integrate(&mut self, dt: f32, config: &SimConfig) {
        let limit = Vec3::splat(config.max_velocity);
        self.velocity = self.velocity.clamp(-limit, limit);

        self.position += self.velocity * dt;

        self.velocity *= (1.0 - config.drag * dt).max(0.0);

        if self.velocity.magnitude() <= config.rest_speed {
            self.velocity = Vec3::ZERO;
        }
    }

    pub fn trigger_brush(&self) -> Option<&TriggerBrush> {
        match &self.kind {
            EntityKind::Trigger(t) => Some(t),
            _ => None,
        }
    }

    pub fn trigger_brush_mut(&mut self) -> Option<&mut TriggerBrush> {
        match &mut self.kind {
            EntityKind::Trigger(t) => Some(t),
            _ => None,
        }
    }

    pub fn sound_mut(&mut self) -> Option<&mut SoundEntity> {
        match &mut self.kind {
            EntityKind::Sound(s) => Some(s),
            _ => None,
        }
    }

    /// Fresh copy for spawning: no key, no runtime state
    pub fn instantiate(&self) -> Entity {
        let mut copy = self.clone();
        copy.key = EntityKey::NULL;
        copy.alive = false;
        copy.velocity = Vec3::ZERO;
        copy.last_attacker = None;
        if let Some(brush) = copy.trigger_brush_mut() {
            brush.reset();
        }
        copy
    }

    /// Id an entity gets at list position `index`
    pub fn positional_id(entity_type: EntityType, index: usize) -> String {
        if entity_type == EntityType::Player {
            PLAYER_ID.to_string()
        } else {
            format!("entity {}", index)
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (\"{}\")", self.kind.name(), self.id)
    }
}
