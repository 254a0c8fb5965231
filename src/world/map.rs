//! Map file loading and saving
//!
//! A map is an ordered entity list plus an ordered brush list. Files are RON
//! by default; a `.json` extension selects JSON. Ids in a file are trusted
//! on load; on save they are regenerated from list positions.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ConfigError;
use crate::game::{Brush, Entity, EntityKind, Scene};

/// Validation limits to keep hostile or corrupt files bounded
pub mod limits {
    pub const MAX_ENTITIES: usize = 4096;
    pub const MAX_BRUSHES: usize = 16384;
    /// Maximum string length for ids and paths
    pub const MAX_STRING_LEN: usize = 256;
    /// Maximum absolute coordinate value
    pub const MAX_COORD: f32 = 1_000_000.0;
    /// Maximum nesting of spawn prototypes inside prototypes
    pub const MAX_PROTOTYPE_DEPTH: usize = 4;
}

#[derive(Debug, Error)]
pub enum MapError {
    #[error("map file not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("serialize error: {0}")]
    Serialize(#[from] ron::Error),
    #[error("validation error: {0}")]
    Validation(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapFormat {
    Ron,
    Json,
}

impl MapFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => MapFormat::Json,
            _ => MapFormat::Ron,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapFile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub brushes: Vec<Brush>,
}

impl MapFile {
    /// Capture `scene`, regenerating its ids first
    pub fn from_scene(name: impl Into<String>, scene: &mut Scene) -> Self {
        scene.regenerate_ids();
        Self {
            name: name.into(),
            entities: scene.entities().iter().map(Entity::instantiate).collect(),
            brushes: scene.brushes().to_vec(),
        }
    }

    /// Build a scene holding this map's entities and brushes (not yet spawned)
    pub fn into_scene(self) -> Scene {
        let mut scene = Scene::new();
        for entity in self.entities {
            scene.add_entity(entity);
        }
        for brush in self.brushes {
            scene.add_brush(brush);
        }
        scene
    }
}

fn is_valid_coord(f: f32) -> bool {
    f.is_finite() && f.abs() <= limits::MAX_COORD
}

fn validate_entity(entity: &Entity, context: &str, depth: usize) -> Result<(), MapError> {
    if depth > limits::MAX_PROTOTYPE_DEPTH {
        return Err(MapError::Validation(format!("{}: prototypes nested too deeply", context)));
    }
    entity.validate()?;

    if entity.id.len() > limits::MAX_STRING_LEN {
        return Err(MapError::Validation(format!("{}: id too long", context)));
    }
    let p = entity.position;
    if !(is_valid_coord(p.x) && is_valid_coord(p.y) && is_valid_coord(p.z)) {
        return Err(MapError::Validation(format!("{}: invalid position {}", context, p)));
    }
    if !(entity.bbox.mins.is_finite() && entity.bbox.maxs.is_finite()) {
        return Err(MapError::Validation(format!("{}: non-finite bounding box", context)));
    }
    if !entity.health.is_finite() || !entity.max_health.is_finite() {
        return Err(MapError::Validation(format!("{}: non-finite health", context)));
    }

    let prototype = match &entity.kind {
        EntityKind::Trigger(brush) => brush.entity_value.as_deref(),
        EntityKind::Spawner(spawner) => spawner.prototype.as_deref(),
        EntityKind::Sound(sound) if sound.audio_path.len() > limits::MAX_STRING_LEN => {
            return Err(MapError::Validation(format!("{}: audio path too long", context)));
        }
        _ => None,
    };
    if let Some(prototype) = prototype {
        validate_entity(prototype, &format!("{} prototype", context), depth + 1)?;
    }
    Ok(())
}

/// Check every entity and brush in a parsed map
pub fn validate_map(map: &MapFile) -> Result<(), MapError> {
    if map.entities.len() > limits::MAX_ENTITIES {
        return Err(MapError::Validation(format!(
            "too many entities ({} > {})",
            map.entities.len(),
            limits::MAX_ENTITIES
        )));
    }
    if map.brushes.len() > limits::MAX_BRUSHES {
        return Err(MapError::Validation(format!(
            "too many brushes ({} > {})",
            map.brushes.len(),
            limits::MAX_BRUSHES
        )));
    }

    for (i, entity) in map.entities.iter().enumerate() {
        validate_entity(entity, &format!("entity[{}]", i), 0)?;
    }

    for (i, brush) in map.brushes.iter().enumerate() {
        if !(brush.bbox.mins.is_finite() && brush.bbox.maxs.is_finite()) || !brush.bbox.is_valid() {
            return Err(MapError::Validation(format!(
                "brush[{}] \"{}\": invalid bounding box {}",
                i, brush.id, brush.bbox
            )));
        }
    }

    Ok(())
}

/// Load and validate a map file
pub fn load_map<P: AsRef<Path>>(path: P) -> Result<MapFile, MapError> {
    let path = path.as_ref();
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(MapError::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    let map = load_map_from_str(&contents, MapFormat::from_path(path))?;
    info!(
        "loaded map {} ({} entities, {} brushes)",
        path.display(),
        map.entities.len(),
        map.brushes.len()
    );
    Ok(map)
}

/// Parse and validate a map from a string (embedded maps, tests)
pub fn load_map_from_str(s: &str, format: MapFormat) -> Result<MapFile, MapError> {
    let map: MapFile = match format {
        MapFormat::Ron => ron::from_str(s)?,
        MapFormat::Json => serde_json::from_str(s)?,
    };
    validate_map(&map)?;
    Ok(map)
}

pub fn map_to_string(map: &MapFile, format: MapFormat) -> Result<String, MapError> {
    match format {
        MapFormat::Ron => {
            let config = ron::ser::PrettyConfig::new()
                .depth_limit(4)
                .indentor("  ".to_string());
            Ok(ron::ser::to_string_pretty(map, config)?)
        }
        MapFormat::Json => Ok(serde_json::to_string_pretty(map)?),
    }
}

pub fn save_map<P: AsRef<Path>>(map: &MapFile, path: P) -> Result<(), MapError> {
    let path = path.as_ref();
    let contents = map_to_string(map, MapFormat::from_path(path))?;
    fs::write(path, contents)?;
    info!("saved map {} ({} entities)", path.display(), map.entities.len());
    Ok(())
}

/// Regenerate `scene`'s ids and write it to `path`
pub fn save_scene<P: AsRef<Path>>(
    scene: &mut Scene,
    name: &str,
    path: P,
) -> Result<MapFile, MapError> {
    let map = MapFile::from_scene(name, scene);
    save_map(&map, path)?;
    Ok(map)
}

/// Load a map file straight into an unspawned scene
pub fn load_scene<P: AsRef<Path>>(path: P) -> Result<Scene, MapError> {
    Ok(load_map(path)?.into_scene())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::game::{EntityEvent, EntityType, Simulation, TriggerBrush};
    use crate::math::{BoundingBox, Vec3};

    fn setup_test_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    fn three_entity_scene() -> Scene {
        let mut scene = Scene::new();
        scene.add_entity(Entity::player(Vec3::ZERO).with_id("hero"));
        scene.add_entity(Entity::npc(Vec3::new(100.0, 0.0, 0.0)));
        scene.add_entity(Entity::trigger(
            Vec3::new(0.0, 0.0, 32.0),
            BoundingBox::cube(16.0),
            TriggerBrush::new("hero", EntityEvent::TakeDamage),
        ));
        scene.add_brush(Brush::new("", BoundingBox::cube(512.0)));
        scene
    }

    #[test]
    fn test_save_regenerates_positional_ids() {
        let dir = setup_test_dir();
        let path = dir.path().join("level.ron");
        let mut scene = three_entity_scene();

        save_scene(&mut scene, "test", &path).unwrap();
        let loaded = load_map(&path).unwrap();

        let ids: Vec<&str> = loaded.entities.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["player", "entity 1", "entity 2"]);
        assert_eq!(loaded.brushes[0].id, "brush 0");
        assert_eq!(
            loaded.entities[2].trigger_brush().unwrap().target.as_deref(),
            Some("player")
        );
        assert_eq!(loaded.entities[1].entity_type(), EntityType::Npc);
    }

    #[test]
    fn test_without_player_everything_is_positional() {
        let mut scene = Scene::new();
        scene.add_entity(Entity::npc(Vec3::ZERO));
        scene.add_entity(Entity::prop(Vec3::ZERO));
        let map = MapFile::from_scene("x", &mut scene);
        let ids: Vec<&str> = map.entities.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["entity 0", "entity 1"]);
    }

    #[test]
    fn test_load_trusts_ids_as_given() {
        let src = r#"(
            entities: [
                (id: "boss", kind: Npc, position: (x: 1.0, y: 2.0, z: 3.0),
                 bbox: (mins: (x: -1.0, y: -1.0, z: -1.0), maxs: (x: 1.0, y: 1.0, z: 1.0))),
            ],
        )"#;
        let map = load_map_from_str(src, MapFormat::Ron).unwrap();
        assert_eq!(map.entities[0].id, "boss");
        assert_eq!(map.entities[0].position, Vec3::new(1.0, 2.0, 3.0));
        assert!(map.brushes.is_empty());
    }

    #[test]
    fn test_omitted_health_spawns_at_kind_default() {
        let src = r#"(entities: [
            (id: "npc", kind: Npc,
             bbox: (mins: (x: -1.0, y: -1.0, z: -1.0), maxs: (x: 1.0, y: 1.0, z: 1.0))),
        ])"#;
        let scene = load_map_from_str(src, MapFormat::Ron).unwrap().into_scene();
        let mut sim = Simulation::new(scene, SimConfig::default());
        assert!(sim.spawn_all().is_empty());

        let key = sim.scene.key_of("npc").unwrap();
        sim.take_damage(key, 0.5, None);
        let npc = sim.scene.get(key).unwrap();
        assert_eq!(npc.max_health, 100.0);
        assert_eq!(npc.health, 99.5);
        assert!(npc.is_alive());
    }

    #[test]
    fn test_json_format() {
        let dir = setup_test_dir();
        let path = dir.path().join("level.json");
        let mut scene = three_entity_scene();
        save_scene(&mut scene, "json", &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.trim_start().starts_with('{'));
        let scene = load_scene(&path).unwrap();
        assert_eq!(scene.entity_count(), 3);
        assert!(scene.player().is_some());
    }

    #[test]
    fn test_untyped_entity_rejected() {
        let src = r#"{"entities": [{"kind": {"Basic": "None"},
            "bbox": {"mins": {"x": -1.0, "y": -1.0, "z": -1.0},
                     "maxs": {"x": 1.0, "y": 1.0, "z": 1.0}}}]}"#;
        assert!(matches!(
            load_map_from_str(src, MapFormat::Json),
            Err(MapError::Config(ConfigError::UntypedEntity { .. }))
        ));
    }

    #[test]
    fn test_invalid_boxes_rejected() {
        let src = r#"(entities: [(kind: Player,
            bbox: (mins: (x: 1.0, y: -1.0, z: -1.0), maxs: (x: 1.0, y: 1.0, z: 1.0)))])"#;
        assert!(matches!(
            load_map_from_str(src, MapFormat::Ron),
            Err(MapError::Config(ConfigError::InvalidBoundingBox { .. }))
        ));

        let src = r#"(brushes: [(id: "b",
            bbox: (mins: (x: 0.0, y: 0.0, z: 0.0), maxs: (x: 0.0, y: 1.0, z: 1.0)))])"#;
        assert!(matches!(load_map_from_str(src, MapFormat::Ron), Err(MapError::Validation(_))));
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let dir = setup_test_dir();
        assert!(matches!(load_map(dir.path().join("nope.ron")), Err(MapError::NotFound(_))));

        let path = dir.path().join("broken.ron");
        fs::write(&path, "(entities: [").unwrap();
        assert!(matches!(load_map(&path), Err(MapError::Parse(_))));
    }

    #[test]
    fn test_runtime_state_is_not_saved() {
        let mut scene = three_entity_scene();
        let key = scene.player_key().unwrap();
        scene.get_mut(key).unwrap().velocity = Vec3::ONE;
        scene.get_mut(key).unwrap().alive = true;

        let map = MapFile::from_scene("x", &mut scene);
        let text = map_to_string(&map, MapFormat::Ron).unwrap();
        assert!(!text.contains("velocity"));
        assert!(!text.contains("alive"));

        let back = load_map_from_str(&text, MapFormat::Ron).unwrap();
        assert!(!back.entities[0].alive);
        assert_eq!(back.entities[0].velocity, Vec3::ZERO);
    }
}
