//! Built-in demo map
//!
//! A small room: the player walks into a trigger that hurts the guard, a
//! spawner drops a crate when the player reaches the far end, and an
//! ambient loop plays throughout.

use crate::game::{
    Brush, Entity, EntityEvent, EntitySpawner, Scene, SoundEntity, TriggerBrush, TriggerBy,
    TriggerOn, TriggerType,
};
use crate::math::{BoundingBox, Vec3};

use super::map::MapFile;

pub fn demo_map() -> MapFile {
    let mut scene = Scene::new();

    scene.add_entity(Entity::player(Vec3::ZERO));

    let mut guard = Entity::npc(Vec3::new(400.0, 0.0, 0.0)).with_max_health(150.0);
    guard.target = Some("player".to_string());
    scene.add_entity(guard.with_id("guard"));

    let mut hurt = TriggerBrush::new("guard", EntityEvent::TakeDamage).with_policy(
        TriggerOn::Enter,
        TriggerType::Count,
        TriggerBy::Player,
    );
    hurt.trigger_count = 3;
    hurt.float_value = Some(40.0);
    scene.add_entity(Entity::trigger(Vec3::new(128.0, 0.0, 0.0), BoundingBox::cube(48.0), hurt));

    let crate_prop = Entity::prop(Vec3::ZERO).with_id("crate");
    scene.add_entity(
        Entity::spawner(Vec3::new(256.0, 128.0, 0.0), EntitySpawner::with_prototype(crate_prop))
            .with_id("dropper"),
    );
    scene.add_entity(Entity::trigger(
        Vec3::new(256.0, 0.0, 0.0),
        BoundingBox::cube(48.0),
        TriggerBrush::new("dropper", EntityEvent::SpawnEntity).with_policy(
            TriggerOn::Enter,
            TriggerType::Once,
            TriggerBy::Player,
        ),
    ));

    scene.add_entity(
        Entity::sound(
            Vec3::new(0.0, 0.0, 128.0),
            SoundEntity::new("audio/ambient/hum.ogg", 0.5, true),
        )
        .with_id("ambience"),
    );

    scene.add_brush(Brush::new(
        "floor",
        BoundingBox::new(Vec3::new(-512.0, -512.0, -16.0), Vec3::new(512.0, 512.0, 0.0)),
    ));

    MapFile::from_scene("demo", &mut scene)
}
