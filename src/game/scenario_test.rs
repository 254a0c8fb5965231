//! Frame-level scenarios exercising several subsystems together

use super::*;
use crate::config::SimConfig;
use crate::math::{BoundingBox, Vec3};
use crate::world::{self, demo_map, MapFormat};

const FAR_AWAY: Vec3 = Vec3::new(5000.0, 0.0, 0.0);

/// Player standing inside a trigger aimed at a sturdy brush off to the side
fn trigger_room(brush: TriggerBrush) -> (Simulation, EntityKey, EntityKey, EntityKey) {
    let mut scene = Scene::new();
    let player = scene.add_entity(Entity::player(Vec3::ZERO).with_id("player"));
    let trigger = scene.add_entity(Entity::trigger(Vec3::ZERO, BoundingBox::cube(16.0), brush));
    let target = scene.add_entity(
        Entity::damageable_brush(Vec3::new(0.0, 1000.0, 0.0), BoundingBox::cube(32.0))
            .with_id("door")
            .with_max_health(500.0),
    );

    let mut sim = Simulation::new(scene, SimConfig::default());
    assert!(sim.spawn_all().is_empty());
    (sim, player, trigger, target)
}

/// Step `frames` times, counting damage notifications against `target`
fn run_counting_damage(sim: &mut Simulation, target: EntityKey, frames: usize) -> usize {
    let mut hits = 0;
    for _ in 0..frames {
        sim.step(0.1);
        hits += sim.events.damaged.iter().filter(|d| d.target == target).count();
    }
    hits
}

fn teleport(sim: &mut Simulation, key: EntityKey, position: Vec3) {
    sim.on_event(key, EntityEvent::SetPosition, Some(EventValue::Vector(position)), None);
}

fn health(sim: &Simulation, key: EntityKey) -> f32 {
    sim.scene.get(key).map(|e| e.health).unwrap_or(f32::NAN)
}

#[test]
fn test_ray_from_the_side_hits_unit_box() {
    let mut scene = Scene::new();
    let a = scene.add_entity(Entity::prop(Vec3::ZERO).with_bbox(BoundingBox::ONE));

    let mut ray = Ray::new(Vec3::new(5.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0)).with_length(10.0);
    assert!(ray.cast(&scene, RayIgnore::empty(), &[]));
    assert_eq!(ray.hit, Some(TraceHit::Entity(a)));

    let mut short = Ray::new(Vec3::new(5.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0)).with_length(3.0);
    assert!(!short.cast(&scene, RayIgnore::empty(), &[]));
}

#[test]
fn test_once_trigger_damages_exactly_once() {
    let mut brush = TriggerBrush::new("door", EntityEvent::TakeDamage).with_policy(
        TriggerOn::Trigger,
        TriggerType::Once,
        TriggerBy::Player,
    );
    brush.float_value = Some(100.0);
    let (mut sim, _player, trigger, target) = trigger_room(brush);

    assert_eq!(run_counting_damage(&mut sim, target, 11), 1);
    assert_eq!(health(&sim, target), 400.0);

    let brush = sim.scene.get(trigger).and_then(|e| e.trigger_brush()).unwrap();
    assert!(brush.has_triggered);
    assert_eq!(brush.state(), trigger::TriggerState::Exhausted);
}

#[test]
fn test_count_trigger_fires_up_to_its_limit() {
    let mut brush = TriggerBrush::new("door", EntityEvent::TakeDamage).with_count(3);
    brush.int_value = Some(10);
    let (mut sim, _player, trigger, target) = trigger_room(brush);

    assert_eq!(run_counting_damage(&mut sim, target, 8), 3);
    assert_eq!(health(&sim, target), 470.0);
    let brush = sim.scene.get(trigger).and_then(|e| e.trigger_brush()).unwrap();
    assert_eq!(brush.triggered_count, 3);
}

#[test]
fn test_every_filled_slot_is_forwarded_plus_untyped() {
    let mut brush = TriggerBrush::new("door", EntityEvent::TakeDamage);
    brush.int_value = Some(5);
    brush.float_value = Some(2.5);
    brush.bool_value = 1;
    let (mut sim, _player, _trigger, target) = trigger_room(brush);

    sim.step(0.1);
    // Bool has no damage meaning; the untyped call is ignored by TakeDamage
    assert_eq!(sim.events.damaged.len(), 2);
    assert_eq!(health(&sim, target), 492.5);
    let fired: Vec<_> = sim.events.triggered.iter().collect();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].payloads, 3);
}

#[test]
fn test_multiple_trigger_rearms_when_occupant_leaves() {
    let mut brush = TriggerBrush::new("door", EntityEvent::TakeDamage).with_policy(
        TriggerOn::Trigger,
        TriggerType::Multiple,
        TriggerBy::Player,
    );
    brush.float_value = Some(1.0);
    let (mut sim, player, trigger, target) = trigger_room(brush);

    assert_eq!(run_counting_damage(&mut sim, target, 3), 1);

    teleport(&mut sim, player, FAR_AWAY);
    assert_eq!(run_counting_damage(&mut sim, target, 2), 0);
    let brush = sim.scene.get(trigger).and_then(|e| e.trigger_brush()).unwrap();
    assert_eq!(brush.previous_occupant, None);

    teleport(&mut sim, player, Vec3::ZERO);
    assert_eq!(run_counting_damage(&mut sim, target, 3), 1);
    assert_eq!(health(&sim, target), 498.0);
}

#[test]
fn test_exit_trigger_fires_when_occupant_leaves() {
    let brush = TriggerBrush::new("door", EntityEvent::Kill).with_policy(
        TriggerOn::Exit,
        TriggerType::Once,
        TriggerBy::All,
    );
    let (mut sim, player, trigger, target) = trigger_room(brush);

    // Standing inside never fires an exit brush
    for _ in 0..5 {
        sim.step(0.1);
        assert!(sim.events.triggered.is_empty());
    }
    let watched = sim.scene.get(trigger).and_then(|e| e.trigger_brush()).unwrap();
    assert_eq!(watched.previous_occupant, Some(player));
    assert!(sim.scene.get(target).unwrap().is_alive());

    teleport(&mut sim, player, FAR_AWAY);
    let mut fired = Vec::new();
    for _ in 0..5 {
        sim.step(0.1);
        fired.extend(sim.events.triggered.iter().cloned());
    }

    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].activator, None);
    assert!(!sim.scene.get(target).unwrap().is_alive());
    let brush = sim.scene.get(trigger).and_then(|e| e.trigger_brush()).unwrap();
    assert_eq!(brush.previous_occupant, None);
    assert_eq!(brush.state(), trigger::TriggerState::Exhausted);
}

#[test]
fn test_exit_trigger_rearms_for_each_departure() {
    let mut brush = TriggerBrush::new("door", EntityEvent::TakeDamage).with_policy(
        TriggerOn::Exit,
        TriggerType::Multiple,
        TriggerBy::All,
    );
    brush.float_value = Some(1.0);
    let (mut sim, player, _trigger, target) = trigger_room(brush);

    assert_eq!(run_counting_damage(&mut sim, target, 3), 0);
    teleport(&mut sim, player, FAR_AWAY);
    assert_eq!(run_counting_damage(&mut sim, target, 3), 1);

    teleport(&mut sim, player, Vec3::ZERO);
    assert_eq!(run_counting_damage(&mut sim, target, 3), 0);
    teleport(&mut sim, player, FAR_AWAY);
    assert_eq!(run_counting_damage(&mut sim, target, 3), 1);
    assert_eq!(health(&sim, target), 498.0);
}

#[test]
fn test_delete_during_scan_removes_target_at_frame_end() {
    let mut scene = Scene::new();
    scene.add_entity(Entity::player(Vec3::ZERO).with_id("player"));
    let trigger = scene.add_entity(Entity::trigger(
        Vec3::ZERO,
        BoundingBox::cube(64.0),
        TriggerBrush::new("victim", EntityEvent::Delete).with_policy(
            TriggerOn::Trigger,
            TriggerType::Multiple,
            TriggerBy::All,
        ),
    ));
    // Inside the volume, after the trigger in the list
    let victim = scene.add_entity(Entity::npc(Vec3::new(10.0, 0.0, 0.0)).with_id("victim"));
    let mut sim = Simulation::new(scene, SimConfig::default());
    sim.spawn_all();

    sim.step(0.1);
    assert!(!sim.scene.contains(victim));
    assert!(!sim.is_registered(victim));
    let removed: Vec<_> = sim.events.removed.iter().collect();
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].id, "victim");
    assert_eq!(sim.events.died.iter().filter(|d| d.entity == victim).count(), 1);

    // The trigger keeps scanning a shorter list without trouble
    sim.step(0.1);
    sim.step(0.1);
    assert!(sim.is_registered(trigger));
    assert_eq!(sim.scene.entity_count(), 2);
}

#[test]
fn test_unknown_target_is_soft_failure() {
    let mut brush = TriggerBrush::new("ghost", EntityEvent::TakeDamage);
    brush.float_value = Some(50.0);
    let (mut sim, player, trigger, target) = trigger_room(brush);

    sim.step(0.1);
    assert!(sim.events.damaged.is_empty());
    assert_eq!(sim.events.triggered.len(), 1);
    assert_eq!(health(&sim, target), 500.0);

    let brush = sim.scene.get(trigger).and_then(|e| e.trigger_brush()).unwrap();
    assert!(brush.has_triggered);
    assert_eq!(brush.previous_occupant, Some(player));
}

#[test]
fn test_demo_map_round_trip_and_play() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("demo.ron");
    world::save_map(&demo_map(), &path).unwrap();

    let scene = world::load_scene(&path).unwrap();
    let ids: Vec<&str> = scene.entities().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids[0], "player");
    assert_eq!(ids[1], "entity 1");
    assert_eq!(ids[2], "entity 2");

    let mut sim = Simulation::new(scene, SimConfig::default());
    assert!(sim.spawn_all().is_empty());
    let player = sim.scene.player_key().unwrap();
    let guard = sim.scene.key_of("entity 1").unwrap();

    let mut renderer = HeadlessRenderer::for_frames(3);
    assert_eq!(sim.run(&mut renderer), 3);
    assert_eq!(health(&sim, guard), 150.0);

    // Into the hurt zone: fires once on entry
    teleport(&mut sim, player, Vec3::new(128.0, 0.0, 0.0));
    sim.step(0.1);
    sim.step(0.1);
    assert_eq!(health(&sim, guard), 110.0);

    // On to the drop zone: the spawner copies its crate
    teleport(&mut sim, player, Vec3::new(256.0, 0.0, 0.0));
    sim.step(0.1);
    assert_eq!(sim.scene.entity_count(), 7);
    let spawned = &sim.scene.entities()[6];
    assert_eq!(spawned.entity_type(), EntityType::Prop);
    assert_eq!(spawned.position, Vec3::new(256.0, 128.0, 0.0));
    assert_eq!(spawned.id, "entity 6");
    assert!(sim.is_registered(spawned.key()));
}

#[test]
fn test_save_after_play_keeps_links_positional() {
    let mut scene = world::load_map_from_str(
        &world::map_to_string(&demo_map(), MapFormat::Ron).unwrap(),
        MapFormat::Ron,
    )
    .unwrap()
    .into_scene();
    let first = scene.entities()[1].key();
    scene.remove_entity_immediate(first);

    let map = world::MapFile::from_scene("after", &mut scene);
    assert_eq!(map.entities.len(), 5);
    assert_eq!(map.entities[0].id, "player");
    // Dropper moved from slot 3 to slot 2; its trigger follows it
    let drop = map.entities[3].trigger_brush().unwrap();
    assert_eq!(drop.target.as_deref(), Some("entity 2"));
}
