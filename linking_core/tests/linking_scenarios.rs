//! End-to-end scenarios: a catalog and link configuration loaded from text,
//! a `WorldState` host, and transitions fed back until the world settles.

use std::sync::Arc;

use linking_core::{LinkContext, LinkError, LinkManager, LinkingConfig, MasterRef};
use world_rules::{EntityId, LinkHost, SpawnId, TemplateId, WorldCatalog, WorldState};

const CATALOG: &str = r#"{
    "templates": [
        { "id": 10, "name": "Warlord", "bounding_radius": 1.5, "respawn_delay": 600 },
        { "id": 11, "name": "Bodyguard", "bounding_radius": 0.5, "respawn_delay": 60 },
        { "id": 12, "name": "Looter", "bounding_radius": 0.5, "respawn_delay": 60 }
    ],
    "maps": [ { "id": 0, "name": "Keep" } ],
    "spawns": [
        { "id": 1, "template": 10, "map": 0, "position": { "x": 0.0, "y": 0.0, "z": 0.0 } },
        { "id": 2, "template": 11, "map": 0, "position": { "x": 5.0, "y": 0.0, "z": 0.0 } },
        { "id": 3, "template": 11, "map": 0, "position": { "x": -5.0, "y": 0.0, "z": 0.0 } },
        { "id": 4, "template": 11, "map": 0, "position": { "x": 200.0, "y": 0.0, "z": 0.0 } },
        { "id": 5, "template": 12, "map": 0, "position": { "x": 0.0, "y": 8.0, "z": 0.0 } }
    ]
}"#;

const WARLORD: TemplateId = TemplateId(10);

struct Scenario {
    context: LinkContext,
    world: WorldState,
}

impl Scenario {
    fn new(links: &str) -> Self {
        let catalog = WorldCatalog::from_json(CATALOG).unwrap();
        let config = LinkingConfig::from_toml_str(links).unwrap();
        let (manager, report) = LinkManager::load(&config, &catalog);
        assert!(report.rejected.is_empty(), "{:?}", report.rejected);
        Self {
            context: LinkContext::new(Arc::new(manager)),
            world: WorldState::new(catalog, world_rules::MapId(0)),
        }
    }

    /// Spawn every row the gate lets through.
    fn populate(&mut self) -> Vec<SpawnId> {
        let rows: Vec<SpawnId> = (1..=5).map(SpawnId).collect();
        let mut spawned = Vec::new();
        for spawn in rows {
            if !self.context.can_spawn_spawn_id(&self.world, spawn) {
                continue;
            }
            if let Some(id) = self.world.spawn(spawn) {
                let creature = self.world.creature(id).unwrap();
                self.context.on_spawned(&creature);
                spawned.push(spawn);
            }
        }
        spawned
    }

    fn id(&self, spawn: u32) -> EntityId {
        self.world.creature_by_spawn(SpawnId(spawn)).unwrap().id
    }

    /// Apply queued requests and report the transitions until nothing is left.
    fn settle(&mut self) {
        for _ in 0..16 {
            let transitions = self.world.apply_pending();
            if transitions.is_empty() {
                return;
            }
            for transition in transitions {
                self.context.notify(&mut self.world, transition);
            }
        }
        panic!("world did not settle");
    }
}

#[test]
fn test_pull_wipe_and_reset() {
    let mut scenario = Scenario::new(
        r#"
        [[template_link]]
        slave_template = 11
        map = 0
        master_template = 10
        flags = ["AGGRO_ON_AGGRO", "RESPAWN_ON_EVADE", "FOLLOW"]
        search_range = 50
        "#,
    );
    assert_eq!(scenario.populate().len(), 5);
    let warlord = scenario.id(1);
    let (left, right, distant) = (scenario.id(2), scenario.id(3), scenario.id(4));
    let enemy = EntityId::new();

    // Pull.
    assert!(scenario.world.attack_start(warlord, enemy));
    scenario.context.on_aggro(&mut scenario.world, warlord, enemy);
    assert!(scenario.world.creature(left).unwrap().in_combat);
    assert!(scenario.world.creature(right).unwrap().in_combat);
    assert!(!scenario.world.creature(distant).unwrap().in_combat);

    // One bodyguard falls, then the warlord resets.
    scenario.world.die(left);
    scenario.context.on_death(&mut scenario.world, left);
    assert!(scenario.world.enter_evade_mode(warlord));
    scenario.context.on_evade(&mut scenario.world, warlord);
    scenario.settle();

    let revived = scenario.world.creature(left).unwrap();
    assert!(revived.is_alive());
    let directive = scenario.world.following(left).unwrap();
    assert_eq!(directive.leader, warlord);
    assert!((directive.distance - 3.0).abs() < 1e-4);
}

#[test]
fn test_dynamic_spawning_recreates_bodyguards() {
    let mut scenario = Scenario::new(
        r#"
        [[template_link]]
        slave_template = 11
        map = 0
        master_template = 10
        flags = ["DESPAWN_ON_DEATH", "RESPAWN_ON_RESPAWN"]
        search_range = 50
        "#,
    );
    scenario.world.dynamic_spawning = true;
    scenario.populate();
    let warlord = scenario.id(1);
    let old_left = scenario.id(2);

    scenario.world.die(warlord);
    scenario.context.on_death(&mut scenario.world, warlord);
    scenario.settle();
    assert!(scenario.world.creature_by_spawn(SpawnId(2)).is_none());
    assert!(scenario.world.creature_by_spawn(SpawnId(3)).is_none());
    assert!(scenario.world.creature_by_spawn(SpawnId(4)).is_some());

    scenario.world.respawn(warlord);
    scenario.settle();

    let new_left = scenario.id(2);
    assert_ne!(new_left, old_left);
    assert!(scenario.world.creature(new_left).unwrap().is_alive());
    assert!(scenario.world.creature_by_spawn(SpawnId(3)).unwrap().is_alive());

    let groups = scenario.context.index().groups_for(&MasterRef::Template(WARLORD));
    assert_eq!(groups.len(), 1);
    assert!(groups[0].contains(new_left));
    assert!(!groups[0].contains(old_left));
}

#[test]
fn test_looter_only_appears_while_warlord_is_down() {
    let mut scenario = Scenario::new(
        r#"
        [[template_link]]
        slave_template = 12
        map = 0
        master_template = 10
        flags = ["CANT_SPAWN_IF_BOSS_ALIVE"]
        "#,
    );
    let spawned = scenario.populate();
    assert!(!spawned.contains(&SpawnId(5)));

    let warlord = scenario.id(1);
    scenario.world.die(warlord);
    assert!(scenario.context.can_spawn_spawn_id(&scenario.world, SpawnId(5)));

    scenario.world.advance_time(600);
    assert!(!scenario.context.can_spawn_spawn_id(&scenario.world, SpawnId(5)));
}

#[test]
fn test_bad_rows_are_reported_and_skipped() {
    let catalog = WorldCatalog::from_json(CATALOG).unwrap();
    let config = LinkingConfig::from_toml_str(
        r#"
        [[template_link]]
        slave_template = 11
        map = 0
        master_template = 10
        flags = ["AGGRO_ON_AGGRO"]

        [[template_link]]
        slave_template = 12
        map = 0
        master_template = 99
        flags = 1

        [[template_link]]
        slave_template = 12
        map = 0
        master_template = 11
        flags = ["FOLLOW"]

        [[instance_link]]
        slave_spawn = 5
        master_spawn = 1
        flags = 0x8000

        [[instance_link]]
        slave_spawn = 3
        master_spawn = 3
        flags = ["DESPAWN_ON_RESPAWN"]
        "#,
    )
    .unwrap();

    let (manager, report) = LinkManager::load(&config, &catalog);
    assert_eq!(report.accepted(), 1);
    let reasons: Vec<LinkError> = report.rejected.iter().map(|r| r.reason.clone()).collect();
    assert_eq!(
        reasons,
        vec![
            LinkError::UnknownMasterTemplate(TemplateId(99)),
            LinkError::AmbiguousMaster {
                master: TemplateId(11),
                map: world_rules::MapId(0),
            },
            LinkError::FlagsOutOfRange(0x8000),
            LinkError::SelfDespawnOnRespawn,
        ]
    );
    assert_eq!(manager.registry().len(), 1);
}
