//! In-memory host used by unit tests.

use std::collections::HashSet;

use crate::error::SpawnError;
use crate::host::{ActivationHost, InstanceFactory};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntityId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContainerId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Prefab {
    Ball,
    Cube,
    Cone,
    /// Missing the pooled capability.
    Bare,
    /// Capable, but every instantiation fails.
    Flaky,
}

#[derive(Clone, Debug)]
pub struct Entity {
    pub prefab: Prefab,
    pub container: ContainerId,
    pub alive: bool,
    pub active: bool,
    pub position: (i32, i32),
    pub tag: u32,
}

#[derive(Clone, Debug)]
pub struct ContainerRecord {
    pub name: String,
    pub parent: Option<ContainerId>,
    pub alive: bool,
}

#[derive(Debug, Default)]
pub struct TestWorld {
    entities: Vec<Entity>,
    containers: Vec<ContainerRecord>,
    attempts: usize,
    failing: HashSet<usize>,
}

impl TestWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the given (zero-based) instantiation attempts fail.
    pub fn fail_attempts(&mut self, attempts: impl IntoIterator<Item = usize>) {
        self.failing.extend(attempts);
    }

    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id.0 as usize]
    }

    pub fn container(&self, id: ContainerId) -> &ContainerRecord {
        &self.containers[id.0 as usize]
    }

    pub fn deactivate(&mut self, id: EntityId) {
        self.entities[id.0 as usize].active = false;
    }

    /// Destroy behind the pool's back.
    pub fn kill(&mut self, id: EntityId) {
        let entity = &mut self.entities[id.0 as usize];
        entity.alive = false;
        entity.active = false;
    }

    pub fn tag(&mut self, id: EntityId, tag: u32) {
        self.entities[id.0 as usize].tag = tag;
    }

    pub fn spawned(&self) -> usize {
        self.entities.len()
    }

    pub fn live_count(&self) -> usize {
        self.entities.iter().filter(|e| e.alive).count()
    }

    pub fn active_count(&self) -> usize {
        self.entities.iter().filter(|e| e.alive && e.active).count()
    }

    pub fn live_containers(&self) -> usize {
        self.containers.iter().filter(|c| c.alive).count()
    }
}

impl InstanceFactory for TestWorld {
    type Template = Prefab;
    type Instance = EntityId;
    type Container = ContainerId;

    fn has_capability(&self, template: &Prefab) -> bool {
        !matches!(template, Prefab::Bare)
    }

    fn create_container(&mut self, name: &str, parent: Option<&ContainerId>) -> ContainerId {
        self.containers.push(ContainerRecord {
            name: name.to_string(),
            parent: parent.copied(),
            alive: true,
        });
        ContainerId(self.containers.len() as u32 - 1)
    }

    fn instantiate(&mut self, template: &Prefab, container: &ContainerId) -> Result<EntityId, SpawnError> {
        let attempt = self.attempts;
        self.attempts += 1;

        if matches!(template, Prefab::Flaky) || self.failing.contains(&attempt) {
            return Err(SpawnError::new(format!("attempt {attempt} refused")));
        }

        self.entities.push(Entity {
            prefab: *template,
            container: *container,
            alive: true,
            active: true,
            position: (0, 0),
            tag: 0,
        });
        Ok(EntityId(self.entities.len() as u32 - 1))
    }

    fn is_alive(&self, instance: &EntityId) -> bool {
        self.entities
            .get(instance.0 as usize)
            .map_or(false, |e| e.alive)
    }

    fn destroy(&mut self, instance: EntityId) {
        self.kill(instance);
    }

    fn destroy_container(&mut self, container: ContainerId) {
        self.containers[container.0 as usize].alive = false;
    }
}

impl ActivationHost for TestWorld {
    type Placement = (i32, i32);

    fn is_active(&self, instance: &EntityId) -> bool {
        let entity = self.entity(*instance);
        entity.alive && entity.active
    }

    fn set_active(&mut self, instance: &EntityId, active: bool) {
        self.entities[instance.0 as usize].active = active;
    }

    fn place(&mut self, instance: &EntityId, placement: (i32, i32)) {
        self.entities[instance.0 as usize].position = placement;
    }
}
