//! Host collaborator traits.
//!
//! The pool never looks inside instances, templates, containers or
//! placements. Everything it needs from the world goes through these two
//! traits. Handles are shared with the host, which may destroy them at any
//! time; the pool checks [`InstanceFactory::is_alive`] before trusting one.

use crate::error::SpawnError;

/// Creation and destruction of pooled instances.
pub trait InstanceFactory {
    /// What an instance is spawned from (prefab, archetype, blueprint).
    type Template;
    /// Handle to a spawned instance. Equal handles name the same instance.
    type Instance: Clone + PartialEq;
    /// Grouping node that instances are spawned under.
    type Container: Clone;

    /// Whether `template` carries the behaviour the pool hands out.
    ///
    /// Checked for every template before a single instance is created.
    fn has_capability(&self, template: &Self::Template) -> bool;

    /// Create a named container, optionally under `parent`.
    fn create_container(&mut self, name: &str, parent: Option<&Self::Container>) -> Self::Container;

    /// Spawn one instance of `template` inside `container`.
    fn instantiate(
        &mut self,
        template: &Self::Template,
        container: &Self::Container,
    ) -> Result<Self::Instance, SpawnError>;

    /// False once the instance has been destroyed, by the pool or anyone else.
    fn is_alive(&self, instance: &Self::Instance) -> bool;

    /// Destroy an instance immediately.
    fn destroy(&mut self, instance: Self::Instance);

    /// Destroy a container immediately.
    fn destroy_container(&mut self, container: Self::Container);
}

/// Active-state and placement control used at activation time.
pub trait ActivationHost: InstanceFactory {
    /// Opaque placement forwarded on activation (position, transform, cell).
    type Placement;

    /// Whether the instance is currently active in the world.
    fn is_active(&self, instance: &Self::Instance) -> bool;

    /// Activate or deactivate an instance.
    fn set_active(&mut self, instance: &Self::Instance, active: bool);

    /// Apply a placement to an instance.
    fn place(&mut self, instance: &Self::Instance, placement: Self::Placement);
}
