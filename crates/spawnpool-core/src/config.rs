//! Pool configuration.
//!
//! [`PoolConfig`] is immutable once built. Construct it directly with
//! [`PoolConfig::new`] for the common single-kind case, or step by step
//! through [`PoolConfig::builder`].

use std::fmt;
use std::rc::Rc;

use crate::distribution::Distribution;
use crate::error::ConfigError;
use crate::host::InstanceFactory;

/// Called once per slot at population time with the slot's kind index.
pub type OnCreate<H> = Rc<dyn Fn(&mut H, &<H as InstanceFactory>::Instance, usize)>;

/// Called on every activation.
pub type OnEnable<H> = Rc<dyn Fn(&mut H, &<H as InstanceFactory>::Instance)>;

/// Immutable pool parameters.
pub struct PoolConfig<H: InstanceFactory> {
    name: String,
    size: usize,
    increment: usize,
    parent: Option<H::Container>,
    on_create: Option<OnCreate<H>>,
    on_enable: Option<OnEnable<H>>,
    distribution: Distribution,
}

impl<H: InstanceFactory> PoolConfig<H> {
    /// Single-kind configuration with no hooks, no parent, no growth.
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            size,
            increment: 0,
            parent: None,
            on_create: None,
            on_enable: None,
            distribution: Distribution::empty(),
        }
    }

    /// Start a fluent builder.
    pub fn builder(name: impl Into<String>) -> PoolConfigBuilder<H> {
        PoolConfigBuilder {
            config: Self::new(name, 0),
        }
    }

    /// Pool name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Initial number of slots.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Slots added per exhaustion (flexible pools only).
    #[inline]
    pub fn increment(&self) -> usize {
        self.increment
    }

    /// Container the pool's own container is parented to.
    #[inline]
    pub fn parent(&self) -> Option<&H::Container> {
        self.parent.as_ref()
    }

    /// Per-kind counts (empty for single-kind pools).
    #[inline]
    pub fn distribution(&self) -> &Distribution {
        &self.distribution
    }

    /// Whether an on-create hook is wired.
    pub fn has_on_create(&self) -> bool {
        self.on_create.is_some()
    }

    /// Whether an on-enable hook is wired.
    pub fn has_on_enable(&self) -> bool {
        self.on_enable.is_some()
    }

    /// Name given to the container the pool creates for its instances.
    pub fn container_name(&self) -> String {
        format!("pool_{}", self.name).to_lowercase()
    }

    pub(crate) fn run_on_create(&self, host: &mut H, instance: &H::Instance, kind: usize) {
        if let Some(hook) = &self.on_create {
            hook(host, instance, kind);
        }
    }

    pub(crate) fn run_on_enable(&self, host: &mut H, instance: &H::Instance) {
        if let Some(hook) = &self.on_enable {
            hook(host, instance);
        }
    }
}

impl<H: InstanceFactory> Clone for PoolConfig<H> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            size: self.size,
            increment: self.increment,
            parent: self.parent.clone(),
            on_create: self.on_create.clone(),
            on_enable: self.on_enable.clone(),
            distribution: self.distribution.clone(),
        }
    }
}

impl<H: InstanceFactory> fmt::Debug for PoolConfig<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfig")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("increment", &self.increment)
            .field("has_parent", &self.parent.is_some())
            .field("on_create", &self.on_create.is_some())
            .field("on_enable", &self.on_enable.is_some())
            .field("distribution", &self.distribution)
            .finish()
    }
}

/// Step-wise assembly of a [`PoolConfig`].
pub struct PoolConfigBuilder<H: InstanceFactory> {
    config: PoolConfig<H>,
}

impl<H: InstanceFactory> PoolConfigBuilder<H> {
    /// Initial size. For fixed pools this is also the maximum.
    pub fn size(mut self, size: usize) -> Self {
        self.config.size = size;
        self
    }

    /// Growth step for flexible pools.
    pub fn increment(mut self, increment: usize) -> Self {
        self.config.increment = increment;
        self
    }

    /// Parent container for the pool's own container.
    pub fn parent(mut self, parent: H::Container) -> Self {
        self.config.parent = Some(parent);
        self
    }

    /// Explicit per-kind counts, e.g. `[50, 50, 20]`. Size becomes the sum.
    pub fn distribution_manual(mut self, counts: impl Into<Vec<usize>>) -> Self {
        self.set_distribution(Distribution::manual(counts));
        self
    }

    /// `kinds` kinds with `value` instances each. Size becomes `kinds * value`.
    pub fn distribution_uniform(mut self, kinds: usize, value: usize) -> Self {
        self.set_distribution(Distribution::uniform(kinds, value));
        self
    }

    /// Front-loaded split of `total` across `kinds`; see [`Distribution::auto`].
    pub fn distribution_auto(mut self, total: usize, kinds: usize) -> Result<Self, ConfigError> {
        self.set_distribution(Distribution::auto(total, kinds)?);
        Ok(self)
    }

    /// Hook run once per slot when its instance is created.
    pub fn on_create<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut H, &H::Instance, usize) + 'static,
    {
        self.config.on_create = Some(Rc::new(hook));
        self
    }

    /// Hook run on every activation.
    pub fn on_enable<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut H, &H::Instance) + 'static,
    {
        self.config.on_enable = Some(Rc::new(hook));
        self
    }

    /// Finish.
    pub fn build(self) -> PoolConfig<H> {
        self.config
    }

    fn set_distribution(&mut self, distribution: Distribution) {
        self.config.size = distribution.total();
        self.config.distribution = distribution;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DistributionFault;
    use crate::testing::{ContainerId, TestWorld};

    #[test]
    fn test_builder_sets_values() {
        let mut world = TestWorld::new();
        let parent = world.create_container("Parent", None);

        let config = PoolConfig::<TestWorld>::builder("TestPool")
            .size(10)
            .parent(parent)
            .increment(5)
            .build();

        assert_eq!(config.name(), "TestPool");
        assert_eq!(config.size(), 10);
        assert_eq!(config.increment(), 5);
        assert_eq!(config.parent(), Some(&parent));
        assert!(config.distribution().is_empty());
        assert!(!config.has_on_create());
        assert!(!config.has_on_enable());
    }

    #[test]
    fn test_manual_distribution_sets_size_to_sum() {
        let config = PoolConfig::<TestWorld>::builder("P")
            .distribution_manual([2, 3, 5])
            .build();
        assert_eq!(config.size(), 10);
        assert_eq!(config.distribution().counts(), &[2, 3, 5]);
    }

    #[test]
    fn test_uniform_distribution_fills() {
        let config = PoolConfig::<TestWorld>::builder("P")
            .distribution_uniform(4, 3)
            .build();
        assert_eq!(config.distribution().counts(), &[3, 3, 3, 3]);
        assert_eq!(config.size(), 12);
    }

    #[test]
    fn test_auto_distribution_with_two_kinds_fails() {
        let result = PoolConfig::<TestWorld>::builder("P").distribution_auto(100, 2);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidDistribution(DistributionFault::TooFewKinds { kinds: 2 }))
        ));
    }

    #[test]
    fn test_auto_distribution_sets_size() {
        let config = PoolConfig::<TestWorld>::builder("P")
            .distribution_auto(100, 3)
            .unwrap()
            .build();
        assert_eq!(config.size(), 100);
        assert_eq!(config.distribution().counts(), &[50, 30, 20]);
    }

    #[test]
    fn test_container_name_is_lowercased() {
        let config: PoolConfig<TestWorld> = PoolConfig::new("Bullets", 4);
        assert_eq!(config.container_name(), "pool_bullets");
    }

    #[test]
    fn test_hooks_are_wired_and_shared_by_clones() {
        let config = PoolConfig::<TestWorld>::builder("P")
            .size(1)
            .on_create(|world, id, kind| world.tag(*id, kind as u32))
            .on_enable(|world, id| world.tag(*id, 99))
            .build();
        let copy = config.clone();
        assert!(copy.has_on_create());
        assert!(copy.has_on_enable());

        let mut world = TestWorld::new();
        let container: ContainerId = world.create_container("c", None);
        let id = world
            .instantiate(&crate::testing::Prefab::Ball, &container)
            .unwrap();

        copy.run_on_create(&mut world, &id, 3);
        assert_eq!(world.entity(id).tag, 3);
        copy.run_on_enable(&mut world, &id);
        assert_eq!(world.entity(id).tag, 99);
    }
}
