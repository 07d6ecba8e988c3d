//! Pool core.
//!
//! One generic pool serves every variant. The allocation strategy decides
//! how a free slot is found; the capacity policy decides what happens when
//! none is.
//!
//! | variant     | strategy        | capacity   | constructor          |
//! |-------------|-----------------|------------|----------------------|
//! | fixed       | `FreeList<Q>`   | `Fixed`    | [`Pool::fixed`]       |
//! | flexible    | `FreeList<Q>`   | `Growable` | [`Pool::flexible`]    |
//! | distributed | `FreeList<Q>`   | `Fixed`    | [`Pool::distributed`] |
//! | by category | `Categories<K>` | `Fixed`    | [`Pool::by_category`] |
//!
//! Pools hold `Rc` hooks and are neither `Send` nor `Sync`. Drive a pool
//! and its host from a single thread.
//!
//! Deactivation is not routed through the pool: whenever the host marks an
//! instance inactive it becomes eligible again at the next rebuild scan.

use std::fmt::Debug;
use std::hash::Hash;
use std::ops::Range;

use tracing::{debug, info, trace, warn};

use crate::capacity::{CapacityPolicy, Fixed, Growable};
use crate::config::PoolConfig;
use crate::distribution::Distribution;
use crate::error::{ActivateError, ConfigError};
use crate::host::{ActivationHost, InstanceFactory};
use crate::queue::IndexQueue;
use crate::slot::{Reservation, SlotArray};
use crate::strategy::{is_free, Allocation, Categories, FreeList, Miss};

/// Fixed-size pool with a single free list.
pub type FixedPool<H, Q> = Pool<H, FreeList<Q>, Fixed>;

/// Pool that grows by the configured increment on exhaustion.
pub type FlexiblePool<H, Q> = Pool<H, FreeList<Q>, Growable>;

/// Fixed pool with an independent slot range per category key.
pub type CategoryPool<H, K> = Pool<H, Categories<K>, Fixed>;

/// Lifetime counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Successful activations.
    pub activations: u64,
    /// Requests answered with [`ActivateError::Exhausted`].
    pub exhausted: u64,
    /// Free-list rebuild scans.
    pub rebuilds: u64,
    /// Growth events (flexible pools).
    pub growths: u64,
    /// Slots left empty because the host failed to create an instance.
    pub creation_failures: u64,
}

/// Pre-allocated instance pool.
pub struct Pool<H: ActivationHost, A, C = Fixed> {
    config: PoolConfig<H>,
    /// One template per kind.
    templates: Vec<H::Template>,
    slots: SlotArray<H::Instance>,
    strategy: A,
    capacity: C,
    /// Local container all instances are spawned under. `None` once destroyed.
    container: Option<H::Container>,
    /// Set by `destroy_all`; a torn-down pool never repopulates.
    torn_down: bool,
    stats: PoolStats,
}

fn validate_templates<H: InstanceFactory>(host: &H, templates: &[H::Template]) -> Result<(), ConfigError> {
    if templates.is_empty() {
        return Err(ConfigError::EmptyTemplates);
    }
    for (kind, template) in templates.iter().enumerate() {
        if !host.has_capability(template) {
            return Err(ConfigError::InvalidReference { kind });
        }
    }
    Ok(())
}

fn check_distribution(templates: usize, distribution: &Distribution) -> Result<(), ConfigError> {
    if templates != distribution.kinds() {
        return Err(ConfigError::DistributionMismatch {
            templates,
            kinds: distribution.kinds(),
        });
    }
    Ok(())
}

impl<H, A, C> Pool<H, A, C>
where
    H: ActivationHost,
    A: Allocation<H::Instance>,
    C: CapacityPolicy,
{
    fn assemble(
        config: PoolConfig<H>,
        templates: Vec<H::Template>,
        counts: &[usize],
        strategy: A,
        capacity: C,
        host: &mut H,
    ) -> Self {
        let container = host.create_container(&config.container_name(), config.parent());

        let mut pool = Self {
            config,
            templates,
            slots: SlotArray::with_kinds(counts),
            strategy,
            capacity,
            container: Some(container),
            torn_down: false,
            stats: PoolStats::default(),
        };

        let populated = pool.populate(host, 0..pool.slots.len());
        pool.strategy.seed(&populated);

        info!(
            pool = pool.config.name(),
            slots = pool.slots.len(),
            populated = populated.len(),
            kinds = pool.templates.len(),
            "Pool created"
        );
        pool
    }

    /// Instantiate every slot in `range`, returning the indices that succeeded.
    fn populate(&mut self, host: &mut H, range: Range<usize>) -> Vec<usize> {
        let Some(container) = self.container.as_ref() else {
            return Vec::new();
        };

        let mut populated = Vec::with_capacity(range.len());
        for index in range {
            let kind = self.slots.kind(index).unwrap_or(0);
            let template = &self.templates[kind];

            match host.instantiate(template, container) {
                Ok(instance) => {
                    self.config.run_on_create(host, &instance, kind);
                    host.set_active(&instance, false);
                    self.slots.fill(index, instance);
                    populated.push(index);
                }
                Err(err) => {
                    self.stats.creation_failures += 1;
                    warn!(
                        pool = self.config.name(),
                        index,
                        kind,
                        error = %err,
                        "Instance creation failed, slot left empty"
                    );
                }
            }
        }
        populated
    }

    #[inline]
    fn exhausted(&mut self) -> ActivateError {
        self.stats.exhausted += 1;
        ActivateError::Exhausted
    }

    fn select(&mut self, key: &A::Key, host: &mut H) -> Result<usize, ActivateError> {
        match self.strategy.select(key, &self.slots, &*host) {
            Ok(index) => Ok(index),
            Err(Miss::Exhausted) => self.grow_and_retry(key, host),
            Err(Miss::Stale { index }) => {
                warn!(pool = self.config.name(), index, "Free slot holds a destroyed instance");
                Err(self.exhausted())
            }
            Err(Miss::UnknownCategory) => Err(ActivateError::UnknownCategory),
        }
    }

    fn grow_and_retry(&mut self, key: &A::Key, host: &mut H) -> Result<usize, ActivateError> {
        let increment = self.capacity.increment();
        if increment == 0 || self.torn_down {
            debug!(pool = self.config.name(), capacity = self.slots.len(), "Pool exhausted");
            return Err(self.exhausted());
        }

        let previous = self.slots.len();
        let range = self.slots.grow(increment, 0);
        let populated = self.populate(host, range);
        if populated.is_empty() {
            self.slots.truncate(previous);
            warn!(pool = self.config.name(), increment, "Growth produced no instances");
            return Err(self.exhausted());
        }

        self.stats.growths += 1;
        info!(
            pool = self.config.name(),
            added = populated.len(),
            capacity = self.slots.len(),
            "Pool grown"
        );

        self.strategy.seed(&populated);
        match self.strategy.select(key, &self.slots, &*host) {
            Ok(index) => Ok(index),
            Err(Miss::UnknownCategory) => Err(ActivateError::UnknownCategory),
            Err(_) => Err(self.exhausted()),
        }
    }

    /// Place, activate and run the enable hook on the instance at `index`.
    fn enable(&mut self, index: usize, host: &mut H, placement: H::Placement) -> Result<H::Instance, ActivateError> {
        let live = self
            .slots
            .instance(index)
            .filter(|instance| host.is_alive(instance))
            .cloned();
        let Some(instance) = live else {
            warn!(pool = self.config.name(), index, "Cannot enable a destroyed instance");
            return Err(self.exhausted());
        };

        host.place(&instance, placement);
        host.set_active(&instance, true);
        self.config.run_on_enable(host, &instance);
        self.stats.activations += 1;
        trace!(pool = self.config.name(), index, "Activated");
        Ok(instance)
    }

    fn activate_in(
        &mut self,
        key: &A::Key,
        host: &mut H,
        placement: H::Placement,
    ) -> Result<H::Instance, ActivateError> {
        let index = self.select(key, host)?;
        self.enable(index, host, placement)
    }

    fn reserve_in(&mut self, key: &A::Key, host: &mut H) -> Result<Reservation<H::Instance>, ActivateError> {
        let index = self.select(key, host)?;
        let Some(instance) = self.slots.instance(index).cloned() else {
            return Err(self.exhausted());
        };
        if !self.slots.reserve(index) {
            return Err(self.exhausted());
        }
        trace!(pool = self.config.name(), index, "Reserved");
        Ok(Reservation::new(index, instance))
    }

    /// Second half of two-phase activation.
    ///
    /// Applies the placement, marks the instance active and runs the
    /// enable hook. Fails with `Exhausted` if the reservation no longer
    /// holds (the pool was torn down) or the instance was destroyed in the
    /// meantime.
    pub fn commit_enable(
        &mut self,
        host: &mut H,
        reservation: Reservation<H::Instance>,
        placement: H::Placement,
    ) -> Result<H::Instance, ActivateError> {
        if !self.holds(&reservation) {
            return Err(self.exhausted());
        }
        let index = reservation.index();
        self.slots.unreserve(index);
        self.enable(index, host, placement)
    }

    /// Give a reserved slot back without enabling it.
    ///
    /// The slot is picked up again by the next rebuild or scan. A token this
    /// pool did not issue is ignored.
    pub fn cancel_reservation(&mut self, reservation: Reservation<H::Instance>) {
        if self.holds(&reservation) {
            self.slots.unreserve(reservation.index());
        }
    }

    /// Whether `reservation` was issued by this pool and is still outstanding.
    fn holds(&self, reservation: &Reservation<H::Instance>) -> bool {
        self.slots.get(reservation.index()).map_or(false, |slot| {
            slot.is_reserved() && slot.instance() == Some(reservation.instance())
        })
    }

    /// Destroy every live instance and clear all slots.
    ///
    /// With `also_destroy_container` the pool's container is destroyed as
    /// well. Calling this again is a no-op.
    pub fn destroy_all(&mut self, host: &mut H, also_destroy_container: bool) {
        let mut destroyed = 0usize;
        for instance in self.slots.drain_instances() {
            if host.is_alive(&instance) {
                host.destroy(instance);
                destroyed += 1;
            }
        }
        self.strategy.clear();
        self.torn_down = true;

        if also_destroy_container {
            if let Some(container) = self.container.take() {
                host.destroy_container(container);
            }
        }

        info!(
            pool = self.config.name(),
            destroyed,
            container = self.container.is_some(),
            "Pool torn down"
        );
    }

    /// Configuration the pool was built from.
    #[inline]
    pub fn config(&self) -> &PoolConfig<H> {
        &self.config
    }

    /// Pool name.
    #[inline]
    pub fn name(&self) -> &str {
        self.config.name()
    }

    /// All slots, populated or not.
    #[inline]
    pub fn slots(&self) -> &SlotArray<H::Instance> {
        &self.slots
    }

    /// Every instance currently held, active or not.
    pub fn instances(&self) -> impl Iterator<Item = &H::Instance> + '_ {
        self.slots.instances()
    }

    /// Number of slots. Never decreases.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Kind of the slot at `index`.
    #[inline]
    pub fn kind_of(&self, index: usize) -> Option<usize> {
        self.slots.kind(index)
    }

    /// Instances that could be handed out right now (live, inactive, unreserved).
    pub fn available(&self, host: &H) -> usize {
        (0..self.slots.len())
            .filter(|&index| is_free(&self.slots, index, host))
            .count()
    }

    /// The pool's own container, until destroyed.
    #[inline]
    pub fn container(&self) -> Option<&H::Container> {
        self.container.as_ref()
    }

    /// Lifetime counters.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            rebuilds: self.strategy.rebuilds(),
            ..self.stats
        }
    }
}

impl<H: ActivationHost, Q: IndexQueue> Pool<H, FreeList<Q>, Fixed> {
    /// Fixed pool of `config.size()` instances of one template.
    ///
    /// # Errors
    /// [`ConfigError::InvalidReference`] if the template lacks the pooled
    /// capability. Nothing is created in that case.
    pub fn fixed(
        config: PoolConfig<H>,
        template: H::Template,
        queue: Q,
        host: &mut H,
    ) -> Result<Self, ConfigError> {
        let templates = vec![template];
        validate_templates(host, &templates)?;

        let size = config.size();
        Ok(Self::assemble(config, templates, &[size], FreeList::new(queue), Fixed, host))
    }

    /// Fixed pool of several kinds sharing one free list.
    ///
    /// `templates[k]` populates `config.distribution().counts()[k]` slots,
    /// laid out kind by kind.
    ///
    /// # Errors
    /// [`ConfigError::DistributionMismatch`] if the template count differs
    /// from the distribution length, [`ConfigError::InvalidReference`] for
    /// an incapable template.
    pub fn distributed(
        config: PoolConfig<H>,
        templates: Vec<H::Template>,
        queue: Q,
        host: &mut H,
    ) -> Result<Self, ConfigError> {
        validate_templates(host, &templates)?;
        check_distribution(templates.len(), config.distribution())?;

        let counts = config.distribution().counts().to_vec();
        Ok(Self::assemble(config, templates, &counts, FreeList::new(queue), Fixed, host))
    }
}

impl<H: ActivationHost, Q: IndexQueue> Pool<H, FreeList<Q>, Growable> {
    /// Pool that grows by `config.increment()` slots whenever it runs out.
    pub fn flexible(
        config: PoolConfig<H>,
        template: H::Template,
        queue: Q,
        host: &mut H,
    ) -> Result<Self, ConfigError> {
        let templates = vec![template];
        validate_templates(host, &templates)?;

        let size = config.size();
        let capacity = Growable::new(config.increment());
        Ok(Self::assemble(config, templates, &[size], FreeList::new(queue), capacity, host))
    }
}

impl<H, Q, C> Pool<H, FreeList<Q>, C>
where
    H: ActivationHost,
    Q: IndexQueue,
    C: CapacityPolicy,
{
    /// Activate any free instance at `placement`.
    #[inline]
    pub fn try_activate(&mut self, host: &mut H, placement: H::Placement) -> Result<H::Instance, ActivateError> {
        self.activate_in(&(), host, placement)
    }

    /// Take a free instance off the free list without enabling it.
    #[inline]
    pub fn select_and_reserve(&mut self, host: &mut H) -> Result<Reservation<H::Instance>, ActivateError> {
        self.reserve_in(&(), host)
    }

    /// Indices currently cached in the free list.
    #[inline]
    pub fn queued(&self) -> usize {
        self.strategy.queue().count()
    }
}

impl<H, K> Pool<H, Categories<K>, Fixed>
where
    H: ActivationHost,
    K: Eq + Hash + Clone + Debug,
{
    /// Fixed pool keyed by category.
    ///
    /// `templates` is an ordered list of `(key, template)` pairs; the
    /// configured distribution gives each category's size in the same
    /// order.
    ///
    /// # Errors
    /// [`ConfigError::DistributionMismatch`], [`ConfigError::InvalidReference`],
    /// or [`ConfigError::DuplicateCategory`] if a key repeats.
    pub fn by_category(
        config: PoolConfig<H>,
        templates: Vec<(K, H::Template)>,
        host: &mut H,
    ) -> Result<Self, ConfigError> {
        let (keys, templates): (Vec<K>, Vec<H::Template>) = templates.into_iter().unzip();
        validate_templates(host, &templates)?;
        check_distribution(templates.len(), config.distribution())?;

        let categories = Categories::new(
            keys.into_iter()
                .zip(config.distribution().ranges().map(|(_, range)| range)),
        )
        .map_err(|position| ConfigError::DuplicateCategory { position })?;

        let counts = config.distribution().counts().to_vec();
        Ok(Self::assemble(config, templates, &counts, categories, Fixed, host))
    }

    /// Activate the first free instance of category `key`.
    #[inline]
    pub fn try_activate(
        &mut self,
        key: &K,
        host: &mut H,
        placement: H::Placement,
    ) -> Result<H::Instance, ActivateError> {
        self.activate_in(key, host, placement)
    }

    /// Reserve the first free instance of category `key`.
    #[inline]
    pub fn select_and_reserve(&mut self, key: &K, host: &mut H) -> Result<Reservation<H::Instance>, ActivateError> {
        self.reserve_in(key, host)
    }

    /// Slot range owned by `key`.
    pub fn range_of(&self, key: &K) -> Option<Range<usize>> {
        self.strategy.range_of(key)
    }

    /// Category keys in population order.
    pub fn categories(&self) -> impl Iterator<Item = &K> + '_ {
        self.strategy.keys()
    }
}
