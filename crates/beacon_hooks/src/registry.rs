//! The hook registry.
//!
//! [`HookRegistry`] holds the ordered set of active hooks. Registration order
//! is invocation order and survives removals without gaps.
//!
//! # Concurrency
//!
//! The ordering and its identifier index live together in an immutable
//! [`Snapshot`] published through an [`ArcSwap`]. Readers (dispatch,
//! [`get`](HookRegistry::get), [`list`](HookRegistry::list),
//! [`len`](HookRegistry::len)) perform a single atomic load and never wait on
//! a writer. Writers ([`add`](HookRegistry::add),
//! [`remove`](HookRegistry::remove), [`clear`](HookRegistry::clear)) are
//! serialised by one mutex, build a fresh snapshot and swap it in. A reader
//! holding a snapshot keeps seeing exactly that ordering even if writers race.
//!
//! Published hooks are never called while the writer lock is held. A hook
//! being added receives the current options under the lock, after the
//! duplicate check, so it cannot miss a concurrent
//! [`set_options`](HookRegistry::set_options).
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use beacon_hooks::{Hook, HookRegistry, RegistryError};
//!
//! struct Named(&'static str);
//!
//! impl Hook for Named {
//!     fn id(&self) -> &str {
//!         self.0
//!     }
//! }
//!
//! let registry = HookRegistry::new();
//! registry.add(Arc::new(Named("audit")))?;
//! registry.add(Arc::new(Named("limits")))?;
//!
//! assert_eq!(registry.len(), 2);
//! assert!(matches!(
//!     registry.add(Arc::new(Named("audit"))),
//!     Err(RegistryError::DuplicateHook(_))
//! ));
//!
//! registry.remove("audit")?;
//! assert_eq!(registry.list()[0].id(), "limits");
//! # Ok::<(), RegistryError>(())
//! ```

use core::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};

use crate::error::{HookError, RegistryError};
use crate::event::{Event, EventSet};
use crate::hook::{Hook, HookOptions};

// ─────────────────────────────────────────────────────────────────────────────
// Snapshot
// ─────────────────────────────────────────────────────────────────────────────

/// An immutable view of the registry at one point in time.
///
/// Obtained from [`HookRegistry::snapshot`]. Never changes after creation.
#[derive(Default)]
pub struct Snapshot {
    hooks: Vec<Arc<dyn Hook>>,
    index: HashMap<String, usize>,
}

impl Snapshot {
    fn from_hooks(hooks: Vec<Arc<dyn Hook>>) -> Self {
        let index = hooks
            .iter()
            .enumerate()
            .map(|(position, hook)| (hook.id().to_owned(), position))
            .collect();
        Self { hooks, index }
    }

    /// Returns the hooks in registration order.
    #[must_use]
    pub fn hooks(&self) -> &[Arc<dyn Hook>] {
        &self.hooks
    }

    /// Returns the hook with the given identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Hook>> {
        self.index.get(id).map(|&position| &self.hooks[position])
    }

    /// Returns the registration position of the hook with the given identifier.
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Returns the number of hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Returns whether the snapshot holds no hooks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Iterates, in registration order, the hooks that provide `event`.
    pub fn providing(&self, event: Event) -> impl Iterator<Item = &Arc<dyn Hook>> {
        self.hooks.iter().filter(move |hook| hook.provides(event))
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.hooks.iter().map(|hook| hook.id()))
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HookRegistry
// ─────────────────────────────────────────────────────────────────────────────

/// Concurrency-safe, ordered catalog of hooks with identifier lookup.
pub struct HookRegistry {
    /// Current published ordering and index.
    snapshot: ArcSwap<Snapshot>,
    /// Serialises structural changes.
    writer: Mutex<()>,
    /// Options forwarded to hooks as they are added.
    options: RwLock<HookOptions>,
    /// Serialises option updates so hooks see them in order.
    options_writer: Mutex<()>,
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &*self.snapshot.load())
            .finish()
    }
}

impl HookRegistry {
    /// Creates an empty registry with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(HookOptions::default())
    }

    /// Creates an empty registry that forwards `options` to every added hook.
    #[must_use]
    pub fn with_options(options: HookOptions) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(Snapshot::default()),
            writer: Mutex::new(()),
            options: RwLock::new(options),
            options_writer: Mutex::new(()),
        }
    }

    /// Registers a hook at the end of the ordering.
    ///
    /// The hook receives the registry's current options via
    /// [`Hook::set_options`] before it becomes visible to dispatch. A rejected
    /// hook receives nothing.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::InvalidHook`] if the hook's identifier is empty.
    /// - [`RegistryError::DuplicateHook`] if the identifier is already registered.
    pub fn add(&self, hook: Arc<dyn Hook>) -> Result<(), RegistryError> {
        validate(hook.as_ref())?;
        self.publish(hook, None)
    }

    /// Initialises a hook with `config` and registers it.
    ///
    /// Options are forwarded before [`Hook::init`] runs, and again on
    /// registration if they changed in between. The hook is not registered if
    /// initialisation fails.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::Registry`] for the conditions listed on
    /// [`add`](Self::add), or the error returned by [`Hook::init`].
    pub fn add_with_config(
        &self,
        hook: Arc<dyn Hook>,
        config: &serde_json::Value,
    ) -> Result<(), HookError> {
        validate(hook.as_ref())?;
        if self.snapshot.load().index.contains_key(hook.id()) {
            return Err(RegistryError::DuplicateHook(hook.id().to_owned()).into());
        }

        let options = self.options.read().clone();
        hook.set_options(&options);
        hook.init(config)?;
        self.publish(hook, Some(&options))?;
        Ok(())
    }

    /// Appends `hook` under the writer lock. `forwarded` is the options the
    /// hook has already been given, if any.
    fn publish(
        &self,
        hook: Arc<dyn Hook>,
        forwarded: Option<&HookOptions>,
    ) -> Result<(), RegistryError> {
        let _writer = self.writer.lock();
        let current = self.snapshot.load();

        if current.index.contains_key(hook.id()) {
            return Err(RegistryError::DuplicateHook(hook.id().to_owned()));
        }

        // The hook is not visible yet, so calling it here cannot block dispatch.
        let options = self.options.read().clone();
        if forwarded != Some(&options) {
            hook.set_options(&options);
        }

        let mut hooks = Vec::with_capacity(current.hooks.len() + 1);
        hooks.extend(current.hooks.iter().cloned());
        hooks.push(Arc::clone(&hook));
        self.snapshot.store(Arc::new(Snapshot::from_hooks(hooks)));

        tracing::info!(hook = %hook.id(), position = current.hooks.len(), "hook added");
        Ok(())
    }

    /// Removes a hook and returns it.
    ///
    /// Hooks after it shift down one position. [`Hook::stop`] is not called;
    /// that is left to the owner of the returned hook.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::HookNotFound`] if no hook has this identifier.
    pub fn remove(&self, id: &str) -> Result<Arc<dyn Hook>, RegistryError> {
        let _writer = self.writer.lock();
        let current = self.snapshot.load();

        let position = current
            .position(id)
            .ok_or_else(|| RegistryError::HookNotFound(id.to_owned()))?;

        let mut hooks = current.hooks.clone();
        let removed = hooks.remove(position);
        self.snapshot.store(Arc::new(Snapshot::from_hooks(hooks)));

        tracing::info!(hook = %id, position, "hook removed");
        Ok(removed)
    }

    /// Removes every hook, calling [`Hook::stop`] on each.
    ///
    /// Stop failures are logged and do not interrupt the cleanup of the
    /// remaining hooks.
    pub fn clear(&self) {
        let previous = {
            let _writer = self.writer.lock();
            self.snapshot.swap(Arc::new(Snapshot::default()))
        };

        for hook in previous.hooks() {
            if let Err(error) = hook.stop() {
                tracing::warn!(hook = %hook.id(), %error, "hook failed to stop");
            }
        }

        tracing::info!(count = previous.len(), "hooks cleared");
    }

    /// Replaces the registry's options and forwards them to every hook.
    ///
    /// Hooks added concurrently receive either these options on registration
    /// or the forwarded copy, never a stale value.
    pub fn set_options(&self, options: HookOptions) {
        let _serial = self.options_writer.lock();
        let snapshot = {
            let _writer = self.writer.lock();
            *self.options.write() = options.clone();
            self.snapshot.load_full()
        };

        for hook in snapshot.hooks() {
            hook.set_options(&options);
        }
    }

    /// Returns the registry's current options.
    #[must_use]
    pub fn options(&self) -> HookOptions {
        self.options.read().clone()
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    /// Returns the hook with the given identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<dyn Hook>> {
        self.snapshot.load().get(id).cloned()
    }

    /// Returns an independent copy of the hooks in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<Arc<dyn Hook>> {
        self.snapshot.load().hooks.clone()
    }

    /// Returns the number of registered hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    /// Returns whether no hook is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot.load().is_empty()
    }

    /// Returns whether any registered hook provides any of `events`.
    #[must_use]
    pub fn provides_any(&self, events: EventSet) -> bool {
        self.snapshot
            .load()
            .hooks()
            .iter()
            .any(|hook| events.iter().any(|event| hook.provides(event)))
    }
}

fn validate(hook: &dyn Hook) -> Result<(), RegistryError> {
    if hook.id().is_empty() {
        return Err(RegistryError::InvalidHook(
            "hook identifier must not be empty".to_owned(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

    /// `last_qos` value before any options arrive.
    const NO_OPTIONS: u8 = u8::MAX;

    struct TestHook {
        id: String,
        stops: AtomicUsize,
        fail_stop: bool,
        options_seen: AtomicUsize,
        last_qos: AtomicU8,
        provided: EventSet,
    }

    impl TestHook {
        fn new(id: &str) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_owned(),
                stops: AtomicUsize::new(0),
                fail_stop: false,
                options_seen: AtomicUsize::new(0),
                last_qos: AtomicU8::new(NO_OPTIONS),
                provided: EventSet::EMPTY,
            })
        }

        fn failing_stop(id: &str) -> Arc<Self> {
            Arc::new(Self {
                fail_stop: true,
                ..Arc::into_inner(Self::new(id)).unwrap()
            })
        }

        fn providing(id: &str, provided: EventSet) -> Arc<Self> {
            Arc::new(Self {
                provided,
                ..Arc::into_inner(Self::new(id)).unwrap()
            })
        }
    }

    impl Hook for TestHook {
        fn id(&self) -> &str {
            &self.id
        }

        fn provides(&self, event: Event) -> bool {
            self.provided.contains(event)
        }

        fn init(&self, config: &serde_json::Value) -> Result<(), HookError> {
            if config.get("reject").is_some() {
                return Err(HookError::init(&self.id, "rejected config"));
            }
            Ok(())
        }

        fn stop(&self) -> Result<(), HookError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            if self.fail_stop {
                return Err(HookError::storage("stop failed"));
            }
            Ok(())
        }

        fn set_options(&self, options: &HookOptions) {
            self.options_seen.fetch_add(1, Ordering::SeqCst);
            self.last_qos.store(options.capabilities.maximum_qos, Ordering::SeqCst);
        }
    }

    fn ids(registry: &HookRegistry) -> Vec<String> {
        registry
            .list()
            .iter()
            .map(|hook| hook.id().to_owned())
            .collect()
    }

    #[test]
    fn add_appends_in_order() {
        let registry = HookRegistry::new();
        for id in ["a", "b", "c"] {
            registry.add(TestHook::new(id)).expect("add should succeed");
        }

        assert_eq!(registry.len(), 3);
        assert_eq!(ids(&registry), vec!["a", "b", "c"]);
        assert_eq!(registry.snapshot().position("c"), Some(2));
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let registry = HookRegistry::new();
        registry.add(TestHook::new("dup")).unwrap();

        let result = registry.add(TestHook::new("dup"));

        assert_eq!(result.unwrap_err(), RegistryError::DuplicateHook("dup".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn empty_identifier_is_invalid() {
        let registry = HookRegistry::new();
        let result = registry.add(TestHook::new(""));
        assert!(matches!(result, Err(RegistryError::InvalidHook(_))));
        assert!(registry.is_empty());
    }

    #[test]
    fn remove_reindexes_without_gaps() {
        let registry = HookRegistry::new();
        for id in ["a", "b", "c", "d"] {
            registry.add(TestHook::new(id)).unwrap();
        }

        let removed = registry.remove("b").expect("remove should succeed");

        assert_eq!(removed.id(), "b");
        assert_eq!(ids(&registry), vec!["a", "c", "d"]);
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.position("a"), Some(0));
        assert_eq!(snapshot.position("c"), Some(1));
        assert_eq!(snapshot.position("d"), Some(2));
        assert_eq!(snapshot.position("b"), None);
        assert_eq!(registry.get("d").unwrap().id(), "d");
    }

    #[test]
    fn remove_unknown_hook_fails() {
        let registry = HookRegistry::new();
        let result = registry.remove("missing");
        assert!(matches!(result, Err(RegistryError::HookNotFound(id)) if id == "missing"));
    }

    #[test]
    fn snapshot_is_unaffected_by_later_changes() {
        let registry = HookRegistry::new();
        registry.add(TestHook::new("a")).unwrap();
        registry.add(TestHook::new("b")).unwrap();

        let snapshot = registry.snapshot();
        registry.remove("a").unwrap();
        registry.add(TestHook::new("c")).unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.hooks()[0].id(), "a");
        assert_eq!(snapshot.position("b"), Some(1));
        assert_eq!(ids(&registry), vec!["b", "c"]);
    }

    #[test]
    fn list_is_an_independent_copy() {
        let registry = HookRegistry::new();
        registry.add(TestHook::new("a")).unwrap();

        let listed = registry.list();
        registry.clear();

        assert_eq!(listed.len(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn clear_stops_every_hook_even_when_one_fails() {
        let registry = HookRegistry::new();
        let first = TestHook::failing_stop("first");
        let second = TestHook::new("second");
        registry.add(first.clone()).unwrap();
        registry.add(second.clone()).unwrap();

        registry.clear();

        assert!(registry.is_empty());
        assert_eq!(first.stops.load(Ordering::SeqCst), 1);
        assert_eq!(second.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn add_with_config_does_not_register_on_init_failure() {
        let registry = HookRegistry::new();

        let result =
            registry.add_with_config(TestHook::new("cfg"), &serde_json::json!({ "reject": true }));
        assert!(matches!(result, Err(HookError::Init { .. })));
        assert!(registry.is_empty());

        registry
            .add_with_config(TestHook::new("cfg"), &serde_json::json!({}))
            .expect("valid config should register");
        assert_eq!(registry.len(), 1);

        let duplicate = registry.add_with_config(TestHook::new("cfg"), &serde_json::Value::Null);
        assert!(matches!(
            duplicate,
            Err(HookError::Registry(RegistryError::DuplicateHook(_)))
        ));
    }

    #[test]
    fn options_are_forwarded_on_add_and_update() {
        let registry = HookRegistry::new();
        let hook = TestHook::new("opts");
        registry.add(hook.clone()).unwrap();
        assert_eq!(hook.options_seen.load(Ordering::SeqCst), 1);

        let mut options = HookOptions::default();
        options.capabilities.maximum_qos = 1;
        registry.set_options(options.clone());

        assert_eq!(hook.options_seen.load(Ordering::SeqCst), 2);
        assert_eq!(registry.options(), options);
    }

    #[test]
    fn rejected_duplicate_receives_no_options() {
        let registry = HookRegistry::new();
        registry.add(TestHook::new("dup")).unwrap();
        let duplicate = TestHook::new("dup");

        assert!(registry.add(duplicate.clone()).is_err());

        assert_eq!(duplicate.options_seen.load(Ordering::SeqCst), 0);
        assert_eq!(duplicate.last_qos.load(Ordering::SeqCst), NO_OPTIONS);
    }

    #[test]
    fn add_with_config_skips_unchanged_options_on_registration() {
        let registry = HookRegistry::new();
        let hook = TestHook::new("cfg");

        registry.add_with_config(hook.clone(), &serde_json::Value::Null).unwrap();

        assert_eq!(hook.options_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn hooks_added_during_option_updates_end_with_the_latest() {
        const ADDERS: usize = 4;
        const PER_ADDER: usize = 50;

        let registry = HookRegistry::new();
        let options = |qos| {
            let mut options = HookOptions::default();
            options.capabilities.maximum_qos = qos;
            options
        };

        let added: Vec<Arc<TestHook>> = std::thread::scope(|scope| {
            let adders: Vec<_> = (0..ADDERS)
                .map(|a| {
                    let registry = &registry;
                    scope.spawn(move || {
                        (0..PER_ADDER)
                            .map(|i| {
                                let hook = TestHook::new(&format!("h-{a}-{i}"));
                                registry.add(hook.clone()).unwrap();
                                hook
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            for round in 0..200u8 {
                registry.set_options(options(round % 3));
            }

            adders
                .into_iter()
                .flat_map(|adder| adder.join().expect("adder panicked"))
                .collect()
        });

        let latest = registry.options().capabilities.maximum_qos;
        assert_eq!(added.len(), ADDERS * PER_ADDER);
        for hook in &added {
            assert_eq!(
                hook.last_qos.load(Ordering::SeqCst),
                latest,
                "hook {} kept stale options",
                hook.id
            );
        }
    }

    #[test]
    fn provides_any_checks_every_hook() {
        let registry = HookRegistry::new();
        registry.add(TestHook::new("silent")).unwrap();
        assert!(!registry.provides_any(EventSet::of(&[Event::OnPublish])));

        registry
            .add(TestHook::providing("pub", EventSet::of(&[Event::OnPublish])))
            .unwrap();
        assert!(registry.provides_any(EventSet::of(&[Event::OnConnect, Event::OnPublish])));
        assert!(!registry.provides_any(EventSet::of(&[Event::OnConnect])));
    }
}
