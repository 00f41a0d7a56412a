mod common;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Barrier,
};

use common::{Alarm, Clock, Dashboard, Widget};
use wrapp_inject::{
    Arguments, DependencyInfo, DynError, Inject, Key, Lazy, Producer, Registry, Resolver,
    ResolverConfig, Scope,
};

/// Singleton whose lazy slot is filled after it is constructed
struct Tower {
    peer: Lazy<Peer>,
}
impl Inject for Tower {
    fn dependencies() -> Vec<DependencyInfo> {
        vec![DependencyInfo::typed::<Peer>("peer").lazy()]
    }

    fn construct(args: &mut Arguments) -> Result<Self, DynError> {
        Ok(Tower {
            peer: args.lazy("peer")?,
        })
    }
}

struct Peer;

fn counted_clock(scope: Scope) -> (Registry, Arc<AtomicUsize>) {
    let counter = Arc::new(AtomicUsize::new(0));
    let calls = counter.clone();

    let mut registry = Registry::new();
    registry
        .bind(
            Key::of::<Clock>(),
            Producer::factory(move || {
                calls.fetch_add(1, Ordering::SeqCst);
                Clock
            }),
            scope,
        )
        .unwrap();
    (registry, counter)
}

#[test]
fn transient_builds_every_reference() {
    let (registry, counter) = counted_clock(Scope::Transient);
    let widget = Resolver::new(registry).resolve::<Widget>().unwrap();

    assert!(!Arc::ptr_eq(&widget.first, &widget.second));
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn local_is_shared_within_one_call() {
    let (registry, counter) = counted_clock(Scope::Local);
    let resolver = Resolver::new(registry);

    let first = resolver.resolve::<Dashboard>().unwrap();
    assert!(Arc::ptr_eq(&first.clock, &first.widget.first));
    assert!(Arc::ptr_eq(&first.widget.first, &first.widget.second));
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    let second = resolver.resolve::<Dashboard>().unwrap();
    assert!(!Arc::ptr_eq(&first.clock, &second.clock));
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert!(resolver.registry().singletons().is_empty());
}

#[test]
fn singleton_is_invoked_once() {
    let (registry, counter) = counted_clock(Scope::Singleton);
    let resolver = Resolver::new(registry);

    let dashboard = resolver.resolve::<Dashboard>().unwrap();
    let alarm = resolver.resolve::<Alarm>().unwrap();
    let clock = resolver.resolve::<Clock>().unwrap();

    assert!(Arc::ptr_eq(&dashboard.clock, &alarm.clock));
    assert!(Arc::ptr_eq(&alarm.clock, &clock));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(resolver.registry().singletons().len(), 1);
}

#[test]
fn resolvers_over_one_registry_share_singletons() {
    let (registry, counter) = counted_clock(Scope::Singleton);
    let registry = Arc::new(registry);

    let first = Resolver::new(registry.clone()).resolve::<Alarm>().unwrap();
    let second = Resolver::new(registry).resolve::<Alarm>().unwrap();
    assert!(Arc::ptr_eq(&first.clock, &second.clock));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn separate_registries_do_not_share_singletons() {
    let (first_registry, _) = counted_clock(Scope::Singleton);
    let (second_registry, _) = counted_clock(Scope::Singleton);

    let first = Resolver::new(first_registry).resolve::<Clock>().unwrap();
    let second = Resolver::new(second_registry).resolve::<Clock>().unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn concurrent_first_resolution_agrees_on_one_singleton() {
    let (registry, _) = counted_clock(Scope::Singleton);
    let resolver = Resolver::new(registry);
    let barrier = Barrier::new(8);

    let clocks: Vec<Arc<Clock>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    resolver.resolve::<Alarm>().unwrap().clock.clone()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(clocks.iter().all(|clock| Arc::ptr_eq(clock, &clocks[0])));
    assert_eq!(resolver.registry().singletons().len(), 1);
}

#[test]
fn singleton_is_not_shared_before_its_lazy_slots_are_filled() {
    let entered = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));
    let counter = Arc::new(AtomicUsize::new(0));

    let (gate_in, gate_out, calls) = (entered.clone(), release.clone(), counter.clone());
    let mut registry = Registry::new();
    registry
        .bind_self::<Tower>(Scope::Singleton)
        .transient(
            Key::of::<Peer>(),
            Producer::function(Vec::new(), move |_| {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    gate_in.wait();
                    gate_out.wait();
                }
                Ok(Peer)
            }),
        )
        .unwrap();
    let resolver = Resolver::new(registry);

    std::thread::scope(|scope| {
        let blocked = scope.spawn(|| resolver.resolve::<Tower>().unwrap());

        entered.wait();
        let tower = resolver.resolve::<Tower>().unwrap();
        assert!(tower.peer.is_filled());
        assert_eq!(resolver.registry().singletons().len(), 1);

        release.wait();
        let late = blocked.join().unwrap();
        assert!(Arc::ptr_eq(&late, &tower));
        assert!(late.peer.is_filled());
    });
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn value_producers_ignore_the_scope() {
    let mut registry = Registry::new();
    registry
        .transient(Key::of::<Clock>(), Producer::value(Clock))
        .unwrap();

    let widget = Resolver::new(registry).resolve::<Widget>().unwrap();
    assert!(Arc::ptr_eq(&widget.first, &widget.second));
}

#[test]
fn default_scope_applies_to_implicit_constructors() {
    let resolver = Resolver::with_config(
        Registry::new(),
        ResolverConfig::default().with_default_scope(Scope::Transient),
    );
    let widget = resolver.resolve::<Widget>().unwrap();
    assert!(!Arc::ptr_eq(&widget.first, &widget.second));

    let resolver = Resolver::with_config(
        Registry::new(),
        ResolverConfig::default().with_default_scope(Scope::Singleton),
    );
    let first = resolver.resolve::<Alarm>().unwrap();
    let second = resolver.resolve::<Alarm>().unwrap();
    assert!(Arc::ptr_eq(&first.clock, &second.clock));
}

#[test]
fn override_singletons_live_in_the_override_registry() {
    let resolver = Resolver::default();
    let (overrides, counter) = counted_clock(Scope::Singleton);

    let first = resolver.resolve_with::<Alarm>(&overrides).unwrap();
    let second = resolver.resolve_with::<Alarm>(&overrides).unwrap();
    assert!(Arc::ptr_eq(&first.clock, &second.clock));
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    assert_eq!(overrides.singletons().len(), 1);
    assert!(resolver.registry().singletons().is_empty());
}
