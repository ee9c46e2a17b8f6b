//! Event bus: named events delivered to component callbacks
//! Key principles:
//! - Publishing is immediate (every current subscriber runs before `publish` returns)
//! - Subscribe/unsubscribe are queued and applied once per frame
//! - A failing subscriber does not stop delivery to the others

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, trace};

use crate::component::ComponentRef;
use crate::runtime::{HookContext, Runtime};
use crate::script::{ScriptFn, Value};

/// A component callback registered for one event type
#[derive(Clone)]
pub struct Subscription {
    /// Component passed to the callback as its context
    pub component: ComponentRef,
    /// Callback to run on publish
    pub callback: ScriptFn,
}

impl Subscription {
    /// Create a subscription
    pub fn new(component: &ComponentRef, callback: ScriptFn) -> Self {
        Self {
            component: Rc::clone(component),
            callback,
        }
    }

    /// Same component and same callback
    pub fn matches(&self, other: &Subscription) -> bool {
        Rc::ptr_eq(&self.component, &other.component) && Rc::ptr_eq(&self.callback, &other.callback)
    }
}

enum Change {
    Subscribe(String, Subscription),
    Unsubscribe(String, Subscription),
}

/// Publish/subscribe hub shared by every component
#[derive(Default)]
pub struct EventBus {
    subscribers: RefCell<HashMap<String, Vec<Subscription>>>,
    changes: RefCell<Vec<Change>>,
}

impl EventBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a subscription; it takes effect at the next [`Self::process_subscriptions`]
    pub fn subscribe(&self, event_type: impl Into<String>, subscription: Subscription) {
        self.changes.borrow_mut().push(Change::Subscribe(event_type.into(), subscription));
    }

    /// Queue removal of a matching subscription
    pub fn unsubscribe(&self, event_type: impl Into<String>, subscription: Subscription) {
        self.changes.borrow_mut().push(Change::Unsubscribe(event_type.into(), subscription));
    }

    /// Apply queued (un)subscriptions in request order
    pub fn process_subscriptions(&self) {
        let changes = std::mem::take(&mut *self.changes.borrow_mut());
        let mut subscribers = self.subscribers.borrow_mut();
        for change in changes {
            match change {
                Change::Subscribe(event_type, subscription) => {
                    trace!("Subscribed to '{event_type}'");
                    subscribers.entry(event_type).or_default().push(subscription);
                }
                Change::Unsubscribe(event_type, subscription) => {
                    if let Some(list) = subscribers.get_mut(&event_type) {
                        if let Some(index) = list.iter().position(|s| s.matches(&subscription)) {
                            trace!("Unsubscribed from '{event_type}'");
                            list.remove(index);
                        }
                    }
                }
            }
        }
    }

    /// Number of active subscribers for `event_type`
    pub fn subscriber_count(&self, event_type: &str) -> usize {
        self.subscribers.borrow().get(event_type).map_or(0, Vec::len)
    }

    /// Number of queued (un)subscriptions
    pub fn pending_changes(&self) -> usize {
        self.changes.borrow().len()
    }

    /// Call every subscriber of `event_type` with `event`
    ///
    /// The subscriber list is snapshotted first, so callbacks may publish or
    /// (un)subscribe freely. Faults are reported against the subscriber's actor.
    pub fn publish(&self, runtime: &Runtime, event_type: &str, event: &Value) {
        let subscribers = match self.subscribers.borrow().get(event_type) {
            Some(list) => list.clone(),
            None => return,
        };

        for subscription in subscribers {
            let owner = subscription.component.try_borrow().ok().and_then(|component| component.actor());
            let Some(actor) = owner else {
                debug!("Skipping '{event_type}' subscriber without a live actor");
                continue;
            };
            let ctx = HookContext::new(runtime, &actor, &subscription.component).with_event(Some(event));
            if let Err(err) = (subscription.callback)(&ctx) {
                runtime.report_fault(&actor.name(), err);
            }
        }
    }

    /// Drop every subscription and queued change
    pub fn clear(&self) {
        self.subscribers.borrow_mut().clear();
        self.changes.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Actor;
    use crate::component::{Component, ComponentBody};
    use crate::script::{ScriptError, ScriptObject};
    use std::cell::Cell;

    fn subscriber(actor: &Rc<Actor>, key: &str) -> ComponentRef {
        actor.insert_pending(Component::new("Listener", key, ComponentBody::Prototype(ScriptObject::new())))
    }

    #[test]
    fn test_subscriptions_are_deferred() {
        let runtime = Runtime::default();
        let actor = Actor::new("Listener");
        let component = subscriber(&actor, "a");
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let callback: ScriptFn = Rc::new(move |_ctx: &HookContext<'_>| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        runtime.events().subscribe("ping", Subscription::new(&component, Rc::clone(&callback)));
        runtime.publish("ping", &Value::Nil);
        assert_eq!(hits.get(), 0);

        runtime.events().process_subscriptions();
        runtime.publish("ping", &Value::Nil);
        assert_eq!(hits.get(), 1);

        runtime.events().unsubscribe("ping", Subscription::new(&component, callback));
        runtime.publish("ping", &Value::Nil);
        assert_eq!(hits.get(), 2);
        runtime.events().process_subscriptions();
        runtime.publish("ping", &Value::Nil);
        assert_eq!(hits.get(), 2);
        assert_eq!(runtime.events().subscriber_count("ping"), 0);
    }

    #[test]
    fn test_faulty_subscriber_does_not_block_others() {
        let runtime = Runtime::default();
        let actor = Actor::new("Listener");
        let first = subscriber(&actor, "a");
        let second = subscriber(&actor, "b");
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&received);

        let failing: ScriptFn = Rc::new(|_ctx: &HookContext<'_>| Err(ScriptError::runtime("boom")));
        let recording: ScriptFn = Rc::new(move |ctx: &HookContext<'_>| {
            sink.borrow_mut().push(ctx.event.cloned().unwrap_or_default());
            Ok(())
        });

        runtime.events().subscribe("score", Subscription::new(&first, failing));
        runtime.events().subscribe("score", Subscription::new(&second, recording));
        runtime.events().process_subscriptions();
        runtime.publish("score", &Value::Int(5));

        assert_eq!(*received.borrow(), vec![Value::Int(5)]);
        assert!(runtime.take_fault().is_none());
    }

    #[test]
    fn test_unknown_event_type_is_ignored() {
        let runtime = Runtime::default();
        runtime.publish("nobody-listens", &Value::Bool(true));
        assert_eq!(runtime.events().subscriber_count("nobody-listens"), 0);
    }
}
