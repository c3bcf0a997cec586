//! Named options storage.
//!
//! Options of type `O` are addressed by a string name. Any number of setup calls may
//! append actions for the same `(O, name)` pair; resolution starts from `O::default()`
//! and applies every action in registration order.

use super::TypeKey;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// One mutation applied to an options value during resolution.
pub type OptionsAction<O> = Arc<dyn Fn(&mut O) + Send + Sync>;

type Boxed = Box<dyn Any + Send + Sync>;

/// Per-type, per-name ordered lists of options actions.
#[derive(Default)]
pub(crate) struct OptionsStore {
    // Inner value is always a `Vec<OptionsAction<O>>` for the outer key's `O`.
    actions: HashMap<TypeKey, HashMap<Arc<str>, Boxed>>,
}

impl OptionsStore {
    pub(crate) fn append<O>(&mut self, name: Arc<str>, action: OptionsAction<O>)
    where
        O: Send + Sync + 'static,
    {
        let slot = self
            .actions
            .entry(TypeKey::of::<O>())
            .or_default()
            .entry(name)
            .or_insert_with(|| Box::new(Vec::<OptionsAction<O>>::new()) as Boxed);

        if let Some(list) = slot.downcast_mut::<Vec<OptionsAction<O>>>() {
            list.push(action);
        }
    }

    pub(crate) fn resolve<O>(&self, name: &str) -> O
    where
        O: Default + Send + Sync + 'static,
    {
        let mut options = O::default();
        for action in self.actions_for::<O>(name) {
            action(&mut options);
        }
        options
    }

    pub(crate) fn count<O>(&self, name: &str) -> usize
    where
        O: Send + Sync + 'static,
    {
        self.actions_for::<O>(name).len()
    }

    fn actions_for<O>(&self, name: &str) -> &[OptionsAction<O>]
    where
        O: Send + Sync + 'static,
    {
        self.actions
            .get(&TypeKey::of::<O>())
            .and_then(|by_name| by_name.get(name))
            .and_then(|slot| slot.downcast_ref::<Vec<OptionsAction<O>>>())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
