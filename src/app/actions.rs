//! Maps menu action identifiers to host menu items.
//!
//! The registry is toolkit-neutral: a host wraps its menu items in
//! [`MenuEntry`] and the registry handles lookup, enable/disable and
//! dispatch of activations to a single callback.

use std::collections::BTreeMap;
use std::rc::Rc;

/// A host menu item, as seen by the registry.
pub trait MenuEntry: Sized {
    /// The action identifier of this item, if it has one.
    fn action_name(&self) -> Option<String>;

    /// Items of this item's submenu, empty if it has none.
    fn children(&self) -> Vec<Self>;

    fn set_enabled(&self, enabled: bool);
}

pub type ActionCallback = Rc<dyn Fn(&str)>;

/// Action identifier to menu item mapping plus the activation callback.
///
/// Menus live on the UI thread; the registry is not `Send`.
pub struct ActionRegistry<E: MenuEntry> {
    items: BTreeMap<String, E>,
    callback: Option<ActionCallback>,
}

impl<E: MenuEntry> Default for ActionRegistry<E> {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
            callback: None,
        }
    }
}

impl<E: MenuEntry> ActionRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `entry` and every item below it that has an action name.
    ///
    /// A later item with an already registered name replaces the earlier one.
    /// Returns the number of items registered by this call.
    pub fn add_actions_from(&mut self, entry: E) -> usize {
        let mut added = 0;
        let children = entry.children();

        if let Some(name) = entry.action_name() {
            tracing::debug!("Registered menu action {:?}", name);
            if self.items.insert(name.clone(), entry).is_some() {
                tracing::debug!("Menu action {:?} registered twice, keeping the latest", name);
            }
            added += 1;
        }

        for child in children {
            added += self.add_actions_from(child);
        }
        added
    }

    pub fn enable_action(&self, name: &str) -> bool {
        self.set_enabled(name, true)
    }

    pub fn disable_action(&self, name: &str) -> bool {
        self.set_enabled(name, false)
    }

    fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        match self.items.get(name) {
            Some(item) => {
                item.set_enabled(enabled);
                true
            }
            None => {
                tracing::warn!("No menu item for action {:?}", name);
                false
            }
        }
    }

    /// Registered action names, sorted.
    pub fn action_names(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &E)> {
        self.items.iter().map(|(name, item)| (name.as_str(), item))
    }

    /// Sets the callback invoked with the action name of an activated item.
    pub fn set_action_callback<F>(&mut self, callback: F)
    where
        F: Fn(&str) + 'static,
    {
        self.callback = Some(Rc::new(callback));
    }

    pub fn callback(&self) -> Option<ActionCallback> {
        self.callback.clone()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    /// The callback to run for an activation of `name`, or `None` if the name
    /// is unknown or no callback is set.
    ///
    /// The callback is returned by value so a host holding the registry in a
    /// `RefCell` can release its borrow before calling it.
    pub fn callback_for(&self, name: &str) -> Option<ActionCallback> {
        if !self.is_registered(name) {
            tracing::warn!("Activation of unregistered action {:?}", name);
            return None;
        }
        self.callback()
    }

    /// Dispatches an activation. Returns `false` if the name is unknown or
    /// no callback is set.
    pub fn activate(&self, name: &str) -> bool {
        match self.callback_for(name) {
            Some(callback) => {
                callback(name);
                true
            }
            None => false,
        }
    }
}
