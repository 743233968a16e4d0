#![allow(deprecated)] // Keep Cocoa warnings localized
#![allow(unexpected_cfgs)] // Suppress warnings from the `sel!` macro in older `objc` crates

//! Cocoa side of the menu action registry.
//!
//! Items are identified by their `identifier` (set in Interface Builder or
//! by the host). Every registered item is routed to one Objective-C target
//! whose `actionActivated:` forwards the identifier to the registry callback.
//! AppKit menus are main-thread only, so all state here is thread-local.

use std::cell::{Cell, RefCell};
use std::sync::Once;

use cocoa::appkit::{NSApp, NSApplication};
use cocoa::base::{id, nil, BOOL, NO, YES};
use cocoa::foundation::{NSArray, NSUInteger};
use objc::declare::ClassDecl;
use objc::runtime::{Class, Object, Sel};
use objc::{class, msg_send, sel, sel_impl};

use super::ns_to_string;
use crate::app::actions::{ActionRegistry, MenuEntry};

const TARGET_CLASS: &str = "RuntimeThunkMenuTarget";

thread_local! {
    static REGISTRY: RefCell<ActionRegistry<CocoaMenuItem>> = RefCell::new(ActionRegistry::new());
    static TARGET: Cell<id> = Cell::new(nil);
}

/// A borrowed `NSMenuItem`.
#[derive(Clone, Copy)]
pub struct CocoaMenuItem(id);

impl CocoaMenuItem {
    unsafe fn route_to(&self, target: id) {
        let _: () = msg_send![self.0, setTarget: target];
        let _: () = msg_send![self.0, setAction: sel!(actionActivated:)];
    }
}

impl MenuEntry for CocoaMenuItem {
    fn action_name(&self) -> Option<String> {
        unsafe {
            let identifier: id = msg_send![self.0, identifier];
            ns_to_string(identifier)
        }
    }

    fn children(&self) -> Vec<Self> {
        unsafe {
            let has_submenu: BOOL = msg_send![self.0, hasSubmenu];
            if has_submenu == NO {
                return Vec::new();
            }
            let submenu: id = msg_send![self.0, submenu];
            menu_items(submenu)
        }
    }

    fn set_enabled(&self, enabled: bool) {
        unsafe {
            let _: () = msg_send![self.0, setEnabled: if enabled { YES } else { NO }];
        }
    }
}

unsafe fn menu_items(menu: id) -> Vec<CocoaMenuItem> {
    if menu == nil {
        return Vec::new();
    }
    let items: id = msg_send![menu, itemArray];
    let count: NSUInteger = NSArray::count(items);
    (0..count)
        .map(|i| CocoaMenuItem(NSArray::objectAtIndex(items, i)))
        .collect()
}

extern "C" fn action_activated(_this: &Object, _cmd: Sel, sender: id) {
    let Some(name) = CocoaMenuItem(sender).action_name() else {
        tracing::warn!("Menu item without identifier activated");
        return;
    };

    // The borrow ends before the callback runs so it may use the registry.
    let callback = REGISTRY.with(|registry| registry.borrow().callback_for(&name));

    if let Some(callback) = callback {
        callback(&name);
    }
}

fn target_class() -> Option<&'static Class> {
    static REGISTER: Once = Once::new();
    REGISTER.call_once(|| {
        let Some(mut decl) = ClassDecl::new(TARGET_CLASS, class!(NSObject)) else {
            tracing::warn!("Objective-C class {} already exists", TARGET_CLASS);
            return;
        };
        unsafe {
            decl.add_method(
                sel!(actionActivated:),
                action_activated as extern "C" fn(&Object, Sel, id),
            );
        }
        decl.register();
    });
    Class::get(TARGET_CLASS)
}

fn shared_target() -> Option<id> {
    TARGET.with(|cell| {
        if cell.get() == nil {
            let class = target_class()?;
            let target: id = unsafe { msg_send![class, new] };
            cell.set(target);
        }
        Some(cell.get())
    })
}

/// Registers every identified item in `menu` and its submenus and routes
/// them to the shared action target. Returns the number of items registered.
///
/// # Safety
/// `menu` must be `nil` or a valid `NSMenu`, and this must run on the main thread.
pub unsafe fn add_actions_from_menu(menu: id) -> usize {
    let Some(target) = shared_target() else {
        tracing::error!("Could not create the menu action target");
        return 0;
    };

    REGISTRY.with(|registry| {
        let mut registry = registry.borrow_mut();
        let added: usize = menu_items(menu)
            .into_iter()
            .map(|item| registry.add_actions_from(item))
            .sum();
        for (_, item) in registry.entries() {
            item.route_to(target);
        }
        tracing::info!("Registered {} menu actions", added);
        added
    })
}

/// Registers the actions of the application's main menu.
pub fn add_actions_from_main_menu() -> usize {
    unsafe {
        let main_menu: id = NSApp().mainMenu();
        add_actions_from_menu(main_menu)
    }
}

pub fn enable_action(name: &str) -> bool {
    REGISTRY.with(|registry| registry.borrow().enable_action(name))
}

pub fn disable_action(name: &str) -> bool {
    REGISTRY.with(|registry| registry.borrow().disable_action(name))
}

pub fn action_names() -> Vec<String> {
    REGISTRY.with(|registry| registry.borrow().action_names())
}

/// Sets the callback invoked with the identifier of any activated item.
pub fn set_action_callback<F>(callback: F)
where
    F: Fn(&str) + 'static,
{
    REGISTRY.with(|registry| registry.borrow_mut().set_action_callback(callback));
}
