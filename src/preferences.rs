use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

pub const THEME_KEY: &str = "theme";
pub const LANG_KEY: &str = "lang";

const THEME_ATTRIBUTE: &str = "data-theme";
const LANG_DATA_ATTRIBUTE: &str = "data-lang";
const LANG_ATTRIBUTE: &str = "lang";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lang {
    Pt,
    En,
}

impl Lang {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pt => "pt",
            Self::En => "en",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "pt" => Some(Self::Pt),
            "en" => Some(Self::En),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Pt => Self::En,
            Self::En => Self::Pt,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreferenceChange {
    Theme(Theme),
    Lang(Lang),
}

/// Where preferences live: persistent storage plus the attributes of the
/// page's root element.
pub trait PreferenceHost {
    fn stored(&self, key: &str) -> Option<String>;
    fn store(&self, key: &str, value: &str);
    fn root_attribute(&self, name: &str) -> Option<String>;
    fn set_root_attribute(&self, name: &str, value: &str);
}

type Listener = Rc<dyn Fn(PreferenceChange)>;
type ListenerList = RefCell<Vec<(u64, Listener)>>;

/// Shared page preference context. The root element attributes are the
/// source of truth for the current values; storage only mirrors them.
pub struct PagePreferences<H> {
    host: H,
    listeners: Rc<ListenerList>,
    next_listener_id: Cell<u64>,
}

/// Keeps a preference listener registered until dropped.
#[must_use = "dropping a subscription unregisters its listener"]
pub struct Subscription {
    id: u64,
    listeners: Weak<ListenerList>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }
}

impl<H: PreferenceHost> PagePreferences<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            listeners: Rc::new(RefCell::new(Vec::new())),
            next_listener_id: Cell::new(0),
        }
    }

    /// An unset or unrecognized theme counts as dark.
    pub fn theme(&self) -> Theme {
        self.host
            .root_attribute(THEME_ATTRIBUTE)
            .and_then(|value| Theme::from_str(&value))
            .unwrap_or(Theme::Dark)
    }

    /// An unset or unrecognized language counts as English.
    pub fn lang(&self) -> Lang {
        self.host
            .root_attribute(LANG_DATA_ATTRIBUTE)
            .and_then(|value| Lang::from_str(&value))
            .unwrap_or(Lang::En)
    }

    pub fn set_theme(&self, theme: Theme) {
        self.apply_theme(theme);
        self.host.store(THEME_KEY, theme.as_str());
        self.notify(PreferenceChange::Theme(theme));
    }

    pub fn set_lang(&self, lang: Lang) {
        self.apply_lang(lang);
        self.host.store(LANG_KEY, lang.as_str());
        self.notify(PreferenceChange::Lang(lang));
    }

    pub fn toggle_theme(&self) -> Theme {
        let next = self.theme().toggled();
        self.set_theme(next);
        next
    }

    pub fn toggle_lang(&self) -> Lang {
        let next = self.lang().toggled();
        self.set_lang(next);
        next
    }

    /// Re-applies stored values onto the root element. Unknown stored
    /// strings are ignored.
    pub fn restore(&self) {
        if let Some(theme) = self
            .host
            .stored(THEME_KEY)
            .and_then(|value| Theme::from_str(&value))
        {
            self.apply_theme(theme);
        }

        if let Some(lang) = self
            .host
            .stored(LANG_KEY)
            .and_then(|value| Lang::from_str(&value))
        {
            self.apply_lang(lang);
        }
    }

    pub fn subscribe(&self, listener: impl Fn(PreferenceChange) + 'static) -> Subscription {
        let id = self.next_listener_id.get();
        self.next_listener_id.set(id + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));

        Subscription {
            id,
            listeners: Rc::downgrade(&self.listeners),
        }
    }

    #[cfg(test)]
    pub fn host(&self) -> &H {
        &self.host
    }

    fn apply_theme(&self, theme: Theme) {
        self.host.set_root_attribute(THEME_ATTRIBUTE, theme.as_str());
    }

    fn apply_lang(&self, lang: Lang) {
        self.host.set_root_attribute(LANG_DATA_ATTRIBUTE, lang.as_str());
        self.host.set_root_attribute(LANG_ATTRIBUTE, lang.as_str());
    }

    fn notify(&self, change: PreferenceChange) {
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();

        for listener in listeners {
            listener(change);
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use self::document::DocumentHost;

#[cfg(target_arch = "wasm32")]
mod document {
    use web_sys::{Element, Storage};

    use super::PreferenceHost;

    pub struct DocumentHost {
        root: Element,
        storage: Option<Storage>,
    }

    impl DocumentHost {
        pub fn new(root: Element) -> Self {
            Self {
                root,
                storage: local_storage(),
            }
        }
    }

    fn local_storage() -> Option<Storage> {
        web_sys::window()?.local_storage().ok().flatten()
    }

    impl PreferenceHost for DocumentHost {
        fn stored(&self, key: &str) -> Option<String> {
            self.storage.as_ref()?.get_item(key).ok().flatten()
        }

        fn store(&self, key: &str, value: &str) {
            if let Some(storage) = self.storage.as_ref() {
                if storage.set_item(key, value).is_err() {
                    tracing::debug!(key, "preferences: storage write rejected");
                }
            }
        }

        fn root_attribute(&self, name: &str) -> Option<String> {
            self.root.get_attribute(name)
        }

        fn set_root_attribute(&self, name: &str, value: &str) {
            let _ = self.root.set_attribute(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemoryHost {
        storage: RefCell<HashMap<String, String>>,
        attributes: RefCell<HashMap<String, String>>,
    }

    impl PreferenceHost for MemoryHost {
        fn stored(&self, key: &str) -> Option<String> {
            self.storage.borrow().get(key).cloned()
        }

        fn store(&self, key: &str, value: &str) {
            self.storage
                .borrow_mut()
                .insert(key.to_string(), value.to_string());
        }

        fn root_attribute(&self, name: &str) -> Option<String> {
            self.attributes.borrow().get(name).cloned()
        }

        fn set_root_attribute(&self, name: &str, value: &str) {
            self.attributes
                .borrow_mut()
                .insert(name.to_string(), value.to_string());
        }
    }

    fn preferences_with(attributes: &[(&str, &str)]) -> PagePreferences<MemoryHost> {
        let host = MemoryHost::default();
        for (name, value) in attributes {
            host.set_root_attribute(name, value);
        }
        PagePreferences::new(host)
    }

    #[test]
    fn unset_theme_counts_as_dark_and_first_toggle_goes_light() {
        let preferences = preferences_with(&[]);

        assert_eq!(preferences.theme(), Theme::Dark);
        assert_eq!(preferences.toggle_theme(), Theme::Light);
        assert_eq!(
            preferences.host().root_attribute("data-theme").as_deref(),
            Some("light")
        );
        assert_eq!(preferences.host().stored(THEME_KEY).as_deref(), Some("light"));
    }

    #[test]
    fn unset_lang_counts_as_english_and_first_toggle_goes_portuguese() {
        let preferences = preferences_with(&[]);

        assert_eq!(preferences.lang(), Lang::En);
        assert_eq!(preferences.toggle_lang(), Lang::Pt);
        assert_eq!(preferences.host().root_attribute("data-lang").as_deref(), Some("pt"));
        assert_eq!(preferences.host().root_attribute("lang").as_deref(), Some("pt"));
        assert_eq!(preferences.host().stored(LANG_KEY).as_deref(), Some("pt"));
    }

    #[test]
    fn toggling_twice_restores_original_theme_and_lang() {
        let preferences = preferences_with(&[("data-theme", "light"), ("data-lang", "pt")]);
        preferences.host().store(THEME_KEY, "light");
        preferences.host().store(LANG_KEY, "pt");

        preferences.toggle_theme();
        preferences.toggle_theme();
        preferences.toggle_lang();
        preferences.toggle_lang();

        assert_eq!(preferences.theme(), Theme::Light);
        assert_eq!(preferences.host().stored(THEME_KEY).as_deref(), Some("light"));
        assert_eq!(preferences.lang(), Lang::Pt);
        assert_eq!(preferences.host().stored(LANG_KEY).as_deref(), Some("pt"));
    }

    #[test]
    fn restore_applies_valid_stored_values_only() {
        let preferences = preferences_with(&[("data-theme", "dark")]);
        preferences.host().store(THEME_KEY, "sepia");
        preferences.host().store(LANG_KEY, "pt");

        preferences.restore();

        assert_eq!(preferences.theme(), Theme::Dark);
        assert_eq!(preferences.lang(), Lang::Pt);
        assert_eq!(preferences.host().root_attribute("lang").as_deref(), Some("pt"));
    }

    #[test]
    fn subscribers_see_changes_until_dropped() {
        let preferences = preferences_with(&[]);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let subscription = {
            let seen = Rc::clone(&seen);
            preferences.subscribe(move |change| seen.borrow_mut().push(change))
        };

        preferences.toggle_lang();
        preferences.set_theme(Theme::Dark);
        drop(subscription);
        preferences.toggle_lang();

        assert_eq!(
            *seen.borrow(),
            vec![
                PreferenceChange::Lang(Lang::Pt),
                PreferenceChange::Theme(Theme::Dark)
            ]
        );
    }
}
