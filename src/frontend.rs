use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Function, Reflect};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::Document;

use crate::config::SiteConfig;
use crate::dom::{self, EventSubscription, Handles};
use crate::error::BehaviorError;
use crate::preferences::{DocumentHost, PagePreferences};
use crate::{
    contributions, dropdown, github_stats, logging, modal, reveal, sidebar, slideshow, typewriter,
};

const JS_CLASS: &str = "js";
const THEME_TOGGLE_ID: &str = "theme-toggle";
const LANG_TOGGLE_ID: &str = "lang-toggle";

type Preferences = Rc<PagePreferences<DocumentHost>>;

/// Everything that has to outlive `run()`: the preference context and every
/// listener or observer registration.
struct Page {
    _preferences: Preferences,
    _handles: Handles,
}

thread_local! {
    static PAGE: RefCell<Option<Page>> = const { RefCell::new(None) };
}

pub fn run() {
    match start() {
        Ok(page) => PAGE.with(|slot| *slot.borrow_mut() = Some(page)),
        Err(error) => {
            web_sys::console::error_1(&format!("page behaviors failed to start: {error}").into());
        }
    }
}

fn start() -> Result<Page, BehaviorError> {
    let document = dom::document()?;
    let root = document
        .document_element()
        .ok_or(BehaviorError::MissingDocument)?;

    let config = SiteConfig::from_root(&root);
    logging::init(config.log_level);
    dom::add_class(&root, JS_CLASS);

    let preferences: Preferences = Rc::new(PagePreferences::new(DocumentHost::new(root)));
    preferences.restore();
    tracing::debug!(
        theme = preferences.theme().as_str(),
        lang = preferences.lang().as_str(),
        "preferences: restored"
    );

    let mut handles = Handles::default();
    keep(&mut handles, "preference toggles", install_toggles(&document, &preferences));
    keep(&mut handles, "cv dropdown", dropdown::install(&document));
    keep(&mut handles, "reveal", reveal::install(&document));
    keep(&mut handles, "typewriter", typewriter::install(&document));
    keep(&mut handles, "modal", modal::install(&document));
    keep(
        &mut handles,
        "slideshow",
        slideshow::install(&document, config.slide_interval),
    );
    github_stats::install(&document, &config);
    keep(
        &mut handles,
        "contributions",
        contributions::install(&document, &config, Rc::clone(&preferences)),
    );
    keep(&mut handles, "sidebar", sidebar::install(&document, &config));

    tracing::info!("page behaviors installed");

    Ok(Page {
        _preferences: preferences,
        _handles: handles,
    })
}

/// A component that fails to install is logged and skipped so the rest of
/// the page still works.
fn keep(handles: &mut Handles, component: &'static str, result: Result<Option<Handles>, BehaviorError>) {
    match result {
        Ok(Some(installed)) => {
            tracing::debug!(component, "installed");
            handles.extend(installed);
        }
        Ok(None) => tracing::debug!(component, "not present on page"),
        Err(error) => tracing::warn!(component, %error, "install failed"),
    }
}

fn install_toggles(
    document: &Document,
    preferences: &Preferences,
) -> Result<Option<Handles>, BehaviorError> {
    let mut handles = Handles::default();

    if let Some(toggle) = document.get_element_by_id(THEME_TOGGLE_ID) {
        let preferences = Rc::clone(preferences);
        handles.push(EventSubscription::listen(&toggle, "click", move |_event| {
            let preferences = Rc::clone(&preferences);
            with_view_transition(move || {
                let theme = preferences.toggle_theme();
                tracing::debug!(theme = theme.as_str(), "preferences: theme toggled");
            });
        })?);
    }

    if let Some(toggle) = document.get_element_by_id(LANG_TOGGLE_ID) {
        let preferences = Rc::clone(preferences);
        handles.push(EventSubscription::listen(&toggle, "click", move |_event| {
            let lang = preferences.toggle_lang();
            tracing::debug!(lang = lang.as_str(), "preferences: language toggled");
        })?);
    }

    Ok(Some(handles))
}

/// Runs `change` inside `document.startViewTransition` when the browser
/// has it and motion is allowed, otherwise immediately.
fn with_view_transition(change: impl FnOnce() + 'static) {
    let transition = if dom::prefers_reduced_motion() {
        None
    } else {
        dom::document().ok().and_then(|document| {
            let document: JsValue = document.into();
            let start = Reflect::get(&document, &JsValue::from_str("startViewTransition")).ok()?;
            let start = start.dyn_into::<Function>().ok()?;
            Some((document, start))
        })
    };

    let Some((document, start)) = transition else {
        change();
        return;
    };

    let pending: Rc<RefCell<Option<Box<dyn FnOnce()>>>> = Rc::new(RefCell::new(Some(Box::new(change))));
    let callback = {
        let pending = Rc::clone(&pending);
        Closure::once_into_js(move || run_pending(&pending))
    };

    if start.call1(&document, &callback).is_err() {
        tracing::debug!("preferences: view transition rejected");
        run_pending(&pending);
    }
}

fn run_pending(pending: &RefCell<Option<Box<dyn FnOnce()>>>) {
    let change = pending.borrow_mut().take();
    if let Some(change) = change {
        change();
    }
}
