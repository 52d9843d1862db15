use std::collections::HashSet;

pub const MODAL_TRIGGER_ATTRIBUTE: &str = "data-modal";
pub const OPEN_SLIDESHOW_EVENT: &str = "open-slideshow";
pub const STANDALONE_VIDEO_SELECTOR: &str = ".modal-media:not(.slideshow) video";
pub const CLOSE_BUTTON_SELECTOR: &str = ".modal-close";
pub const MODAL_DIALOG_SELECTOR: &str = ".modal, [id^=\"modal-\"]";

pub fn modal_dialog_id(identifier: &str) -> String {
    format!("modal-{identifier}")
}

/// Dialogs currently open through a trigger. The page stays scroll-locked
/// while any of them is open. Each opened dialog gets its own close
/// listener the first time it opens, so a dialog that was not on the page
/// at install time still releases the lock.
#[derive(Debug, Default)]
pub struct OpenModals {
    open: HashSet<String>,
    watched: HashSet<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Opened {
    /// Set the body overflow override now.
    pub lock_scroll: bool,
    /// This dialog has no close listener yet.
    pub watch_close: bool,
}

impl OpenModals {
    pub fn open(&mut self, dialog_id: &str) -> Opened {
        let lock_scroll = self.open.is_empty();
        self.open.insert(dialog_id.to_string());

        Opened {
            lock_scroll,
            watch_close: self.watched.insert(dialog_id.to_string()),
        }
    }

    /// Returns true when the lock must be lifted now. Closing a dialog that
    /// was never opened through a trigger lifts it too if nothing else is
    /// open.
    pub fn close(&mut self, dialog_id: &str) -> bool {
        self.open.remove(dialog_id);
        self.open.is_empty()
    }

    pub fn is_locked(&self) -> bool {
        !self.open.is_empty()
    }
}

#[cfg(target_arch = "wasm32")]
pub fn install(document: &web_sys::Document) -> Result<Option<crate::dom::Handles>, crate::error::BehaviorError> {
    use std::cell::RefCell;
    use std::rc::{Rc, Weak};

    use wasm_bindgen::JsCast;
    use web_sys::{Document, Element, Event, HtmlDialogElement};

    use crate::dom::{closest, event_element, query_all_within, EventSubscription, Handles};

    #[derive(Default)]
    struct ModalState {
        modals: OpenModals,
        close_listeners: Vec<EventSubscription>,
    }

    fn watch_close(
        document: &Document,
        dialog: &HtmlDialogElement,
        state: Weak<RefCell<ModalState>>,
    ) -> Result<EventSubscription, crate::error::BehaviorError> {
        let document = document.clone();
        let closed = dialog.clone();
        EventSubscription::listen(dialog, "close", move |_| {
            let Some(state) = state.upgrade() else {
                return;
            };
            let unlock = state.borrow_mut().modals.close(&closed.id());
            if unlock {
                set_body_overflow(&document, None);
            }
            for video in standalone_videos(closed.as_ref()) {
                let _ = video.pause();
            }
        })
    }

    let state = Rc::new(RefCell::new(ModalState::default()));

    let on_click = {
        let document = document.clone();
        move |event: Event| {
            let Some(target) = event_element(&event) else {
                return;
            };

            if let Some(dialog) = closest(&target, CLOSE_BUTTON_SELECTOR)
                .and_then(|button| closest(&button, "dialog"))
                .or_else(|| is_backdrop(&target).then(|| target.clone()))
                .and_then(|dialog| dialog.dyn_into::<HtmlDialogElement>().ok())
            {
                dialog.close();
                return;
            }

            if closest(&target, "a[href]").is_some() {
                return;
            }
            let Some(identifier) = closest(&target, "[data-modal]")
                .and_then(|trigger| trigger.get_attribute(MODAL_TRIGGER_ATTRIBUTE))
            else {
                return;
            };
            let dialog_id = modal_dialog_id(&identifier);
            let Some(dialog) = document
                .get_element_by_id(&dialog_id)
                .and_then(|element| element.dyn_into::<HtmlDialogElement>().ok())
            else {
                tracing::debug!(%identifier, "modal: no dialog for trigger");
                return;
            };

            if let Err(error) = dialog.show_modal() {
                tracing::debug!(?error, %identifier, "modal: dialog refused to open");
                return;
            }

            let opened = state.borrow_mut().modals.open(&dialog_id);
            if opened.lock_scroll {
                set_body_overflow(&document, Some("hidden"));
            }
            if opened.watch_close {
                match watch_close(&document, &dialog, Rc::downgrade(&state)) {
                    Ok(listener) => state.borrow_mut().close_listeners.push(listener),
                    Err(error) => tracing::warn!(%error, %identifier, "modal: could not watch close"),
                }
            }

            let dialog: &Element = dialog.as_ref();
            for slideshow in query_all_within(dialog, ".slideshow").unwrap_or_default() {
                if let Ok(signal) = Event::new(OPEN_SLIDESHOW_EVENT) {
                    let _ = slideshow.dispatch_event(&signal);
                }
            }
            for video in standalone_videos(dialog) {
                video.set_current_time(0.0);
                let _ = video.play();
            }
        }
    };

    let mut handles = Handles::default();
    handles.push(EventSubscription::listen(document, "click", on_click)?);
    Ok(Some(handles))
}

/// A click whose target is a modal dialog itself landed on its backdrop.
#[cfg(target_arch = "wasm32")]
fn is_backdrop(target: &web_sys::Element) -> bool {
    target.tag_name().eq_ignore_ascii_case("dialog") && target.matches(MODAL_DIALOG_SELECTOR).unwrap_or(false)
}

#[cfg(target_arch = "wasm32")]
fn standalone_videos(dialog: &web_sys::Element) -> Vec<web_sys::HtmlMediaElement> {
    use wasm_bindgen::JsCast;

    crate::dom::query_all_within(dialog, STANDALONE_VIDEO_SELECTOR)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|video| video.dyn_into::<web_sys::HtmlMediaElement>().ok())
        .collect()
}

#[cfg(target_arch = "wasm32")]
fn set_body_overflow(document: &web_sys::Document, value: Option<&str>) {
    let Some(body) = document.body() else {
        return;
    };
    let style = body.style();
    let _ = match value {
        Some(value) => style.set_property("overflow", value),
        None => style.remove_property("overflow").map(|_| ()),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialog_id_prefixes_identifier() {
        assert_eq!(modal_dialog_id("shade"), "modal-shade");
    }

    #[test]
    fn single_modal_locks_and_unlocks() {
        let mut modals = OpenModals::default();

        assert_eq!(
            modals.open("modal-shade"),
            Opened {
                lock_scroll: true,
                watch_close: true
            }
        );
        assert!(modals.is_locked());
        assert!(modals.close("modal-shade"));
        assert!(!modals.is_locked());
    }

    #[test]
    fn stacked_modals_unlock_only_after_last_close() {
        let mut modals = OpenModals::default();

        assert!(modals.open("modal-a").lock_scroll);
        assert!(!modals.open("modal-b").lock_scroll);
        assert!(!modals.close("modal-a"));
        assert!(modals.is_locked());
        assert!(modals.close("modal-b"));
    }

    #[test]
    fn any_opened_dialog_gets_a_close_listener_once() {
        let mut modals = OpenModals::default();

        // A dialog that carries no `.modal` class is still watched on first open.
        assert!(modals.open("modal-plain").watch_close);
        assert!(modals.close("modal-plain"));

        assert!(modals.open("modal-other").lock_scroll);
        assert!(modals.close("modal-other"));
        assert!(!modals.is_locked());

        let reopened = modals.open("modal-plain");
        assert!(reopened.lock_scroll);
        assert!(!reopened.watch_close);
    }

    #[test]
    fn reopening_an_open_dialog_does_not_deepen_the_lock() {
        let mut modals = OpenModals::default();

        modals.open("modal-a");
        modals.open("modal-a");

        assert!(modals.close("modal-a"));
    }

    #[test]
    fn unmatched_close_still_clears_override() {
        let mut modals = OpenModals::default();

        assert!(modals.close("modal-never-opened"));
        assert!(!modals.is_locked());
    }
}
