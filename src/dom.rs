use std::any::Any;

use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::{
    AddEventListenerOptions, Document, Element, Event, EventTarget, HtmlElement,
    IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit, Node, NodeList,
    ResizeObserver, Window,
};

use crate::error::BehaviorError;

pub fn window() -> Result<Window, BehaviorError> {
    web_sys::window().ok_or(BehaviorError::MissingWindow)
}

pub fn document() -> Result<Document, BehaviorError> {
    window()?.document().ok_or(BehaviorError::MissingDocument)
}

pub fn nodes(list: NodeList) -> Vec<Node> {
    (0..list.length()).filter_map(|index| list.get(index)).collect()
}

pub fn elements(list: NodeList) -> Vec<Element> {
    nodes(list)
        .into_iter()
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

pub fn query_all(document: &Document, selector: &str) -> Result<Vec<Element>, BehaviorError> {
    Ok(elements(document.query_selector_all(selector)?))
}

pub fn query_all_within(root: &Element, selector: &str) -> Result<Vec<Element>, BehaviorError> {
    Ok(elements(root.query_selector_all(selector)?))
}

pub fn event_element(event: &Event) -> Option<Element> {
    event.target()?.dyn_into::<Element>().ok()
}

pub fn closest(element: &Element, selector: &str) -> Option<Element> {
    element.closest(selector).ok().flatten()
}

pub fn media_matches(query: &str) -> bool {
    web_sys::window()
        .and_then(|w| w.match_media(query).ok().flatten())
        .map(|mq| mq.matches())
        .unwrap_or(false)
}

pub fn prefers_reduced_motion() -> bool {
    media_matches("(prefers-reduced-motion: reduce)")
}

pub fn set_style(element: &Element, property: &str, value: &str) {
    if let Some(element) = element.dyn_ref::<HtmlElement>() {
        let _ = element.style().set_property(property, value);
    }
}

pub fn style_value(element: &Element, property: &str) -> String {
    element
        .dyn_ref::<HtmlElement>()
        .and_then(|element| element.style().get_property_value(property).ok())
        .unwrap_or_default()
}

pub fn clear_style(element: &Element, property: &str) {
    if let Some(element) = element.dyn_ref::<HtmlElement>() {
        let _ = element.style().remove_property(property);
    }
}

pub fn add_class(element: &Element, class: &str) {
    let _ = element.class_list().add_1(class);
}

pub fn remove_class(element: &Element, class: &str) {
    let _ = element.class_list().remove_1(class);
}

/// Bag of registrations that stay alive for as long as it is held.
#[derive(Default)]
pub struct Handles {
    items: Vec<Box<dyn Any>>,
}

impl Handles {
    pub fn push(&mut self, handle: impl Any) {
        self.items.push(Box::new(handle));
    }

    pub fn extend(&mut self, other: Handles) {
        self.items.extend(other.items);
    }
}

/// An event listener that is removed from its target on drop.
pub struct EventSubscription {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl EventSubscription {
    pub fn listen(
        target: &EventTarget,
        event: &'static str,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<Self, BehaviorError> {
        let callback = Closure::<dyn FnMut(Event)>::new(handler);
        target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())?;

        Ok(Self {
            target: target.clone(),
            event,
            callback,
        })
    }

    pub fn listen_passive(
        target: &EventTarget,
        event: &'static str,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<Self, BehaviorError> {
        let callback = Closure::<dyn FnMut(Event)>::new(handler);
        let options = AddEventListenerOptions::new();
        options.set_passive(true);
        target.add_event_listener_with_callback_and_add_event_listener_options(
            event,
            callback.as_ref().unchecked_ref(),
            &options,
        )?;

        Ok(Self {
            target: target.clone(),
            event,
            callback,
        })
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref());
    }
}

type IntersectionCallback = Closure<dyn FnMut(js_sys::Array, IntersectionObserver)>;

/// Intersection observer that disconnects on drop.
pub struct IntersectionWatch {
    observer: IntersectionObserver,
    _callback: IntersectionCallback,
}

impl IntersectionWatch {
    pub fn new(
        threshold: f64,
        root_margin: Option<&str>,
        mut handler: impl FnMut(IntersectionObserverEntry, &IntersectionObserver) + 'static,
    ) -> Result<Self, BehaviorError> {
        let callback = Closure::<dyn FnMut(js_sys::Array, IntersectionObserver)>::new(
            move |entries: js_sys::Array, observer: IntersectionObserver| {
                for entry in entries.iter() {
                    handler(entry.unchecked_into::<IntersectionObserverEntry>(), &observer);
                }
            },
        );

        let options = IntersectionObserverInit::new();
        options.set_threshold(&threshold.into());
        if let Some(root_margin) = root_margin {
            options.set_root_margin(root_margin);
        }

        let observer = IntersectionObserver::new_with_options(
            callback.as_ref().unchecked_ref(),
            &options,
        )?;

        Ok(Self {
            observer,
            _callback: callback,
        })
    }

    pub fn observe(&self, target: &Element) {
        self.observer.observe(target);
    }
}

impl Drop for IntersectionWatch {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}

type ResizeCallback = Closure<dyn FnMut(js_sys::Array, ResizeObserver)>;

/// Resize observer that disconnects on drop.
pub struct ResizeWatch {
    observer: ResizeObserver,
    _callback: ResizeCallback,
}

impl ResizeWatch {
    pub fn observe(target: &Element, mut handler: impl FnMut() + 'static) -> Result<Self, BehaviorError> {
        let callback = Closure::<dyn FnMut(js_sys::Array, ResizeObserver)>::new(
            move |_entries: js_sys::Array, _observer: ResizeObserver| handler(),
        );
        let observer = ResizeObserver::new(callback.as_ref().unchecked_ref())?;
        observer.observe(target);

        Ok(Self {
            observer,
            _callback: callback,
        })
    }
}

impl Drop for ResizeWatch {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}
