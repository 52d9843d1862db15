use std::collections::HashSet;
use std::time::Duration;

pub const TYPING_CLASS: &str = "typing";
pub const TYPEWRITER_THRESHOLD: f64 = 0.15;
pub const START_DELAY: Duration = Duration::from_millis(500);
pub const CLEANUP_DELAY: Duration = Duration::from_millis(600);

const PER_CHARACTER: Duration = Duration::from_millis(60);

/// Snapshot of a heading's subtree: text, or an element that is either
/// rendered or has `display: none`.
#[derive(Clone, Debug, PartialEq)]
pub enum Fragment {
    Text(String),
    Element { displayed: bool, children: Vec<Fragment> },
}

pub fn visible_text(fragments: &[Fragment]) -> String {
    let mut text = String::new();
    collect_visible_text(fragments, &mut text);
    text
}

fn collect_visible_text(fragments: &[Fragment], text: &mut String) {
    for fragment in fragments {
        match fragment {
            Fragment::Text(value) => text.push_str(value),
            Fragment::Element {
                displayed: true,
                children,
            } => collect_visible_text(children, text),
            Fragment::Element { displayed: false, .. } => {}
        }
    }
}

pub fn visible_char_count(fragments: &[Fragment]) -> usize {
    visible_text(fragments).chars().count()
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypingPlan {
    pub characters: usize,
    pub width_px: f64,
}

impl TypingPlan {
    /// No plan for a heading without visible characters.
    pub fn new(characters: usize, width_px: f64) -> Option<Self> {
        if characters == 0 {
            return None;
        }

        Some(Self {
            characters,
            width_px,
        })
    }

    pub fn duration(&self) -> Duration {
        PER_CHARACTER * u32::try_from(self.characters).unwrap_or(u32::MAX)
    }

    pub fn easing(&self) -> String {
        format!("steps({})", self.characters)
    }

    pub fn to_width(&self) -> String {
        format!("{}px", self.width_px)
    }
}

/// Lets each section start its heading animation at most once.
#[derive(Debug, Default)]
pub struct TypewriterGate {
    triggered: HashSet<usize>,
}

impl TypewriterGate {
    pub fn trigger(&mut self, section: usize) -> bool {
        self.triggered.insert(section)
    }
}

#[cfg(target_arch = "wasm32")]
pub fn install(document: &web_sys::Document) -> Result<Option<crate::dom::Handles>, crate::error::BehaviorError> {
    use std::cell::RefCell;
    use std::rc::Rc;

    use gloo_timers::callback::Timeout;

    use crate::dom::{prefers_reduced_motion, query_all, Handles, IntersectionWatch};
    use crate::reveal::observed_index;

    if prefers_reduced_motion() {
        tracing::debug!("typewriter: reduced motion requested, skipping");
        return Ok(None);
    }

    let sections: Vec<web_sys::Element> = query_all(document, "h2")?
        .iter()
        .filter_map(|heading| heading.parent_element())
        .collect();
    if sections.is_empty() {
        return Ok(None);
    }

    let observed = sections.clone();
    let gate = Rc::new(RefCell::new(TypewriterGate::default()));
    let watch = IntersectionWatch::new(TYPEWRITER_THRESHOLD, None, move |entry, observer| {
        if !entry.is_intersecting() {
            return;
        }

        let section = entry.target();
        observer.unobserve(&section);

        let Some(id) = observed_index(&observed, &section) else {
            return;
        };
        if !gate.borrow_mut().trigger(id) {
            return;
        }

        let Ok(Some(heading)) = section.query_selector("h2") else {
            return;
        };
        let wait = u32::try_from(START_DELAY.as_millis()).unwrap_or(u32::MAX);
        Timeout::new(wait, move || typewrite(&heading)).forget();
    })?;

    for section in &sections {
        watch.observe(section);
    }

    let mut handles = Handles::default();
    handles.push(watch);
    Ok(Some(handles))
}

#[cfg(target_arch = "wasm32")]
fn snapshot(node: &web_sys::Node, window: &web_sys::Window) -> Vec<Fragment> {
    use wasm_bindgen::JsCast;
    use web_sys::{Element, Node};

    crate::dom::nodes(node.child_nodes())
        .into_iter()
        .filter_map(|child| match child.node_type() {
            Node::TEXT_NODE => Some(Fragment::Text(child.text_content().unwrap_or_default())),
            Node::ELEMENT_NODE => {
                let element = child.unchecked_ref::<Element>();
                let displayed = window
                    .get_computed_style(element)
                    .ok()
                    .flatten()
                    .and_then(|style| style.get_property_value("display").ok())
                    .map_or(true, |display| display != "none");
                let children = if displayed {
                    snapshot(&child, window)
                } else {
                    Vec::new()
                };
                Some(Fragment::Element { displayed, children })
            }
            _ => None,
        })
        .collect()
}

#[cfg(target_arch = "wasm32")]
fn typewrite(heading: &web_sys::Element) {
    use gloo_timers::callback::Timeout;
    use js_sys::{Array, Function, Object, Reflect};
    use wasm_bindgen::{closure::Closure, JsCast, JsValue};

    use crate::dom::{add_class, clear_style, remove_class, set_style};

    let Some(window) = web_sys::window() else {
        return;
    };

    let heading_js: &JsValue = heading.as_ref();
    cancel_animations(heading_js);

    set_style(heading, "max-width", "none");
    let width = heading.get_bounding_client_rect().width();
    clear_style(heading, "max-width");
    let Some(plan) = TypingPlan::new(visible_char_count(&snapshot(heading, &window)), width) else {
        return;
    };
    add_class(heading, TYPING_CLASS);

    let keyframe = |value: &str| {
        let frame = Object::new();
        let _ = Reflect::set(&frame, &JsValue::from_str("maxWidth"), &JsValue::from_str(value));
        frame
    };
    let keyframes = Array::of2(&keyframe("0px"), &keyframe(&plan.to_width()));

    let options = Object::new();
    let _ = Reflect::set(
        &options,
        &JsValue::from_str("duration"),
        &JsValue::from_f64(plan.duration().as_millis() as f64),
    );
    let _ = Reflect::set(&options, &JsValue::from_str("easing"), &JsValue::from_str(&plan.easing()));
    let _ = Reflect::set(&options, &JsValue::from_str("fill"), &JsValue::from_str("forwards"));

    let Some(animate) = Reflect::get(heading_js, &JsValue::from_str("animate"))
        .ok()
        .and_then(|value| value.dyn_into::<Function>().ok())
    else {
        remove_class(heading, TYPING_CLASS);
        return;
    };

    let Ok(animation) = animate.call2(heading_js, &keyframes, &options) else {
        remove_class(heading, TYPING_CLASS);
        return;
    };

    let finished_heading = heading.clone();
    let on_finish = Closure::once_into_js(move || {
        let wait = u32::try_from(CLEANUP_DELAY.as_millis()).unwrap_or(u32::MAX);
        Timeout::new(wait, move || remove_class(&finished_heading, TYPING_CLASS)).forget();
    });
    let _ = Reflect::set(&animation, &JsValue::from_str("onfinish"), &on_finish);
}

#[cfg(target_arch = "wasm32")]
fn cancel_animations(target: &wasm_bindgen::JsValue) {
    use js_sys::{Array, Function, Reflect};
    use wasm_bindgen::{JsCast, JsValue};

    let method = |object: &JsValue, name: &str| {
        Reflect::get(object, &JsValue::from_str(name))
            .ok()
            .and_then(|value| value.dyn_into::<Function>().ok())
    };

    let Some(running) = method(target, "getAnimations").and_then(|get| get.call0(target).ok()) else {
        return;
    };
    for animation in Array::from(&running).iter() {
        if let Some(cancel) = method(&animation, "cancel") {
            let _ = cancel.call0(&animation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Fragment {
        Fragment::Text(value.to_string())
    }

    fn element(displayed: bool, children: Vec<Fragment>) -> Fragment {
        Fragment::Element {
            displayed,
            children,
        }
    }

    #[test]
    fn hidden_subtrees_are_skipped() {
        let heading = vec![
            element(true, vec![text("Projects")]),
            element(false, vec![text("Projetos")]),
            text(" "),
            element(true, vec![element(false, vec![text("ignored")]), text("!")]),
        ];

        assert_eq!(visible_text(&heading), "Projects !");
        assert_eq!(visible_char_count(&heading), 10);
    }

    #[test]
    fn characters_are_counted_not_bytes() {
        assert_eq!(visible_char_count(&[text("Experiência")]), 11);
    }

    #[test]
    fn heading_with_only_hidden_text_gets_no_plan() {
        let heading = vec![element(false, vec![text("Sobre")])];

        assert_eq!(TypingPlan::new(visible_char_count(&heading), 120.0), None);
    }

    #[test]
    fn plan_types_one_step_per_character() {
        let plan = TypingPlan::new(8, 212.5).expect("non-empty heading has a plan");

        assert_eq!(plan.duration(), Duration::from_millis(480));
        assert_eq!(plan.easing(), "steps(8)");
        assert_eq!(plan.to_width(), "212.5px");
    }

    #[test]
    fn gate_triggers_each_section_once() {
        let mut gate = TypewriterGate::default();

        assert!(gate.trigger(0));
        assert!(gate.trigger(1));
        assert!(!gate.trigger(0));
    }

    #[test]
    fn sections_sharing_a_parent_trigger_once() {
        // Two headings in one section observe the same parent twice.
        let observed = ["about", "projects", "about"];
        let mut gate = TypewriterGate::default();

        let section = crate::reveal::observed_index(&observed, &"about").expect("about is observed");
        assert_eq!(section, 0);
        assert!(gate.trigger(section));
        assert!(!gate.trigger(section));
    }
}
