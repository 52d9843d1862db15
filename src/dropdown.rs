pub const OPEN_CLASS: &str = "open";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropdownAction {
    Toggle,
    Close,
    Keep,
}

/// Decides what one document click does to the dropdown. The toggle lives
/// inside the wrapper, so a single decision covers both the toggle click and
/// the outside-click close without depending on listener order.
pub fn click_action(inside_toggle: bool, inside_wrapper: bool) -> DropdownAction {
    if inside_toggle {
        DropdownAction::Toggle
    } else if inside_wrapper {
        DropdownAction::Keep
    } else {
        DropdownAction::Close
    }
}

#[cfg(target_arch = "wasm32")]
pub fn install(document: &web_sys::Document) -> Result<Option<crate::dom::Handles>, crate::error::BehaviorError> {
    use crate::dom::{closest, event_element, EventSubscription, Handles};

    let (Some(toggle), Some(dropdown)) = (
        document.get_element_by_id("cv-toggle"),
        document.get_element_by_id("cv-dropdown"),
    ) else {
        return Ok(None);
    };

    let on_click = move |event: web_sys::Event| {
        let Some(target) = event_element(&event) else {
            return;
        };
        let inside_toggle = toggle.contains(Some(target.as_ref()));
        let inside_wrapper = closest(&target, ".cv-wrapper").is_some();

        match click_action(inside_toggle, inside_wrapper) {
            DropdownAction::Toggle => {
                let _ = dropdown.class_list().toggle(OPEN_CLASS);
            }
            DropdownAction::Close => {
                let _ = dropdown.class_list().remove_1(OPEN_CLASS);
            }
            DropdownAction::Keep => {}
        }
    };

    let mut handles = Handles::default();
    handles.push(EventSubscription::listen(document, "click", on_click)?);
    Ok(Some(handles))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_click_flips_even_though_it_is_inside_wrapper() {
        assert_eq!(click_action(true, true), DropdownAction::Toggle);
    }

    #[test]
    fn click_inside_panel_keeps_state() {
        assert_eq!(click_action(false, true), DropdownAction::Keep);
    }

    #[test]
    fn click_outside_wrapper_closes() {
        assert_eq!(click_action(false, false), DropdownAction::Close);
    }
}
