use std::collections::HashSet;
use std::time::Duration;

pub const REVEAL_SELECTOR: &str = ".tl-entry, .project, .github-stats, .oss, .uses, .map";
pub const STAGGER_SELECTOR: &str = ".tl-entry";
pub const VISIBLE_CLASS: &str = "visible";
pub const REVEAL_THRESHOLD: f64 = 0.15;
pub const REVEAL_ROOT_MARGIN: &str = "0px 0px -40px 0px";

const STAGGER_STEP: Duration = Duration::from_millis(50);
const TRANSITION_SETTLE: Duration = Duration::from_millis(500);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevealAction {
    /// First time the node is seen: show it and clear its stagger delay
    /// once the entrance transition has run.
    FirstReveal,
    Show,
    Hide,
}

/// Write-once record of nodes that have been revealed.
#[derive(Debug, Default)]
pub struct RevealTracker {
    revealed: HashSet<usize>,
}

impl RevealTracker {
    pub fn observe(&mut self, node: usize, intersecting: bool) -> RevealAction {
        if intersecting && self.revealed.insert(node) {
            return RevealAction::FirstReveal;
        }

        if intersecting {
            RevealAction::Show
        } else {
            RevealAction::Hide
        }
    }

    pub fn is_revealed(&self, node: usize) -> bool {
        self.revealed.contains(&node)
    }
}

/// Index of `target` among the nodes handed to an observer. Observer entries
/// carry the node itself, so this maps them back without marking the page.
pub fn observed_index<T: PartialEq>(observed: &[T], target: &T) -> Option<usize> {
    observed.iter().position(|node| node == target)
}

pub fn stagger_delay(index: usize) -> Duration {
    STAGGER_STEP * u32::try_from(index).unwrap_or(u32::MAX)
}

pub fn format_delay(delay: Duration) -> String {
    format!("{}ms", delay.as_millis())
}

/// Reads a CSS time value such as `0.15s` or `150ms`. Anything else counts
/// as no delay.
pub fn parse_delay(value: &str) -> Duration {
    let value = value.trim();
    let millis = if let Some(millis) = value.strip_suffix("ms") {
        millis.trim().parse::<f64>().ok()
    } else if let Some(seconds) = value.strip_suffix('s') {
        seconds.trim().parse::<f64>().ok().map(|seconds| seconds * 1_000.0)
    } else {
        None
    };

    millis
        .filter(|millis| millis.is_finite() && *millis > 0.0)
        .map(|millis| Duration::from_millis(millis.round() as u64))
        .unwrap_or(Duration::ZERO)
}

pub fn delay_reset_after(delay: Duration) -> Duration {
    delay + TRANSITION_SETTLE
}

#[cfg(target_arch = "wasm32")]
pub fn install(document: &web_sys::Document) -> Result<Option<crate::dom::Handles>, crate::error::BehaviorError> {
    use std::cell::RefCell;
    use std::rc::Rc;

    use gloo_timers::callback::Timeout;

    use crate::dom::{add_class, query_all, remove_class, set_style, style_value, Handles, IntersectionWatch};

    for (index, entry) in query_all(document, STAGGER_SELECTOR)?.iter().enumerate() {
        set_style(entry, "transition-delay", &format_delay(stagger_delay(index)));
    }

    let targets = query_all(document, REVEAL_SELECTOR)?;
    if targets.is_empty() {
        return Ok(None);
    }

    let observed = targets.clone();
    let tracker = Rc::new(RefCell::new(RevealTracker::default()));
    let watch = IntersectionWatch::new(REVEAL_THRESHOLD, Some(REVEAL_ROOT_MARGIN), move |entry, _| {
        let target = entry.target();
        let Some(node) = observed_index(&observed, &target) else {
            return;
        };

        let action = tracker.borrow_mut().observe(node, entry.is_intersecting());
        match action {
            RevealAction::FirstReveal => {
                add_class(&target, VISIBLE_CLASS);
                let delay = parse_delay(&style_value(&target, "transition-delay"));
                let wait = u32::try_from(delay_reset_after(delay).as_millis()).unwrap_or(u32::MAX);
                Timeout::new(wait, move || set_style(&target, "transition-delay", "0s")).forget();
            }
            RevealAction::Show => add_class(&target, VISIBLE_CLASS),
            RevealAction::Hide => remove_class(&target, VISIBLE_CLASS),
        }
    })?;

    for target in &targets {
        watch.observe(target);
    }
    tracing::debug!(count = targets.len(), "reveal: observing elements");

    let mut handles = Handles::default();
    handles.push(watch);
    Ok(Some(handles))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_intersection_reveals_once() {
        let mut tracker = RevealTracker::default();

        assert_eq!(tracker.observe(7, true), RevealAction::FirstReveal);
        assert_eq!(tracker.observe(7, true), RevealAction::Show);
        assert!(tracker.is_revealed(7));
    }

    #[test]
    fn leaving_viewport_hides_but_keeps_membership() {
        let mut tracker = RevealTracker::default();

        tracker.observe(1, true);
        assert_eq!(tracker.observe(1, false), RevealAction::Hide);
        assert!(tracker.is_revealed(1));
        assert_eq!(tracker.observe(1, true), RevealAction::Show);
    }

    #[test]
    fn never_intersecting_node_is_not_revealed() {
        let mut tracker = RevealTracker::default();

        assert_eq!(tracker.observe(3, false), RevealAction::Hide);
        assert!(!tracker.is_revealed(3));
        assert_eq!(tracker.observe(3, true), RevealAction::FirstReveal);
    }

    #[test]
    fn observer_entries_map_back_to_their_position() {
        let observed = ["timeline", "project", "map"];

        assert_eq!(observed_index(&observed, &"project"), Some(1));
        assert_eq!(observed_index(&observed, &"footer"), None);
    }

    #[test]
    fn nodes_are_tracked_by_position_without_page_markers() {
        let observed = ["timeline", "project"];
        let mut tracker = RevealTracker::default();

        let node = observed_index(&observed, &"project").expect("project is observed");
        assert_eq!(tracker.observe(node, true), RevealAction::FirstReveal);
        assert!(tracker.is_revealed(1));
        assert!(!tracker.is_revealed(0));
    }

    #[test]
    fn stagger_grows_fifty_milliseconds_per_entry() {
        assert_eq!(stagger_delay(0), Duration::ZERO);
        assert_eq!(stagger_delay(3), Duration::from_millis(150));
        assert_eq!(format_delay(stagger_delay(3)), "150ms");
    }

    #[test]
    fn delay_parsing_accepts_seconds_and_milliseconds() {
        assert_eq!(parse_delay("150ms"), Duration::from_millis(150));
        assert_eq!(parse_delay("0.25s"), Duration::from_millis(250));
        assert_eq!(parse_delay(""), Duration::ZERO);
        assert_eq!(parse_delay("soon"), Duration::ZERO);
    }

    #[test]
    fn delay_reset_waits_for_the_transition() {
        assert_eq!(
            delay_reset_after(Duration::from_millis(100)),
            Duration::from_millis(600)
        );
    }
}
