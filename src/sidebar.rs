pub const SIDEBAR_SELECTOR: &str = ".hero-left";

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SidebarUpdate {
    /// Set `top` to this many pixels.
    Apply(f64),
    /// Remove the inline `top`.
    Clear,
}

/// Scroll-delta driven offset that lets a tall sidebar scroll with the page
/// until its bottom edge is visible, then stick.
#[derive(Clone, Debug, PartialEq)]
pub struct StickySidebar {
    last_y: f64,
    offset: f64,
    height: f64,
}

impl StickySidebar {
    pub fn new(scroll_y: f64, height: f64) -> Self {
        Self {
            last_y: scroll_y,
            offset: 0.0,
            height,
        }
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn resize(&mut self, height: f64) {
        self.height = height;
    }

    /// `active` is whether the desktop breakpoint currently matches.
    pub fn on_scroll(&mut self, scroll_y: f64, viewport_height: f64, active: bool) -> SidebarUpdate {
        let dy = scroll_y - self.last_y;
        self.last_y = scroll_y;

        if !active {
            self.offset = 0.0;
            return SidebarUpdate::Clear;
        }

        let min_offset = (viewport_height - self.height).min(0.0);
        self.offset = (self.offset - dy).clamp(min_offset, 0.0);
        SidebarUpdate::Apply(self.offset)
    }
}

#[cfg(target_arch = "wasm32")]
pub fn install(
    document: &web_sys::Document,
    config: &crate::config::SiteConfig,
) -> Result<Option<crate::dom::Handles>, crate::error::BehaviorError> {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::JsCast;
    use web_sys::HtmlElement;

    use crate::dom::{self, clear_style, set_style, EventSubscription, Handles, ResizeWatch};

    let Some(sidebar) = document
        .query_selector(SIDEBAR_SELECTOR)?
        .and_then(|element| element.dyn_into::<HtmlElement>().ok())
    else {
        return Ok(None);
    };

    let window = dom::window()?;
    let media_query = config.sidebar_media_query();
    let state = Rc::new(RefCell::new(StickySidebar::new(
        window.scroll_y()?,
        f64::from(sidebar.offset_height()),
    )));

    let mut handles = Handles::default();

    {
        let state = Rc::clone(&state);
        let observed = sidebar.clone();
        handles.push(ResizeWatch::observe(&sidebar, move || {
            state.borrow_mut().resize(f64::from(observed.offset_height()));
        })?);
    }

    {
        let scroll_window = window.clone();
        handles.push(EventSubscription::listen_passive(&window, "scroll", move |_event| {
            let scroll_y = scroll_window.scroll_y().unwrap_or_default();
            let viewport_height = scroll_window
                .inner_height()
                .ok()
                .and_then(|height| height.as_f64())
                .unwrap_or_default();
            let active = dom::media_matches(&media_query);

            let update = state.borrow_mut().on_scroll(scroll_y, viewport_height, active);
            match update {
                SidebarUpdate::Apply(offset) => set_style(&sidebar, "top", &format!("{offset}px")),
                SidebarUpdate::Clear => clear_style(&sidebar, "top"),
            }
        })?);
    }

    Ok(Some(handles))
}
