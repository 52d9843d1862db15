use std::time::Duration;

pub const SLIDESHOW_SELECTOR: &str = ".slideshow";
pub const SLIDE_SELECTOR: &str = "img, video";
pub const ACTIVE_CLASS: &str = "active";
pub const SWIPE_THRESHOLD_PX: f64 = 40.0;

const MIN_SLIDES: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Idle,
    Running,
}

/// The one advance mechanism armed for the current slide.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pending {
    Timer,
    VideoEnd(usize),
}

/// Side effects the page has to perform, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    Activate(usize),
    Deactivate(usize),
    PlayFromStart(usize),
    Pause(usize),
    ListenEnded(usize),
    UnlistenEnded(usize),
    ArmTimer(Duration),
    CancelTimer,
}

#[derive(Debug)]
pub struct Slideshow {
    media: Vec<MediaKind>,
    index: usize,
    status: Status,
    pending: Option<Pending>,
    interval: Duration,
}

impl Slideshow {
    /// A slideshow needs at least two slides; fewer never activates.
    pub fn new(media: Vec<MediaKind>, interval: Duration) -> Option<Self> {
        if media.len() < MIN_SLIDES {
            return None;
        }

        Some(Self {
            media,
            index: 0,
            status: Status::Idle,
            pending: None,
            interval,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn pending(&self) -> Option<Pending> {
        self.pending
    }

    pub fn open(&mut self) -> Vec<Effect> {
        if self.status == Status::Running {
            return Vec::new();
        }

        self.status = Status::Running;
        self.schedule()
    }

    /// Moves `direction` slides (wrapping) and reschedules. Ignored while
    /// idle.
    pub fn go(&mut self, direction: isize) -> Vec<Effect> {
        if self.status != Status::Running {
            return Vec::new();
        }

        let mut effects = self.release_current();
        effects.push(Effect::Deactivate(self.index));

        let count = self.media.len() as isize;
        self.index = (self.index as isize + direction).rem_euclid(count) as usize;

        effects.push(Effect::Activate(self.index));
        effects.extend(self.schedule());
        effects
    }

    pub fn on_timer(&mut self) -> Vec<Effect> {
        if self.pending != Some(Pending::Timer) {
            return Vec::new();
        }

        self.pending = None;
        self.go(1)
    }

    pub fn on_video_ended(&mut self, slide: usize) -> Vec<Effect> {
        if self.pending != Some(Pending::VideoEnd(slide)) {
            return Vec::new();
        }

        self.pending = None;
        self.go(1)
    }

    pub fn swipe(&mut self, dx: f64, dy: f64) -> Vec<Effect> {
        match swipe_direction(dx, dy) {
            Some(direction) => self.go(direction),
            None => Vec::new(),
        }
    }

    /// Stops playback and rewinds to the first slide for the next open.
    pub fn reset(&mut self) -> Vec<Effect> {
        self.status = Status::Idle;

        let mut effects = self.release_current();
        effects.push(Effect::Deactivate(self.index));
        self.index = 0;
        effects.push(Effect::Activate(0));
        effects
    }

    fn schedule(&mut self) -> Vec<Effect> {
        if self.status != Status::Running {
            return Vec::new();
        }

        match self.media[self.index] {
            MediaKind::Video => {
                self.pending = Some(Pending::VideoEnd(self.index));
                vec![
                    Effect::PlayFromStart(self.index),
                    Effect::ListenEnded(self.index),
                ]
            }
            MediaKind::Image => {
                self.pending = Some(Pending::Timer);
                vec![Effect::ArmTimer(self.interval)]
            }
        }
    }

    fn release_current(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();

        if self.pending.take() == Some(Pending::Timer) {
            effects.push(Effect::CancelTimer);
        }
        if self.media[self.index] == MediaKind::Video {
            effects.push(Effect::UnlistenEnded(self.index));
            effects.push(Effect::Pause(self.index));
        }

        effects
    }
}

/// Leftward swipe goes forward, rightward goes back. Short or mostly
/// vertical gestures are ignored.
pub fn swipe_direction(dx: f64, dy: f64) -> Option<isize> {
    if dx.abs() <= SWIPE_THRESHOLD_PX || dx.abs() <= dy.abs() {
        return None;
    }

    Some(if dx < 0.0 { 1 } else { -1 })
}

#[cfg(target_arch = "wasm32")]
pub fn install(
    document: &web_sys::Document,
    interval: Duration,
) -> Result<Option<crate::dom::Handles>, crate::error::BehaviorError> {
    use crate::dom::{query_all, Handles};

    let mut handles = Handles::default();
    for show in query_all(document, SLIDESHOW_SELECTOR)? {
        if let Some(player) = player::install(&show, interval)? {
            handles.extend(player);
        }
    }

    Ok(Some(handles))
}

#[cfg(target_arch = "wasm32")]
mod player {
    use std::cell::{Cell, RefCell};
    use std::rc::{Rc, Weak};
    use std::time::Duration;

    use gloo_timers::callback::Timeout;
    use wasm_bindgen::JsCast;
    use web_sys::{Element, Event, HtmlMediaElement, TouchEvent};

    use super::{Effect, MediaKind, Slideshow, ACTIVE_CLASS, SLIDE_SELECTOR};
    use crate::dom::{add_class, closest, query_all_within, remove_class, EventSubscription, Handles};
    use crate::error::BehaviorError;
    use crate::modal::OPEN_SLIDESHOW_EVENT;

    struct Player {
        machine: Slideshow,
        slides: Vec<Element>,
        timer: Option<Timeout>,
        ended: Option<EventSubscription>,
    }

    type SharedPlayer = Rc<RefCell<Player>>;

    pub fn install(show: &Element, interval: Duration) -> Result<Option<Handles>, BehaviorError> {
        let slides = query_all_within(show, SLIDE_SELECTOR)?;
        let kinds = slides
            .iter()
            .map(|slide| {
                if slide.tag_name().eq_ignore_ascii_case("video") {
                    MediaKind::Video
                } else {
                    MediaKind::Image
                }
            })
            .collect();

        let Some(machine) = Slideshow::new(kinds, interval) else {
            return Ok(None);
        };
        let Some(dialog) = closest(show, "dialog") else {
            return Ok(None);
        };

        let player: SharedPlayer = Rc::new(RefCell::new(Player {
            machine,
            slides,
            timer: None,
            ended: None,
        }));
        let mut handles = Handles::default();

        let touch_start = Rc::new(Cell::new((0.0_f64, 0.0_f64)));
        {
            let touch_start = Rc::clone(&touch_start);
            handles.push(EventSubscription::listen_passive(show, "touchstart", move |event: Event| {
                if let Some(point) = first_touch(&event, false) {
                    touch_start.set(point);
                }
            })?);
        }
        {
            let player = Rc::clone(&player);
            handles.push(EventSubscription::listen(show, "touchend", move |event: Event| {
                let Some((x, y)) = first_touch(&event, true) else {
                    return;
                };
                let (start_x, start_y) = touch_start.get();
                dispatch(&player, |machine| machine.swipe(x - start_x, y - start_y));
            })?);
        }
        {
            let player = Rc::clone(&player);
            handles.push(EventSubscription::listen(&dialog, "close", move |_| {
                dispatch(&player, Slideshow::reset);
            })?);
        }
        {
            let player = Rc::clone(&player);
            handles.push(EventSubscription::listen(show, OPEN_SLIDESHOW_EVENT, move |_| {
                dispatch(&player, Slideshow::open);
            })?);
        }

        Ok(Some(handles))
    }

    fn first_touch(event: &Event, changed: bool) -> Option<(f64, f64)> {
        let event = event.dyn_ref::<TouchEvent>()?;
        let touches = if changed {
            event.changed_touches()
        } else {
            event.touches()
        };
        let touch = touches.get(0)?;
        Some((f64::from(touch.client_x()), f64::from(touch.client_y())))
    }

    fn dispatch(player: &SharedPlayer, step: impl FnOnce(&mut Slideshow) -> Vec<Effect>) {
        let effects = step(&mut player.borrow_mut().machine);
        for effect in effects {
            apply(player, effect);
        }
    }

    fn slide(player: &SharedPlayer, index: usize) -> Option<Element> {
        player.borrow().slides.get(index).cloned()
    }

    fn media(player: &SharedPlayer, index: usize) -> Option<HtmlMediaElement> {
        slide(player, index)?.dyn_into::<HtmlMediaElement>().ok()
    }

    fn apply(player: &SharedPlayer, effect: Effect) {
        match effect {
            Effect::Activate(index) => {
                if let Some(slide) = slide(player, index) {
                    add_class(&slide, ACTIVE_CLASS);
                }
            }
            Effect::Deactivate(index) => {
                if let Some(slide) = slide(player, index) {
                    remove_class(&slide, ACTIVE_CLASS);
                }
            }
            Effect::PlayFromStart(index) => {
                if let Some(video) = media(player, index) {
                    video.set_current_time(0.0);
                    let _ = video.play();
                }
            }
            Effect::Pause(index) => {
                if let Some(video) = media(player, index) {
                    let _ = video.pause();
                }
            }
            Effect::ListenEnded(index) => {
                let Some(video) = slide(player, index) else {
                    return;
                };
                let weak = Rc::downgrade(player);
                let subscription = EventSubscription::listen(&video, "ended", move |_| {
                    with_player(&weak, |player| {
                        dispatch(player, |machine| machine.on_video_ended(index));
                    });
                });
                match subscription {
                    Ok(subscription) => player.borrow_mut().ended = Some(subscription),
                    Err(error) => tracing::warn!(%error, "slideshow: could not watch video end"),
                }
            }
            Effect::UnlistenEnded(_) => {
                let previous = player.borrow_mut().ended.take();
                drop(previous);
            }
            Effect::ArmTimer(interval) => {
                let weak = Rc::downgrade(player);
                let millis = u32::try_from(interval.as_millis()).unwrap_or(u32::MAX);
                let timer = Timeout::new(millis, move || {
                    with_player(&weak, |player| dispatch(player, Slideshow::on_timer));
                });
                let previous = player.borrow_mut().timer.replace(timer);
                drop(previous);
            }
            Effect::CancelTimer => {
                let previous = player.borrow_mut().timer.take();
                drop(previous);
            }
        }
    }

    fn with_player(weak: &Weak<RefCell<Player>>, action: impl FnOnce(&SharedPlayer)) {
        if let Some(player) = weak.upgrade() {
            action(&player);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(5_000);

    fn images(count: usize) -> Slideshow {
        Slideshow::new(vec![MediaKind::Image; count], INTERVAL).expect("enough slides")
    }

    #[test]
    fn fewer_than_two_slides_never_activates() {
        assert!(Slideshow::new(vec![], INTERVAL).is_none());
        assert!(Slideshow::new(vec![MediaKind::Video], INTERVAL).is_none());
    }

    #[test]
    fn open_arms_timer_for_image() {
        let mut show = images(3);

        assert_eq!(show.open(), vec![Effect::ArmTimer(INTERVAL)]);
        assert_eq!(show.status(), Status::Running);
        assert_eq!(show.pending(), Some(Pending::Timer));
    }

    #[test]
    fn open_plays_video_and_waits_for_end() {
        let mut show =
            Slideshow::new(vec![MediaKind::Video, MediaKind::Image], INTERVAL).expect("two slides");

        assert_eq!(
            show.open(),
            vec![Effect::PlayFromStart(0), Effect::ListenEnded(0)]
        );
        assert_eq!(show.pending(), Some(Pending::VideoEnd(0)));
    }

    #[test]
    fn advancing_wraps_around() {
        let mut show = images(3);
        show.open();

        show.go(1);
        show.go(1);
        assert_eq!(show.index(), 2);

        show.go(1);
        assert_eq!(show.index(), 0);

        show.go(-1);
        assert_eq!(show.index(), 2);
    }

    #[test]
    fn go_is_ignored_while_idle() {
        let mut show = images(3);

        assert!(show.go(1).is_empty());
        assert_eq!(show.index(), 0);
    }

    #[test]
    fn manual_advance_cancels_timer_before_rescheduling() {
        let mut show = images(2);
        show.open();

        assert_eq!(
            show.go(1),
            vec![
                Effect::CancelTimer,
                Effect::Deactivate(0),
                Effect::Activate(1),
                Effect::ArmTimer(INTERVAL),
            ]
        );
    }

    #[test]
    fn leaving_a_video_stops_listening_and_pauses_it() {
        let mut show =
            Slideshow::new(vec![MediaKind::Video, MediaKind::Image], INTERVAL).expect("two slides");
        show.open();

        assert_eq!(
            show.go(1),
            vec![
                Effect::UnlistenEnded(0),
                Effect::Pause(0),
                Effect::Deactivate(0),
                Effect::Activate(1),
                Effect::ArmTimer(INTERVAL),
            ]
        );
        assert_eq!(show.pending(), Some(Pending::Timer));
    }

    #[test]
    fn timer_advances_only_when_armed() {
        let mut show = images(2);
        assert!(show.on_timer().is_empty());

        show.open();
        let effects = show.on_timer();
        assert_eq!(show.index(), 1);
        assert!(!effects.contains(&Effect::CancelTimer));
    }

    #[test]
    fn stale_video_end_is_ignored() {
        let mut show = Slideshow::new(
            vec![MediaKind::Video, MediaKind::Video, MediaKind::Image],
            INTERVAL,
        )
        .expect("three slides");
        show.open();
        show.go(1);

        assert!(show.on_video_ended(0).is_empty());
        assert_eq!(show.index(), 1);

        show.on_video_ended(1);
        assert_eq!(show.index(), 2);
        assert_eq!(show.pending(), Some(Pending::Timer));
    }

    #[test]
    fn swipe_needs_horizontal_distance_past_threshold() {
        assert_eq!(swipe_direction(-41.0, 5.0), Some(1));
        assert_eq!(swipe_direction(60.0, -10.0), Some(-1));
        assert_eq!(swipe_direction(-40.0, 0.0), None);
        assert_eq!(swipe_direction(50.0, 80.0), None);
    }

    #[test]
    fn swipe_moves_running_show() {
        let mut show = images(3);
        show.open();

        show.swipe(-100.0, 4.0);
        assert_eq!(show.index(), 1);
        show.swipe(100.0, 4.0);
        assert_eq!(show.index(), 0);
        show.swipe(10.0, 0.0);
        assert_eq!(show.index(), 0);
    }

    #[test]
    fn reset_rewinds_and_stops() {
        let mut show = images(3);
        show.open();
        show.go(1);

        assert_eq!(
            show.reset(),
            vec![Effect::CancelTimer, Effect::Deactivate(1), Effect::Activate(0)]
        );
        assert_eq!(show.index(), 0);
        assert_eq!(show.status(), Status::Idle);
        assert_eq!(show.pending(), None);
        assert!(show.go(1).is_empty());
    }

    #[test]
    fn reopening_after_reset_starts_from_first_slide() {
        let mut show = images(3);
        show.open();
        show.go(1);
        show.reset();

        assert_eq!(show.open(), vec![Effect::ArmTimer(INTERVAL)]);
        assert_eq!(show.index(), 0);
    }
}
