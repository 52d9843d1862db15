use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Deserialize;

use crate::error::FetchError;
use crate::http::{get_json, HttpClient};
use crate::preferences::Lang;

pub const GRID_ID: &str = "contrib-grid";
pub const MONTHS_ID: &str = "contrib-months";
pub const TOTAL_ID: &str = "gh-contrib-total";
pub const GRID_SELECTOR: &str = ".contrib-grid";
pub const CELL_CLASS: &str = "contrib-cell";
pub const TOOLTIP_CLASS: &str = "contrib-tooltip";

/// Horizontal distance between week columns, in pixels.
pub const COLUMN_STEP_PX: u32 = 13;

const WEEKS_BEFORE_CURRENT: i64 = 39;
const TOOLTIP_GAP_PX: f64 = 6.0;

const ENGLISH_MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const PORTUGUESE_MONTHS: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct ContributionPayload {
    #[serde(default)]
    pub contributions: Option<Vec<ContributionDay>>,
    #[serde(default)]
    pub total: Option<ContributionTotal>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ContributionDay {
    pub date: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub level: u8,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct ContributionTotal {
    #[serde(rename = "lastYear", default)]
    pub last_year: Option<u64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DayActivity {
    pub level: u8,
    pub count: u64,
}

/// Decoded contribution history, keyed by calendar day.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContributionGraph {
    pub total: u64,
    activity: HashMap<NaiveDate, DayActivity>,
}

impl ContributionGraph {
    /// Returns `None` when the payload carries no contribution list. The
    /// total prefers the service's `lastYear` figure over summing days.
    /// Days with unparsable dates are dropped.
    pub fn from_payload(payload: ContributionPayload) -> Option<Self> {
        let days = payload.contributions?;
        let total = payload
            .total
            .and_then(|total| total.last_year)
            .unwrap_or_else(|| days.iter().map(|day| day.count).sum());

        let activity = days
            .into_iter()
            .filter_map(|day| {
                let date = NaiveDate::parse_from_str(&day.date, "%Y-%m-%d").ok()?;
                Some((
                    date,
                    DayActivity {
                        level: day.level,
                        count: day.count,
                    },
                ))
            })
            .collect();

        Some(Self { total, activity })
    }

    pub fn activity(&self, date: NaiveDate) -> DayActivity {
        self.activity.get(&date).copied().unwrap_or_default()
    }

    pub fn layout(&self, today: NaiveDate) -> GraphLayout {
        let start = window_start(today);
        let mut cells = Vec::new();
        let mut months = Vec::new();
        let mut column = 0;
        let mut last_month = None;

        for date in start.iter_days().take_while(|date| *date <= today) {
            let is_sunday = date.weekday().num_days_from_sunday() == 0;
            if is_sunday && date != start {
                column += 1;
            }

            if is_sunday && last_month != Some(date.month()) {
                months.push(MonthLabel {
                    column,
                    month: date.month(),
                });
                last_month = Some(date.month());
            }

            let activity = self.activity(date);
            cells.push(GraphCell {
                date,
                column,
                level: activity.level,
                count: activity.count,
            });
        }

        GraphLayout { cells, months }
    }
}

/// First day shown: the Sunday that opens the week 39 weeks before the
/// current one.
pub fn window_start(today: NaiveDate) -> NaiveDate {
    let weekday = i64::from(today.weekday().num_days_from_sunday());
    today - Duration::days(WEEKS_BEFORE_CURRENT * 7 + weekday)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GraphLayout {
    pub cells: Vec<GraphCell>,
    pub months: Vec<MonthLabel>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GraphCell {
    pub date: NaiveDate,
    pub column: u32,
    pub level: u8,
    pub count: u64,
}

impl GraphCell {
    pub fn tooltip(&self, lang: Lang) -> String {
        let noun = if self.count == 1 {
            "contribution"
        } else {
            "contributions"
        };
        format!("{} {} — {}", self.count, noun, format_day(self.date, lang))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MonthLabel {
    pub column: u32,
    /// Calendar month, 1 through 12.
    pub month: u32,
}

impl MonthLabel {
    pub fn left_px(&self) -> u32 {
        self.column * COLUMN_STEP_PX
    }

    pub fn english(&self) -> &'static str {
        ENGLISH_MONTHS[month_index(self.month)]
    }

    pub fn portuguese(&self) -> String {
        capitalize(PORTUGUESE_MONTHS[month_index(self.month)])
    }

    pub fn inner_html(&self) -> String {
        format!(
            r#"<span lang="en">{}</span><span lang="pt">{}</span>"#,
            self.english(),
            self.portuguese()
        )
    }
}

fn month_index(month: u32) -> usize {
    (month.clamp(1, 12) - 1) as usize
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `Oct 17` in English, `17 de out` in Portuguese.
pub fn format_day(date: NaiveDate, lang: Lang) -> String {
    let month = month_index(date.month());
    match lang {
        Lang::En => format!("{} {}", ENGLISH_MONTHS[month], date.day()),
        Lang::Pt => format!("{} de {}", date.day(), PORTUGUESE_MONTHS[month]),
    }
}

/// Fixed-position anchor for the hover tooltip: horizontally centered on
/// the cell, just above its top edge.
pub fn tooltip_anchor(left: f64, width: f64, top: f64) -> (f64, f64) {
    (left + width / 2.0, top - TOOLTIP_GAP_PX)
}

pub async fn fetch_graph<C: HttpClient>(
    client: &C,
    url: &str,
) -> Result<Option<ContributionGraph>, FetchError> {
    let payload: ContributionPayload = get_json(client, url).await?;
    Ok(ContributionGraph::from_payload(payload))
}

#[cfg(target_arch = "wasm32")]
pub use self::page::install;

#[cfg(target_arch = "wasm32")]
mod page {
    use std::cell::RefCell;
    use std::rc::Rc;

    use web_sys::{Document, Element, Event};

    use super::*;
    use crate::config::SiteConfig;
    use crate::dom::{self, clear_style, closest, event_element, set_style, EventSubscription, Handles};
    use crate::error::BehaviorError;
    use crate::http::BrowserHttp;
    use crate::preferences::{DocumentHost, PagePreferences, PreferenceChange};

    type RenderedCells = Rc<RefCell<Vec<(Element, GraphCell)>>>;

    pub fn install(
        document: &Document,
        config: &SiteConfig,
        preferences: Rc<PagePreferences<DocumentHost>>,
    ) -> Result<Option<Handles>, BehaviorError> {
        let mut handles = Handles::default();
        let rendered: RenderedCells = Rc::new(RefCell::new(Vec::new()));

        {
            let rendered = Rc::clone(&rendered);
            handles.push(preferences.subscribe(move |change| {
                if let PreferenceChange::Lang(lang) = change {
                    for (element, cell) in rendered.borrow().iter() {
                        let _ = element.set_attribute("data-tooltip", &cell.tooltip(lang));
                    }
                }
            }));
        }

        if let Some(grid) = document.query_selector(GRID_SELECTOR)? {
            handles.extend(install_hover_tooltip(document, &grid)?);
        }

        let document = document.clone();
        let url = config.contributions_url();
        wasm_bindgen_futures::spawn_local(async move {
            let graph = match url {
                Ok(url) => fetch_graph(&BrowserHttp, url.as_str()).await,
                Err(error) => Err(FetchError::from(error)),
            };
            match graph {
                Ok(Some(graph)) => render(&document, &graph, preferences.lang(), &rendered),
                Ok(None) => tracing::debug!("contributions: payload has no contribution list"),
                Err(error) => tracing::debug!(%error, "contributions: fetch failed"),
            }
        });

        Ok(Some(handles))
    }

    fn render(document: &Document, graph: &ContributionGraph, lang: Lang, rendered: &RenderedCells) {
        let Some(grid) = document.get_element_by_id(GRID_ID) else {
            return;
        };

        if let Some(total) = document.get_element_by_id(TOTAL_ID) {
            total.set_text_content(Some(&graph.total.to_string()));
            dom::remove_class(&total, crate::github_stats::LOADING_CLASS);
        }

        let Some(today) = local_today() else {
            tracing::warn!("contributions: could not read local date");
            return;
        };
        let layout = graph.layout(today);

        if let Some(months) = document.get_element_by_id(MONTHS_ID) {
            for label in &layout.months {
                let Ok(span) = document.create_element("span") else {
                    continue;
                };
                span.set_inner_html(&label.inner_html());
                set_style(&span, "left", &format!("{}px", label.left_px()));
                let _ = months.append_child(&span);
            }
        }

        let mut cells = rendered.borrow_mut();
        for cell in layout.cells {
            let Ok(span) = document.create_element("span") else {
                continue;
            };
            span.set_class_name(CELL_CLASS);
            let _ = span.set_attribute("data-level", &cell.level.to_string());
            let _ = span.set_attribute("data-tooltip", &cell.tooltip(lang));
            let _ = grid.append_child(&span);
            cells.push((span, cell));
        }

        tracing::debug!(cells = cells.len(), total = graph.total, "contributions: rendered");
    }

    fn local_today() -> Option<NaiveDate> {
        let now = js_sys::Date::new_0();
        NaiveDate::from_ymd_opt(
            now.get_full_year() as i32,
            now.get_month() + 1,
            now.get_date(),
        )
    }

    fn install_hover_tooltip(document: &Document, grid: &Element) -> Result<Handles, BehaviorError> {
        let body = document.body().ok_or(BehaviorError::MissingDocument)?;
        let tooltip = document.create_element("div")?;
        tooltip.set_class_name(TOOLTIP_CLASS);
        set_style(&tooltip, "display", "none");
        body.append_child(&tooltip)?;

        let mut handles = Handles::default();

        {
            let tooltip = tooltip.clone();
            handles.push(EventSubscription::listen(grid, "mouseover", move |event: Event| {
                let Some(cell) = event_element(&event)
                    .and_then(|target| closest(&target, ".contrib-cell[data-tooltip]"))
                else {
                    return;
                };

                let rect = cell.get_bounding_client_rect();
                let (left, top) = tooltip_anchor(rect.left(), rect.width(), rect.top());
                tooltip.set_text_content(cell.get_attribute("data-tooltip").as_deref());
                clear_style(&tooltip, "display");
                set_style(&tooltip, "left", &format!("{left}px"));
                set_style(&tooltip, "top", &format!("{top}px"));
                set_style(&tooltip, "transform", "translate(-50%, -100%)");
            })?);
        }

        handles.push(EventSubscription::listen(grid, "mouseout", move |event: Event| {
            let over_cell = event_element(&event)
                .and_then(|target| closest(&target, ".contrib-cell"))
                .is_some();
            if over_cell {
                set_style(&tooltip, "display", "none");
            }
        })?);

        Ok(handles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::fake::FakeHttp;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn graph_from(json: &str) -> ContributionGraph {
        let payload: ContributionPayload = serde_json::from_str(json).expect("payload decodes");
        ContributionGraph::from_payload(payload).expect("contributions present")
    }

    fn empty_graph() -> ContributionGraph {
        graph_from(r#"{"contributions":[]}"#)
    }

    #[test]
    fn saturday_window_has_forty_full_weeks() {
        let today = date(2026, 10, 17);
        let layout = empty_graph().layout(today);

        assert_eq!(layout.cells.len(), 280);
        assert_eq!(layout.cells[0].date, date(2026, 1, 11));
        assert_eq!(layout.cells[0].date.weekday().num_days_from_sunday(), 0);
        assert_eq!(layout.cells.last().map(|cell| cell.date), Some(today));
        assert_eq!(layout.cells.last().map(|cell| cell.column), Some(39));
    }

    #[test]
    fn midweek_window_ends_on_today_with_partial_week() {
        let today = date(2026, 10, 14);
        let layout = empty_graph().layout(today);

        assert_eq!(window_start(today), date(2026, 1, 11));
        assert_eq!(layout.cells.len(), 277);
        assert_eq!(layout.cells.last().map(|cell| cell.column), Some(39));
    }

    #[test]
    fn sunday_window_has_single_day_last_column() {
        let today = date(2026, 10, 18);
        let layout = empty_graph().layout(today);

        assert_eq!(layout.cells.len(), 274);
        assert_eq!(layout.cells[0].column, 0);
        assert_eq!(layout.cells.last().map(|cell| cell.column), Some(39));
    }

    #[test]
    fn month_labels_sit_on_first_sunday_of_each_month() {
        let layout = empty_graph().layout(date(2026, 10, 17));

        let labels: Vec<(u32, u32)> = layout
            .months
            .iter()
            .map(|label| (label.column, label.month))
            .collect();
        assert_eq!(
            labels,
            vec![
                (0, 1),
                (3, 2),
                (7, 3),
                (12, 4),
                (16, 5),
                (21, 6),
                (25, 7),
                (29, 8),
                (34, 9),
                (38, 10)
            ]
        );

        let october = layout.months[9];
        assert_eq!(october.left_px(), 494);
        assert_eq!(october.english(), "Oct");
        assert_eq!(october.portuguese(), "Out");
        assert_eq!(
            october.inner_html(),
            r#"<span lang="en">Oct</span><span lang="pt">Out</span>"#
        );
    }

    #[test]
    fn missing_days_render_as_empty_cells() {
        let graph = graph_from(
            r#"{"contributions":[{"date":"2026-10-16","count":3,"level":2}],"total":{"lastYear":3}}"#,
        );
        let layout = graph.layout(date(2026, 10, 17));

        let today = layout.cells.last().expect("today is rendered");
        assert_eq!((today.level, today.count), (0, 0));
        assert_eq!(today.tooltip(Lang::En), "0 contributions — Oct 17");

        let yesterday = layout.cells[layout.cells.len() - 2];
        assert_eq!((yesterday.level, yesterday.count), (2, 3));
        assert_eq!(yesterday.tooltip(Lang::En), "3 contributions — Oct 16");
    }

    #[test]
    fn tooltip_wording_follows_count_and_language() {
        let cell = GraphCell {
            date: date(2026, 5, 3),
            column: 16,
            level: 1,
            count: 1,
        };

        assert_eq!(cell.tooltip(Lang::En), "1 contribution — May 3");
        assert_eq!(cell.tooltip(Lang::Pt), "1 contribution — 3 de mai");
        assert_eq!(format_day(date(2026, 10, 17), Lang::Pt), "17 de out");
    }

    #[test]
    fn total_prefers_last_year_figure() {
        let graph = graph_from(
            r#"{"contributions":[{"date":"2026-10-16","count":3,"level":2}],"total":{"lastYear":412}}"#,
        );
        assert_eq!(graph.total, 412);
    }

    #[test]
    fn total_falls_back_to_sum_of_days() {
        let graph = graph_from(
            r#"{"contributions":[
                {"date":"2026-10-15","count":4,"level":2},
                {"date":"not-a-date","count":2,"level":1},
                {"date":"2026-10-16","count":3,"level":2}
            ],"total":{}}"#,
        );

        assert_eq!(graph.total, 9);
        assert_eq!(graph.activity(date(2026, 10, 15)).count, 4);
    }

    #[test]
    fn payload_without_contributions_renders_nothing() {
        let payload: ContributionPayload =
            serde_json::from_str(r#"{"total":{"lastYear":10}}"#).expect("payload decodes");
        assert_eq!(ContributionGraph::from_payload(payload), None);
    }

    #[test]
    fn tooltip_is_centered_above_cell() {
        assert_eq!(tooltip_anchor(100.0, 10.0, 50.0), (105.0, 44.0));
    }

    #[tokio::test]
    async fn fetch_decodes_graph_and_surfaces_failures() {
        let url = "https://github-contributions-api.jogruber.de/v4/paulofilip3?y=last";
        let client = FakeHttp::default().respond(
            url,
            200,
            r#"{"total":{"lastYear":5},"contributions":[{"date":"2026-10-17","count":5,"level":3}]}"#,
        );

        let graph = fetch_graph(&client, url)
            .await
            .expect("request succeeds")
            .expect("contributions present");
        assert_eq!(graph.total, 5);
        assert_eq!(graph.activity(date(2026, 10, 17)).level, 3);

        let failing = FakeHttp::default().respond(url, 502, "");
        assert!(matches!(
            fetch_graph(&failing, url).await,
            Err(FetchError::Status { status: 502, .. })
        ));
    }
}
