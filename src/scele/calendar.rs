use super::{EventReference, Session, TIME_MARKER};
use crate::dom::{self, Query};
use crate::{ExclusionRules, Scraper, SyncError};
use itertools::Itertools;
use lazy_static::lazy_static;
use reqwest::Url;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

const CALENDAR_PATH: &str = "calendar/view.php?view=month";

const E: &str = "Invalid selector";
lazy_static! {
    static ref LI: Selector = Selector::parse("li").expect(E);
}

/// Month view of the calendar. Yields one reference per deadline link whose
/// label survives the keyword filter, in page order.
#[derive(Debug)]
pub struct CalendarPage<'a> {
    pub page_url: &'a Url,
    pub rules: &'a ExclusionRules,
}

impl Scraper for CalendarPage<'_> {
    type Output = Vec<EventReference>;

    fn scrape(&self, doc: &Html) -> Result<Vec<EventReference>, SyncError> {
        Ok(doc
            .find_all(&LI)
            .into_iter()
            .filter_map(|li| {
                dom::child_elements(li).find(|child| {
                    dom::attribute(*child, "href").map_or(false, |href| href.contains(TIME_MARKER))
                })
            })
            .filter(|link| {
                let label = dom::text(*link);
                if self.rules.matches_label(&label) {
                    debug!("Skip excluded event {:?}", label.trim());
                    false
                } else {
                    true
                }
            })
            .filter_map(|link| dom::attribute(link, "href"))
            .map(str::trim)
            .filter_map(|href| match self.page_url.join(href) {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!("Ignore malformed event link {}: {}", href, e);
                    None
                }
            })
            .unique()
            .map(EventReference::new)
            .collect())
    }
}

pub async fn list_upcoming_events(
    session: &Session,
    rules: &ExclusionRules,
) -> Result<impl Iterator<Item = EventReference>, SyncError> {
    info!("Fetching calendar events");
    let page_url = session.url(CALENDAR_PATH)?;
    let html = session.get_html(&page_url).await?;

    let references = {
        let doc = Html::parse_document(&html);
        CalendarPage {
            page_url: &page_url,
            rules,
        }
        .scrape(&doc)?
    };

    info!("Found {} candidate events", references.len());
    Ok(references.into_iter())
}
