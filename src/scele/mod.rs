mod calendar;
mod event;
mod session;

pub use calendar::{list_upcoming_events, CalendarPage};
pub use event::{extract_task, EventPage};
pub use session::{LoginPage, Session, SESSION_COOKIE};

use crate::{utils, SyncError};
use chrono::{DateTime, FixedOffset};
use lazy_regex::regex;
use reqwest::Url;
use std::fmt;

/// Query marker carried by every deadline link on the calendar.
pub(crate) const TIME_MARKER: &str = "&time=";

/// Link to one calendar deadline entry.
///
/// The fragment names the DOM node holding the event on the detail page and
/// the `time` parameter carries the deadline as Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventReference {
    url: Url,
}

impl EventReference {
    pub fn new(url: Url) -> Self {
        EventReference { url }
    }

    pub fn parse(url: &str) -> Result<Self, SyncError> {
        Url::parse(url)
            .map(EventReference::new)
            .map_err(|e| SyncError::parse(format!("Invalid event url {}: {}", url, e)))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn event_id(&self) -> Result<&str, SyncError> {
        let fragment = self
            .url
            .fragment()
            .ok_or_else(|| SyncError::parse(format!("No event id in {}", self.url)))?;
        match fragment.split('&').next() {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(SyncError::parse(format!("Empty event id in {}", self.url))),
        }
    }

    pub fn epoch(&self) -> Result<i64, SyncError> {
        regex!(r"&time=(?P<epoch>\d+)")
            .captures(self.url.as_str())
            .and_then(|caps| caps.name("epoch"))
            .ok_or_else(|| SyncError::parse(format!("No time parameter in {}", self.url)))?
            .as_str()
            .parse()
            .map_err(|e| SyncError::parse(format!("Invalid time in {}: {}", self.url, e)))
    }

    pub fn deadline(&self) -> Result<DateTime<FixedOffset>, SyncError> {
        let epoch = self.epoch()?;
        utils::deadline_from_epoch(epoch)
            .ok_or_else(|| SyncError::parse(format!("Time {} out of range", epoch)))
    }
}

impl fmt::Display for EventReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub name: String,
    pub course: Option<String>,
    pub deadline: DateTime<FixedOffset>,
    pub url: String,
    pub excluded: bool,
}

impl Task {
    /// Cross-run identity, stored in the notes of the synced task.
    pub fn sync_key(&self) -> String {
        format!("{}\n{}", self.course.as_deref().unwrap_or_default(), self.url)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Name            : {}", self.name)?;
        if let Some(course) = self.course.as_ref() {
            writeln!(f, "Course          : {}", course)?;
        } else {
            writeln!(f, "Course          : None")?;
        }
        writeln!(f, "Deadline        : {}", self.deadline)?;
        writeln!(f, "URL             : {}", self.url)?;
        writeln!(f, "Excluded        : {}", self.excluded)
    }
}
