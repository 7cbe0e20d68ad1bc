use super::{EventReference, Session, Task};
use crate::dom::{self, Query};
use crate::{ExclusionRules, Scraper, SyncError};
use chrono::{DateTime, FixedOffset};
use lazy_regex::regex;
use lazy_static::lazy_static;
use scraper::{Html, Selector};
use tracing::{debug, warn};

const E: &str = "Invalid selector";
lazy_static! {
    static ref A: Selector = Selector::parse("a[href]").expect(E);
}

fn course_id(href: &str) -> Option<u32> {
    regex!(r"\?id=(?P<course_id>\d+)$")
        .captures(href)
        .and_then(|caps| caps.name("course_id"))
        .and_then(|m| m.as_str().parse().ok())
}

/// Detail page of one event, scoped to the node named by the reference's
/// fragment.
#[derive(Debug)]
pub struct EventPage<'a> {
    pub event_id: &'a str,
    pub deadline: DateTime<FixedOffset>,
    pub rules: &'a ExclusionRules,
}

impl Scraper for EventPage<'_> {
    type Output = Task;

    fn scrape(&self, doc: &Html) -> Result<Task, SyncError> {
        let node = doc
            .find_first(&dom::id_selector(self.event_id)?)
            .ok_or_else(|| SyncError::parse(format!("Event node #{} not found", self.event_id)))?;

        let mut assignment: Option<(String, String)> = None;
        let mut course = None;
        // Unknown course means excluded.
        let mut excluded = true;

        for a in node.find_all(&A) {
            let href = match dom::attribute(a, "href") {
                Some(href) => href.trim(),
                None => continue,
            };

            if href.contains("assign") && !href.contains("&action=") {
                assignment = Some((dom::text(a).trim().to_string(), href.to_string()));
            }

            if href.contains("course") && !href.contains("update") {
                match course_id(href) {
                    // An excluded anchor never overrides one that qualified.
                    Some(id) if self.rules.excludes_course(id) => {
                        debug!("Course {} of #{} is excluded", id, self.event_id);
                    }
                    Some(_) => {
                        course = Some(dom::text(a).trim().to_string());
                        excluded = false;
                    }
                    None => warn!("Course link without id in #{}: {}", self.event_id, href),
                }
            }
        }

        let (name, url) = match assignment {
            Some(assignment) => assignment,
            None => {
                warn!("No assignment link in #{}", self.event_id);
                (String::new(), String::new())
            }
        };

        Ok(Task {
            name,
            course,
            deadline: self.deadline,
            url,
            excluded,
        })
    }
}

/// Fetches the event's detail page and builds its task. A reference without
/// an event id or time is rejected before any request is made.
pub async fn extract_task(
    session: &Session,
    reference: &EventReference,
    rules: &ExclusionRules,
) -> Result<Task, SyncError> {
    let event_id = reference.event_id()?;
    let deadline = reference.deadline()?;

    debug!("Fetching details from event_id: #{}", event_id);
    let html = session.get_html(reference.url()).await?;

    let doc = Html::parse_document(&html);
    EventPage {
        event_id,
        deadline,
        rules,
    }
    .scrape(&doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::deadline_from_epoch;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;
    use std::fs;

    fn scrape(event_id: &str, excluded_courses: &[u32]) -> Result<Task, SyncError> {
        let html = fs::read_to_string("tests/htmls/event.html").expect("Invalid file url");
        let doc = Html::parse_document(&html);
        let rules = ExclusionRules {
            courses: excluded_courses.iter().copied().collect(),
            keywords: vec![],
        };
        EventPage {
            event_id,
            deadline: deadline_from_epoch(1_700_000_000).unwrap(),
            rules: &rules,
        }
        .scrape(&doc)
    }

    #[test]
    fn assignment_with_course() {
        let task = scrape("event_42", &[12]).unwrap();
        assert_eq!(
            task,
            Task {
                name: "HW3".to_string(),
                course: Some("CS200".to_string()),
                deadline: DateTime::parse_from_rfc3339("2023-11-15T05:13:20+07:00").unwrap(),
                url: "mod/assign/view.php?id=7".to_string(),
                excluded: false,
            }
        );
    }

    #[test]
    fn excluded_course_leaves_course_unset() {
        let task = scrape("event_43", &[12]).unwrap();
        assert!(task.excluded);
        assert_eq!(task.course, None);
        assert_eq!(task.name, "Essay");
    }

    #[test]
    fn missing_course_link_is_excluded() {
        let task = scrape("event_44", &[]).unwrap();
        assert!(task.excluded);
        assert_eq!(task.course, None);
        assert_eq!(task.url, "mod/assign/view.php?id=11");
    }

    #[test]
    fn missing_assignment_link_keeps_course() {
        let task = scrape("event_45", &[]).unwrap();
        assert!(!task.excluded);
        assert_eq!(task.course, Some("CS200".to_string()));
        assert_eq!(task.name, "");
        assert_eq!(task.url, "");
    }

    #[test]
    fn later_excluded_course_does_not_override() {
        let task = scrape("event_46", &[12]).unwrap();
        assert!(!task.excluded);
        assert_eq!(task.course, Some("CS200".to_string()));
        assert_eq!(task.name, "Lab 2");
    }

    #[test]
    fn user_link_is_not_a_course() {
        let task = scrape("event_47", &[]).unwrap();
        assert!(task.excluded);
        assert_eq!(task.course, None);
        assert_eq!(task.name, "Lab 3");
    }

    #[test]
    fn missing_event_node_is_parse_error() {
        assert!(matches!(scrape("event_99", &[]), Err(SyncError::Parse(_))));
    }

    #[test]
    fn course_id_from_query() {
        assert_eq!(course_id("https://scele.cs.ui.ac.id/course/view.php?id=31"), Some(31));
        assert_eq!(course_id("course/view.php?id=12"), Some(12));
        assert_eq!(course_id("user/view.php?id=5&course=31"), None);
        assert_eq!(course_id("course/view.php?foo=1&id=12"), None);
        assert_eq!(course_id("course/view.php?id="), None);
    }

    #[tokio::test]
    async fn malformed_reference_fails_before_fetch() {
        let mut server = mockito::Server::new_async().await;
        let page = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let base = reqwest::Url::parse(&format!("{}/", server.url())).unwrap();
        let session = Session::new(base).unwrap();
        let rules = ExclusionRules {
            courses: HashSet::new(),
            keywords: vec![],
        };

        let no_fragment = EventReference::parse(&format!(
            "{}/calendar/view.php?view=day&time=1700000000",
            server.url()
        ))
        .unwrap();
        assert!(matches!(
            extract_task(&session, &no_fragment, &rules).await,
            Err(SyncError::Parse(_))
        ));

        let no_time =
            EventReference::parse(&format!("{}/calendar/view.php?view=day#event_42", server.url()))
                .unwrap();
        assert!(matches!(
            extract_task(&session, &no_time, &rules).await,
            Err(SyncError::Parse(_))
        ));

        page.assert_async().await;
    }
}
