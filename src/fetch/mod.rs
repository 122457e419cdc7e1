// src/fetch/mod.rs

pub mod error;
pub mod retry;

pub use error::FetchError;
pub use retry::RetryPolicy;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE},
    Client,
};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::{
    config::Config,
    level::ProgramLevel,
    process::{parse, ScheduleTable},
};

const BRANCHES_PATH: &str = "/public/DersProgram/SearchBransKoduByProgramSeviye";
const SCHEDULE_PATH: &str = "/public/DersProgram/DersProgramSearch";

static NO_RECORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(no\s+records?\s+(were\s+)?found|kay[ıi]t\s+bulunamad[ıi])")
        .expect("no-records pattern should compile")
});
static TABLE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<table\b").expect("table tag pattern should compile"));

/// A course branch within one program level.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Branch {
    /// Visible branch code, e.g. `BBF`.
    #[serde(rename = "dersBransKodu")]
    pub code: String,
    /// Opaque key the schedule endpoint is queried with.
    #[serde(rename = "bransKoduId")]
    pub id: u64,
}

/// What the schedule endpoint gave back for a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulePage {
    /// The parsed schedule table. It may still have no rows.
    Table(ScheduleTable),
    NoData,
}

/// One GET, no retries. The seam between the fetch logic and the network.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn get_text(&self, url: &Url) -> Result<String, FetchError>;
}

/// reqwest-backed transport: per-request timeout and an English
/// `Accept-Language` on every call.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_str(&config.language)?);
        let client = Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn get_text(&self, url: &Url) -> Result<String, FetchError> {
        debug!(%url, "GET");
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        resp.text().await.map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })
    }
}

/// Builds the two endpoint URLs from the service base.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    pub fn branches(&self, level: ProgramLevel) -> Result<Url, FetchError> {
        let mut url = self.base.join(BRANCHES_PATH)?;
        url.query_pairs_mut()
            .append_pair("programSeviyeTipiAnahtari", level.key());
        Ok(url)
    }

    pub fn schedule(&self, level: ProgramLevel, branch_id: u64) -> Result<Url, FetchError> {
        let mut url = self.base.join(SCHEDULE_PATH)?;
        url.query_pairs_mut()
            .append_pair("ProgramSeviyeTipiAnahtari", level.key())
            .append_pair("dersBransKoduId", &branch_id.to_string());
        Ok(url)
    }
}

/// Branch-list and schedule fetches with bounded retry on top of a [`Transport`].
pub struct Fetcher<T> {
    transport: T,
    endpoints: Endpoints,
    retry: RetryPolicy,
}

impl<T: Transport> Fetcher<T> {
    pub fn new(transport: T, endpoints: Endpoints, retry: RetryPolicy) -> Self {
        Self {
            transport,
            endpoints,
            retry,
        }
    }

    /// All branches of `level`. Exhausting retries is an error: the level
    /// cannot be processed without its branch list.
    pub async fn fetch_branches(&self, level: ProgramLevel) -> Result<Vec<Branch>, FetchError> {
        let url = self.endpoints.branches(level)?;
        let transport = &self.transport;
        let url_ref = &url;

        let branches = self
            .retry
            .run(
                "fetch_branches",
                move || async move {
                    let body = transport.get_text(url_ref).await?;
                    decode_branches(url_ref, &body)
                },
                FetchError::is_transient,
            )
            .await?;

        debug!(level = %level, count = branches.len(), "branch list");
        Ok(branches)
    }

    /// Parsed schedule for one branch. A body without the schedule table is
    /// retried like a failed request. Exhausted retries and explicit
    /// "no records" answers both come back as [`SchedulePage::NoData`].
    pub async fn fetch_schedule(&self, level: ProgramLevel, branch_id: u64) -> SchedulePage {
        let url = match self.endpoints.schedule(level, branch_id) {
            Ok(url) => url,
            Err(e) => {
                warn!(level = %level, branch_id, error = %e, "bad schedule URL");
                return SchedulePage::NoData;
            }
        };
        let transport = &self.transport;
        let url_ref = &url;

        let result = self
            .retry
            .run(
                "fetch_schedule",
                move || async move {
                    let body = transport.get_text(url_ref).await?;
                    if is_no_data(&body) {
                        return Ok(None);
                    }
                    parse(&body)
                        .map(Some)
                        .map_err(|source| FetchError::Parse {
                            url: url_ref.to_string(),
                            source,
                        })
                },
                FetchError::is_transient,
            )
            .await;

        match result {
            Ok(Some(table)) => SchedulePage::Table(table),
            Ok(None) => SchedulePage::NoData,
            Err(e) => {
                warn!(level = %level, branch_id, error = %e, "schedule unavailable; treating as no data");
                SchedulePage::NoData
            }
        }
    }
}

/// Empty body, or a "no records" notice with no table in sight.
pub fn is_no_data(body: &str) -> bool {
    let body = body.trim();
    body.is_empty() || (!TABLE_TAG.is_match(body) && NO_RECORDS.is_match(body))
}

fn decode_branches(url: &Url, body: &str) -> Result<Vec<Branch>, FetchError> {
    let raw: Vec<Branch> = serde_json::from_str(body).map_err(|e| FetchError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    Ok(raw
        .into_iter()
        .filter_map(|b| {
            let code = b.code.trim().to_string();
            (!code.is_empty()).then_some(Branch { code, id: b.id })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        collections::HashMap,
        sync::Mutex,
        time::Duration,
    };

    /// Replies per URL; the last reply repeats once the script runs out.
    #[derive(Default)]
    struct Scripted {
        replies: HashMap<String, Vec<Result<String, u16>>>,
        calls: Mutex<HashMap<String, usize>>,
    }

    impl Scripted {
        fn on(mut self, url: Url, replies: Vec<Result<&str, u16>>) -> Self {
            self.replies.insert(
                url.to_string(),
                replies.into_iter().map(|r| r.map(str::to_string)).collect(),
            );
            self
        }

        fn calls(&self, url: &Url) -> usize {
            self.calls
                .lock()
                .unwrap()
                .get(url.as_str())
                .copied()
                .unwrap_or(0)
        }
    }

    impl Transport for &Scripted {
        async fn get_text(&self, url: &Url) -> Result<String, FetchError> {
            let n = {
                let mut calls = self.calls.lock().unwrap();
                let n = calls.entry(url.to_string()).or_insert(0);
                *n += 1;
                *n
            };
            let reply = self
                .replies
                .get(url.as_str())
                .and_then(|r| r.get((n - 1).min(r.len().saturating_sub(1))))
                .cloned()
                .unwrap_or(Err(404));
            reply.map_err(|status| FetchError::Status {
                url: url.to_string(),
                status,
            })
        }
    }

    fn endpoints() -> Endpoints {
        Endpoints::new(Url::parse("http://schedule.test").unwrap())
    }

    fn fetcher(t: &Scripted) -> Fetcher<&Scripted> {
        Fetcher::new(
            t,
            endpoints(),
            RetryPolicy {
                attempts: 3,
                delay: Duration::ZERO,
            },
        )
    }

    #[test]
    fn endpoint_urls_carry_level_and_branch() {
        let e = endpoints();
        assert_eq!(
            e.branches(ProgramLevel::Undergraduate).unwrap().as_str(),
            "http://schedule.test/public/DersProgram/SearchBransKoduByProgramSeviye?programSeviyeTipiAnahtari=LS"
        );
        assert_eq!(
            e.schedule(ProgramLevel::Graduate, 42).unwrap().as_str(),
            "http://schedule.test/public/DersProgram/DersProgramSearch?ProgramSeviyeTipiAnahtari=LU&dersBransKoduId=42"
        );
    }

    #[tokio::test]
    async fn branches_decode_and_skip_blank_codes() {
        let url = endpoints().branches(ProgramLevel::Undergraduate).unwrap();
        let t = Scripted::default().on(
            url.clone(),
            vec![Ok(r#"[
                {"bransKoduId": 101, "dersBransKodu": "BBF", "extra": true},
                {"bransKoduId": 102, "dersBransKodu": "  "},
                {"bransKoduId": 202, "dersBransKodu": " MAT "}
            ]"#)],
        );
        let branches = fetcher(&t)
            .fetch_branches(ProgramLevel::Undergraduate)
            .await
            .unwrap();
        assert_eq!(
            branches,
            vec![
                Branch { code: "BBF".into(), id: 101 },
                Branch { code: "MAT".into(), id: 202 },
            ]
        );
        assert_eq!(t.calls(&url), 1);
    }

    #[tokio::test]
    async fn branches_retry_then_fail() {
        let url = endpoints().branches(ProgramLevel::Graduate).unwrap();
        let t = Scripted::default().on(url.clone(), vec![Err(503)]);
        let err = fetcher(&t)
            .fetch_branches(ProgramLevel::Graduate)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));
        assert_eq!(t.calls(&url), 3);
    }

    #[tokio::test]
    async fn branches_recover_from_garbled_body() {
        let url = endpoints().branches(ProgramLevel::Associate).unwrap();
        let t = Scripted::default().on(
            url.clone(),
            vec![Ok("<html>maintenance</html>"), Ok(r#"[{"bransKoduId":1,"dersBransKodu":"AKM"}]"#)],
        );
        let branches = fetcher(&t)
            .fetch_branches(ProgramLevel::Associate)
            .await
            .unwrap();
        assert_eq!(branches.len(), 1);
        assert_eq!(t.calls(&url), 2);
    }

    #[tokio::test]
    async fn schedule_degrades_to_no_data() {
        let url = endpoints().schedule(ProgramLevel::Undergraduate, 7).unwrap();
        let t = Scripted::default().on(url.clone(), vec![Err(500)]);
        let page = fetcher(&t)
            .fetch_schedule(ProgramLevel::Undergraduate, 7)
            .await;
        assert_eq!(page, SchedulePage::NoData);
        assert_eq!(t.calls(&url), 3);
    }

    #[tokio::test]
    async fn schedule_returns_table_after_retry() {
        let url = endpoints().schedule(ProgramLevel::Undergraduate, 7).unwrap();
        let html = r#"<table id="dersProgramContainer">
            <tr><th>CRN</th><th>Code</th></tr><tr><td>1</td><td>BBF 101</td></tr>
        </table>"#;
        let t = Scripted::default().on(url.clone(), vec![Err(502), Ok(html)]);
        let page = fetcher(&t)
            .fetch_schedule(ProgramLevel::Undergraduate, 7)
            .await;
        let SchedulePage::Table(table) = page else {
            panic!("expected a table");
        };
        assert_eq!(table.columns(), ["CRN", "Code"]);
        assert_eq!(table.rows(), [vec!["1", "BBF 101"]]);
        assert_eq!(t.calls(&url), 2);
    }

    #[tokio::test]
    async fn schedule_retries_body_without_table() {
        let url = endpoints().schedule(ProgramLevel::Graduate, 8).unwrap();
        let html = r#"<table id="dersProgramContainer"><tr><th>CRN</th><th>Code</th></tr></table>"#;
        let t = Scripted::default().on(
            url.clone(),
            vec![Ok("<div>temporarily garbled</div>"), Ok(html)],
        );
        let page = fetcher(&t).fetch_schedule(ProgramLevel::Graduate, 8).await;
        assert!(matches!(page, SchedulePage::Table(ref table) if table.is_empty()));
        assert_eq!(t.calls(&url), 2);
    }

    #[tokio::test]
    async fn schedule_garbled_every_time_is_no_data() {
        let url = endpoints().schedule(ProgramLevel::Graduate, 9).unwrap();
        let t = Scripted::default().on(url.clone(), vec![Ok("<html><p>Session expired</p></html>")]);
        let page = fetcher(&t).fetch_schedule(ProgramLevel::Graduate, 9).await;
        assert_eq!(page, SchedulePage::NoData);
        assert_eq!(t.calls(&url), 3);
    }

    #[tokio::test]
    async fn no_records_answer_is_not_retried() {
        let url = endpoints().schedule(ProgramLevel::Associate, 4).unwrap();
        let t = Scripted::default().on(url.clone(), vec![Ok("<p>No records found.</p>")]);
        let page = fetcher(&t).fetch_schedule(ProgramLevel::Associate, 4).await;
        assert_eq!(page, SchedulePage::NoData);
        assert_eq!(t.calls(&url), 1);
    }

    #[test]
    fn no_data_detection() {
        assert!(is_no_data(""));
        assert!(is_no_data("   \n"));
        assert!(is_no_data("<div class=\"alert\">No records found.</div>"));
        assert!(is_no_data("<p>Kayıt bulunamadı</p>"));
        assert!(!is_no_data("<table><tr><td>No records found</td></tr></table>"));
        assert!(!is_no_data("<div>something else</div>"));
    }
}
