//! SteamCharts client
//!
//! # Page layout
//! `https://steamcharts.com/app/{id}` carries a monthly table; the last cell
//! of each data row (`td.num`) is that month's peak. The all-time peak is the
//! largest of them.
//!
//! The charts page has no 24-hour figure, so the live count from the
//! aggregate stats provider stands in for it, both when the page exists and
//! when it does not.

use super::http::PacedClient;
use super::{AggregateStatsLookup, HistoricalPeaks, HistoricalPeaksLookup, LookupResult};
use crate::config::CleanerSettings;
use crate::error::LookupError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::sync::Arc;
use tracing::debug;

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").expect("valid selector"));
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("valid selector"));
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td").expect("valid selector"));

/// Data rows have month, average, gain, gain %, peak
const MIN_CELLS: usize = 4;

pub struct SteamChartsClient {
    http: PacedClient,
    base_url: String,
    live_counts: Arc<dyn AggregateStatsLookup>,
}

impl SteamChartsClient {
    pub fn new(
        settings: &CleanerSettings,
        live_counts: Arc<dyn AggregateStatsLookup>,
    ) -> Result<Self, LookupError> {
        Ok(Self {
            http: PacedClient::new(
                "steamcharts",
                settings.request_timeout(),
                &settings.user_agent,
                settings.charts_requests_per_second,
                settings.retry_policy(),
            )?,
            base_url: settings.charts_base_url.trim_end_matches('/').to_string(),
            live_counts,
        })
    }

    async fn live_ccu(&self, app_id: u64) -> Option<u64> {
        match self.live_counts.lookup_aggregate_stats(app_id).await {
            Ok(stats) => stats.and_then(|s| s.current_ccu),
            Err(e) => {
                debug!(app_id, error = %e, "Live count unavailable for charts fallback");
                None
            }
        }
    }
}

#[async_trait]
impl HistoricalPeaksLookup for SteamChartsClient {
    async fn lookup_historical_peaks(&self, app_id: u64) -> LookupResult<HistoricalPeaks> {
        let url = format!("{}/{}", self.base_url, app_id);
        debug!(app_id, url = %url, "Querying SteamCharts");

        let body = match self.http.get(&url, &[]).await {
            Ok(response) => response.text().await.map_err(|e| {
                LookupError::Network(format!("Failed to read SteamCharts body: {}", e))
            })?,
            Err(LookupError::NotFound(_)) => {
                debug!(app_id, "No charts page, using live count for 24h peak");
                return Ok(self.live_ccu(app_id).await.map(|ccu| HistoricalPeaks {
                    peak_24h: Some(ccu),
                    peak_alltime: None,
                }));
            }
            Err(e) => return Err(e),
        };

        let Some(peak_alltime) = parse_peak_alltime(&body) else {
            return Ok(None);
        };
        Ok(Some(HistoricalPeaks {
            peak_24h: self.live_ccu(app_id).await,
            peak_alltime: Some(peak_alltime),
        }))
    }
}

/// Largest monthly peak in the page's first table
pub fn parse_peak_alltime(html: &str) -> Option<u64> {
    let document = Html::parse_document(html);
    let table = document.select(&TABLE).next()?;

    table
        .select(&ROW)
        .filter_map(|row| {
            let cells: Vec<_> = row.select(&CELL).collect();
            if cells.len() < MIN_CELLS {
                return None;
            }
            let peak = cells.last()?;
            if !peak.value().classes().any(|c| c == "num") {
                return None;
            }
            let text: String = peak.text().collect();
            text.trim().replace(',', "").parse::<u64>().ok()
        })
        .max()
        .filter(|peak| *peak > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::mock::{reply, serve, Canned};
    use crate::sources::AggregateStats;
    use std::sync::atomic::Ordering;

    fn charts_client(base: &str, live: Arc<Canned<AggregateStats>>) -> SteamChartsClient {
        let settings = CleanerSettings {
            charts_base_url: format!("{}/app/", base),
            charts_requests_per_second: 100,
            ..CleanerSettings::default()
        };
        SteamChartsClient::new(&settings, live).unwrap()
    }

    fn live(ccu: u64) -> Arc<Canned<AggregateStats>> {
        Arc::new(Canned::some(AggregateStats {
            current_ccu: Some(ccu),
            ..AggregateStats::default()
        }))
    }

    const PAGE: &str = r#"
        <html><body>
        <table class="common-table">
          <thead><tr><th>Month</th><th>Avg. Players</th><th>Gain</th><th>% Gain</th><th>Peak Players</th></tr></thead>
          <tbody>
            <tr><td class="month-cell left">Last 30 Days</td><td class="right num-f italic">1,234.5</td>
                <td class="right num-p gainorloss italic">-12.3</td><td class="right gainorloss italic">-1.0%</td>
                <td class="right num italic">2,500</td></tr>
            <tr><td class="month-cell left">March 2019</td><td class="right num-f">9,000.1</td>
                <td class="right num-p gainorloss">300</td><td class="right gainorloss">3.4%</td>
                <td class="right num">12,345</td></tr>
            <tr><td class="month-cell left">February 2019</td><td class="right num-f">8,000.0</td>
                <td class="right num-p gainorloss">-</td><td class="right gainorloss">-</td>
                <td class="right num">n/a</td></tr>
          </tbody>
        </table>
        <table><tr><td>1</td><td>2</td><td>3</td><td class="num">999,999</td></tr></table>
        </body></html>"#;

    #[test]
    fn test_parse_peak_takes_max_of_first_table() {
        assert_eq!(parse_peak_alltime(PAGE), Some(12345));
    }

    #[test]
    fn test_page_without_table() {
        assert_eq!(parse_peak_alltime("<html><p>Not tracked</p></html>"), None);
    }

    #[test]
    fn test_cells_without_num_class_ignored() {
        let page = "<table><tr><td>a</td><td>b</td><td>c</td><td>500</td></tr></table>";
        assert_eq!(parse_peak_alltime(page), None);
    }

    #[tokio::test]
    async fn test_missing_page_falls_back_to_live_count() {
        let (base, hits) = serve(vec![Some(reply("404 Not Found", ""))]).await;
        let stats = live(75);

        let peaks = charts_client(&base, stats.clone())
            .lookup_historical_peaks(570)
            .await
            .unwrap();

        assert_eq!(
            peaks,
            Some(HistoricalPeaks {
                peak_24h: Some(75),
                peak_alltime: None,
            })
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(stats.call_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_page_without_live_count_is_no_data() {
        let (base, _) = serve(vec![Some(reply("404 Not Found", ""))]).await;
        let stats = Arc::new(Canned::failing(LookupError::Http { status: 500 }));

        let peaks = charts_client(&base, stats).lookup_historical_peaks(570).await;

        assert_eq!(peaks, Ok(None));
    }

    #[tokio::test]
    async fn test_page_pairs_alltime_peak_with_live_count() {
        let (base, _) = serve(vec![Some(reply("200 OK", PAGE))]).await;

        let peaks = charts_client(&base, live(40))
            .lookup_historical_peaks(570)
            .await
            .unwrap();

        assert_eq!(
            peaks,
            Some(HistoricalPeaks {
                peak_24h: Some(40),
                peak_alltime: Some(12345),
            })
        );
    }

    #[tokio::test]
    async fn test_server_error_is_not_swallowed() {
        let (base, _) = serve(vec![Some(reply("500 Internal Server Error", ""))]).await;

        let result = charts_client(&base, live(40)).lookup_historical_peaks(570).await;

        assert_eq!(result, Err(LookupError::Http { status: 500 }));
    }
}
