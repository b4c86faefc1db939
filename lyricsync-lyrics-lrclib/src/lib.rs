use async_trait::async_trait;
use lyricsync_core::{CoreError, FetchedLyrics, LyricsProvider, LyricsQuery, LyricsResult};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

const LRCLIB_API_URL: &str = "https://lrclib.net/api";

/// Default timeout for HTTP requests (10 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Default number of retry attempts
const DEFAULT_MAX_RETRIES: u32 = 3;
/// Duration tolerance for matching (±2 seconds)
const DURATION_TOLERANCE_SECS: f64 = 2.0;

/// Calculate a score for duration matching (lower is better).
/// Returns 0 for exact matches, higher values for larger differences.
/// Capped at `i32::MAX` to prevent overflow.
fn duration_score(actual: Option<f64>, expected: Option<u32>, scale: f64) -> i32 {
    match (actual, expected) {
        (Some(d), Some(q)) => {
            let diff = (d - f64::from(q)).abs() * scale;
            #[allow(clippy::cast_possible_truncation)]
            if diff > f64::from(i32::MAX) {
                i32::MAX
            } else {
                diff as i32
            }
        }
        _ => 50, // Default score when duration is unknown
    }
}

/// LRCLIB.net lyrics provider
pub struct LrclibProvider {
    client: ClientWithMiddleware,
    base_url: String,
}

impl LrclibProvider {
    /// Create a new LRCLIB provider with default 10-second timeout and 3 retries.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, CoreError> {
        Self::with_base_url(LRCLIB_API_URL)
    }

    /// Create a provider against a different LRCLIB-compatible server
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, CoreError> {
        let base_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("Lyricsync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        // Wrap with retry middleware (exponential backoff)
        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(DEFAULT_MAX_RETRIES);
        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn get_url(&self, query: &LyricsQuery) -> String {
        use std::fmt::Write;

        let mut url = format!(
            "{}/get?artist_name={}&track_name={}",
            self.base_url,
            urlencoding::encode(&query.artist_name),
            urlencoding::encode(&query.track_name)
        );

        if let Some(ref album) = query.album_name {
            let _ = write!(url, "&album_name={}", urlencoding::encode(album));
        }

        if let Some(duration) = query.duration_secs {
            let _ = write!(url, "&duration={duration}");
        }

        url
    }
}

/// Response from LRCLIB API
/// Note: API returns additional fields (trackName, albumName) that we don't use;
/// serde ignores unknown fields by default.
#[derive(Debug, Deserialize)]
struct LrclibResponse {
    id: i64,
    #[serde(rename = "artistName")]
    artist_name: String,
    duration: Option<f64>,
    #[serde(default)]
    instrumental: bool,
    #[serde(rename = "plainLyrics")]
    plain_lyrics: Option<String>,
    #[serde(rename = "syncedLyrics")]
    synced_lyrics: Option<String>,
}

impl LrclibResponse {
    fn has_lyrics(&self) -> bool {
        self.synced_lyrics.is_some() || self.plain_lyrics.is_some()
    }

    /// Prefer synced, then by duration match
    fn match_score(&self, duration_secs: Option<u32>, scale: f64) -> i32 {
        let sync_score = if self.synced_lyrics.is_some() { 0 } else { 100 };
        sync_score + duration_score(self.duration, duration_secs, scale)
    }
}

#[async_trait]
impl LyricsProvider for LrclibProvider {
    fn name(&self) -> &'static str {
        "lrclib"
    }

    async fn fetch(&self, query: &LyricsQuery) -> Result<FetchedLyrics, CoreError> {
        info!(
            "Fetching lyrics from LRCLIB for: {} - {} (duration: {:?}s)",
            query.artist_name, query.track_name, query.duration_secs
        );

        // Try the /get endpoint first for exact match with artist + track + album + duration
        let url = self.get_url(query);
        debug!("LRCLIB GET (exact match): {}", url);

        let response = self.client.get(&url).send().await?;
        debug!("LRCLIB response status: {}", response.status());

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            info!("LRCLIB exact match not found, trying search by track name only");
            return self.search_by_track_name(query).await;
        }

        if !response.status().is_success() {
            warn!("LRCLIB returned status: {}", response.status());
            return Err(CoreError::LyricsProviderFailed {
                provider: self.name().to_string(),
                reason: format!("LRCLIB returned status: {}", response.status()),
            });
        }

        let result: LrclibResponse = response.json().await?;
        info!("LRCLIB found match with id: {}", result.id);
        Ok(parse_response(result))
    }
}

impl LrclibProvider {
    /// Search by track name only and match duration within ±2 seconds
    async fn search_by_track_name(&self, query: &LyricsQuery) -> Result<FetchedLyrics, CoreError> {
        let url = format!(
            "{}/search?track_name={}",
            self.base_url,
            urlencoding::encode(&query.track_name)
        );

        debug!("LRCLIB GET (search by track): {}", url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            warn!("LRCLIB search returned status: {}", response.status());
            return self.search_fallback(query).await;
        }

        let results: Vec<LrclibResponse> = response.json().await?;

        match select_by_track_name(results, query.duration_secs) {
            Some(result) => {
                info!(
                    "LRCLIB found match by track name + duration (id: {}, artist: {}, duration: {:?})",
                    result.id, result.artist_name, result.duration
                );
                Ok(parse_response(result))
            }
            None => {
                info!("LRCLIB search by track name: no usable match, trying full search");
                self.search_fallback(query).await
            }
        }
    }

    async fn search_fallback(&self, query: &LyricsQuery) -> Result<FetchedLyrics, CoreError> {
        info!("Trying LRCLIB search endpoint with artist + track as final fallback");

        let search_query = format!("{} {}", query.artist_name, query.track_name);
        let url = format!(
            "{}/search?q={}",
            self.base_url,
            urlencoding::encode(&search_query)
        );

        debug!("LRCLIB GET (full search): {}", url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(CoreError::LyricsProviderFailed {
                provider: self.name().to_string(),
                reason: format!("LRCLIB search returned status: {}", response.status()),
            });
        }

        let results: Vec<LrclibResponse> = response.json().await?;

        let best = results
            .into_iter()
            .filter(LrclibResponse::has_lyrics)
            .min_by_key(|r| r.match_score(query.duration_secs, 1.0));

        match best {
            Some(result) => {
                info!(
                    "LRCLIB found match via full search (id: {}, artist: {})",
                    result.id, result.artist_name
                );
                Ok(parse_response(result))
            }
            None => Err(CoreError::LyricsNotFound {
                track: query.track_name.clone(),
                artist: query.artist_name.clone(),
            }),
        }
    }
}

/// Pick the best track-name search result within the duration tolerance
fn select_by_track_name(
    results: Vec<LrclibResponse>,
    duration_secs: Option<u32>,
) -> Option<LrclibResponse> {
    results
        .into_iter()
        .filter(|r| match duration_secs {
            Some(expected) => r
                .duration
                .is_some_and(|d| (d - f64::from(expected)).abs() <= DURATION_TOLERANCE_SECS),
            None => true,
        })
        .filter(LrclibResponse::has_lyrics)
        .min_by_key(|r| r.match_score(duration_secs, 10.0))
}

fn parse_response(result: LrclibResponse) -> FetchedLyrics {
    let provider_id = result.id.to_string();

    if result.instrumental {
        debug!("Track is instrumental (lrclib id: {})", result.id);
        return FetchedLyrics {
            result: LyricsResult::NotFound,
            provider_id,
        };
    }

    // Prefer synced lyrics
    if let Some(synced) = result.synced_lyrics.filter(|s| !s.trim().is_empty()) {
        debug!("Got synced lyrics (lrclib id: {})", result.id);
        return FetchedLyrics {
            result: LyricsResult::Synced(synced),
            provider_id,
        };
    }

    if let Some(plain) = result.plain_lyrics.filter(|s| !s.trim().is_empty()) {
        debug!("Got plain lyrics (lrclib id: {})", result.id);
        return FetchedLyrics {
            result: LyricsResult::Unsynced(plain),
            provider_id,
        };
    }

    FetchedLyrics {
        result: LyricsResult::NotFound,
        provider_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> LrclibResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_duration_score() {
        assert_eq!(duration_score(Some(180.0), Some(180), 1.0), 0);
        assert_eq!(duration_score(Some(182.5), Some(180), 10.0), 25);
        assert_eq!(duration_score(None, Some(180), 1.0), 50);
        assert_eq!(duration_score(Some(1e12), Some(0), 10.0), i32::MAX);
    }

    #[test]
    fn test_parse_response_prefers_synced() {
        let fetched = parse_response(response(
            r#"{"id": 7, "artistName": "A", "duration": 200.0, "instrumental": false,
                "plainLyrics": "hello", "syncedLyrics": "[00:01.00]hello"}"#,
        ));
        assert_eq!(fetched.provider_id, "7");
        assert_eq!(fetched.result, LyricsResult::Synced("[00:01.00]hello".to_string()));
    }

    #[test]
    fn test_parse_response_blank_synced_falls_back_to_plain() {
        let fetched = parse_response(response(
            r#"{"id": 8, "artistName": "A", "duration": null, "instrumental": false,
                "plainLyrics": "hello", "syncedLyrics": "  "}"#,
        ));
        assert_eq!(fetched.result, LyricsResult::Unsynced("hello".to_string()));
    }

    #[test]
    fn test_parse_response_instrumental_is_not_found() {
        let fetched = parse_response(response(
            r#"{"id": 9, "artistName": "A", "duration": 100.0, "instrumental": true,
                "plainLyrics": null, "syncedLyrics": null}"#,
        ));
        assert_eq!(fetched.result, LyricsResult::NotFound);
    }

    #[test]
    fn test_select_by_track_name_filters_duration() {
        let results = vec![
            response(r#"{"id": 1, "artistName": "Far", "duration": 240.0, "plainLyrics": null, "syncedLyrics": "[00:01.00]x"}"#),
            response(r#"{"id": 2, "artistName": "Plain", "duration": 181.0, "plainLyrics": "x", "syncedLyrics": null}"#),
            response(r#"{"id": 3, "artistName": "Near", "duration": 181.5, "plainLyrics": "x", "syncedLyrics": "[00:01.00]x"}"#),
            response(r#"{"id": 4, "artistName": "Empty", "duration": 180.0, "plainLyrics": null, "syncedLyrics": null}"#),
        ];

        let best = select_by_track_name(results, Some(180)).unwrap();
        assert_eq!(best.id, 3);
    }

    #[test]
    fn test_select_by_track_name_none_in_tolerance() {
        let results = vec![response(
            r#"{"id": 1, "artistName": "Far", "duration": 240.0, "plainLyrics": "x", "syncedLyrics": null}"#,
        )];
        assert!(select_by_track_name(results, Some(180)).is_none());
    }

    #[test]
    fn test_get_url_encodes_query() {
        let provider = LrclibProvider::with_base_url("http://localhost:3000/api/").unwrap();
        let query = LyricsQuery::new("Song & Dance", "The Artist")
            .with_album("Live")
            .with_duration(200);

        assert_eq!(
            provider.get_url(&query),
            "http://localhost:3000/api/get?artist_name=The%20Artist&track_name=Song%20%26%20Dance&album_name=Live&duration=200"
        );
    }
}
