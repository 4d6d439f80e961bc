//! Paginated extraction from an ArcGIS feature service.
//!
//! The loop asks for `page_size` records at a time, advancing
//! `resultOffset`, until the service returns an empty page or a request
//! fails. A failure ends the loop like an empty page does; whatever was
//! collected before it is kept.

use std::fmt;

use geojson::{Feature, FeatureCollection, JsonValue};
use log::{debug, info, warn};
use reqwest::blocking::Client;

use crate::config::FetchConfig;
use crate::error::FetchError;

/// One page request against a feature service.
pub trait PageSource {
    /// Return the features starting at `offset`, at most `page_size` of them.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] when the page cannot be retrieved or decoded.
    fn fetch_page(&self, offset: usize, page_size: usize) -> Result<Vec<Feature>, FetchError>;
}

/// Query parameters for one page: every field, every row, `GeoJSON` output.
#[must_use]
pub fn query_params(offset: usize, page_size: usize) -> [(&'static str, String); 5] {
    [
        ("where", "1=1".to_string()),
        ("outFields", "*".to_string()),
        ("f", "geojson".to_string()),
        ("resultOffset", offset.to_string()),
        ("resultRecordCount", page_size.to_string()),
    ]
}

/// [`PageSource`] backed by blocking HTTP GET requests.
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: Client,
    endpoint: String,
}

impl HttpPageSource {
    /// Build a source for `config.endpoint` with `config.timeout` applied to
    /// every request.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the HTTP client cannot be built.
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

impl PageSource for HttpPageSource {
    fn fetch_page(&self, offset: usize, page_size: usize) -> Result<Vec<Feature>, FetchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&query_params(offset, page_size))
            .send()
            .map_err(|source| FetchError::Request { offset, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                offset,
                status: status.as_u16(),
            });
        }

        let body: JsonValue = response.json().map_err(|err| FetchError::Decode {
            offset,
            message: err.to_string(),
        })?;
        features_from_page(body, offset)
    }
}

/// Pull the `features` array out of a page body.
///
/// A body without `features` (an ArcGIS error payload, for instance) counts
/// as an empty page.
pub(crate) fn features_from_page(body: JsonValue, offset: usize) -> Result<Vec<Feature>, FetchError> {
    let decode = |message: String| FetchError::Decode { offset, message };

    let JsonValue::Object(mut object) = body else {
        return Err(decode("expected a JSON object".to_string()));
    };

    match object.remove("features") {
        None | Some(JsonValue::Null) => Ok(Vec::new()),
        Some(JsonValue::Array(items)) => items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| {
                Feature::try_from(item)
                    .map_err(|err| decode(format!("feature {} is not valid GeoJSON: {err}", idx + 1)))
            })
            .collect(),
        Some(_) => Err(decode("`features` is not an array".to_string())),
    }
}

/// Why pagination ended.
#[derive(Debug)]
pub enum FetchStop {
    /// The service returned an empty page.
    Exhausted,
    /// A request failed; pages before it were kept.
    Failed(FetchError),
}

impl fmt::Display for FetchStop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStop::Exhausted => f.write_str("exhausted"),
            FetchStop::Failed(err) => write!(f, "failed: {err}"),
        }
    }
}

/// Everything the pagination loop produced.
#[derive(Debug)]
pub struct FetchReport {
    pub features: Vec<Feature>,
    /// Non-empty pages received
    pub pages: usize,
    pub stop: FetchStop,
}

impl FetchReport {
    /// Wrap the features in a collection, or `None` if there are none.
    #[must_use]
    pub fn into_collection(self) -> Option<FeatureCollection> {
        if self.features.is_empty() {
            return None;
        }
        Some(FeatureCollection {
            bbox: None,
            features: self.features,
            foreign_members: None,
        })
    }
}

/// Request pages from `source` until one is empty or a request fails.
///
/// `page_size` is both the requested record count and the offset step; a
/// zero page size is treated as one.
pub fn paginate<S: PageSource + ?Sized>(source: &S, page_size: usize) -> FetchReport {
    let page_size = page_size.max(1);
    let mut features = Vec::new();
    let mut offset = 0;
    let mut pages = 0;

    let stop = loop {
        info!("Fetching records from offset {offset}...");
        match source.fetch_page(offset, page_size) {
            Ok(page) if page.is_empty() => {
                info!("Collection complete.");
                break FetchStop::Exhausted;
            },
            Ok(mut page) => {
                debug!("Received {} features at offset {offset}", page.len());
                pages += 1;
                features.append(&mut page);
                offset += page_size;
            },
            Err(err) => {
                warn!("Error on page at offset {offset}: {err}");
                break FetchStop::Failed(err);
            },
        }
    };

    info!("Total records collected: {}", features.len());
    FetchReport {
        features,
        pages,
        stop,
    }
}

/// Fetch every feature from the configured endpoint.
///
/// Returns `None` when nothing was collected, whether the first page was
/// empty or the first request failed.
#[must_use]
pub fn fetch_geojson(config: &FetchConfig) -> Option<FeatureCollection> {
    match HttpPageSource::new(config) {
        Ok(source) => paginate(&source, config.page_size).into_collection(),
        Err(err) => {
            warn!("{err}");
            None
        },
    }
}
