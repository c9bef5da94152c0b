//! WCS GetCoverage client for the national 2 m elevation model.

use std::thread;
use std::time::Duration;

use log::warn;

use crate::error::Error;

pub const DEFAULT_ENDPOINT: &str =
    "https://avoin-karttakuva.maanmittauslaitos.fi/ortokuvat-ja-korkeusmallit/wcs/v2";
const COVERAGE_ID: &str = "korkeusmalli_2m";

/// Axis-aligned bounds in TM35FIN meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    pub fn of_points<'a>(points: impl IntoIterator<Item = &'a [f64; 2]>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = Self {
            min_x: first[0],
            min_y: first[1],
            max_x: first[0],
            max_y: first[1],
        };
        for p in iter {
            bbox.min_x = bbox.min_x.min(p[0]);
            bbox.min_y = bbox.min_y.min(p[1]);
            bbox.max_x = bbox.max_x.max(p[0]);
            bbox.max_y = bbox.max_y.max(p[1]);
        }
        Some(bbox)
    }

    pub fn buffered(self, amount: f64) -> Self {
        Self {
            min_x: self.min_x - amount,
            min_y: self.min_y - amount,
            max_x: self.max_x + amount,
            max_y: self.max_y + amount,
        }
    }
}

/// One fetched coverage, with the retry count for run reporting.
pub struct Coverage {
    pub bytes: Vec<u8>,
    pub retries: u32,
}

/// Seam between the batch job and the elevation service, so the fetch
/// loop is testable without the network.
pub trait CoverageSource: Sync {
    fn get_coverage(&self, bbox: BBox) -> Result<Coverage, Error>;
}

pub struct WcsClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl WcsClient {
    pub fn new(
        endpoint: &str,
        api_key: &str,
        timeout: Duration,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Result<Self, Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            max_retries,
            retry_delay,
        })
    }

    fn coverage_url(&self, bbox: BBox) -> String {
        format!(
            "{}?service=WCS&version=2.0.1&request=GetCoverage&api-key={}\
             &CoverageID={COVERAGE_ID}\
             &SUBSET=E({},{})&SUBSET=N({},{})\
             &format=image/tiff&geotiff:compression=LZW",
            self.endpoint,
            self.api_key,
            bbox.min_x as i64,
            bbox.max_x as i64,
            bbox.min_y as i64,
            bbox.max_y as i64,
        )
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>, Error> {
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }
}

/// Run a fetch up to `max_retries` times with a fixed delay between
/// attempts, retrying on any error class.
fn fetch_with_retries(
    mut fetch: impl FnMut() -> Result<Vec<u8>, Error>,
    max_retries: u32,
    retry_delay: Duration,
) -> Result<Coverage, Error> {
    let mut retries = 0;
    loop {
        match fetch() {
            Ok(bytes) => return Ok(Coverage { bytes, retries }),
            Err(e) if retries + 1 < max_retries => {
                warn!("coverage request failed ({e}), retrying in {retry_delay:?}");
                retries += 1;
                thread::sleep(retry_delay);
            }
            Err(e) => {
                return Err(Error::NetworkError(format!(
                    "coverage request failed after {max_retries} attempts: {e}"
                )));
            }
        }
    }
}

impl CoverageSource for WcsClient {
    fn get_coverage(&self, bbox: BBox) -> Result<Coverage, Error> {
        let url = self.coverage_url(bbox);
        fetch_with_retries(|| self.fetch(&url), self.max_retries, self.retry_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_of_points_and_buffer() {
        let points = [[10.0, 20.0], [30.0, 5.0]];
        let bbox = BBox::of_points(points.iter()).unwrap();
        assert_eq!(bbox.min_x, 10.0);
        assert_eq!(bbox.max_y, 20.0);
        let buffered = bbox.buffered(20.0);
        assert_eq!(buffered.min_x, -10.0);
        assert_eq!(buffered.max_x, 50.0);
        assert!(BBox::of_points([].iter()).is_none());
    }

    #[test]
    fn retry_bound_is_exactly_the_configured_attempts() {
        let mut calls = 0;
        let result = fetch_with_retries(
            || {
                calls += 1;
                Err(Error::NetworkError("down".to_string()))
            },
            3,
            Duration::ZERO,
        );
        assert!(matches!(result, Err(Error::NetworkError(_))));
        assert_eq!(calls, 3);

        let mut calls = 0;
        let coverage = fetch_with_retries(
            || {
                calls += 1;
                if calls < 2 {
                    Err(Error::NetworkError("flaky".to_string()))
                } else {
                    Ok(vec![1])
                }
            },
            3,
            Duration::ZERO,
        )
        .unwrap();
        assert_eq!(coverage.retries, 1);
        assert_eq!(coverage.bytes, vec![1]);
    }

    #[test]
    fn coverage_url_subsets_are_integers() {
        let client = WcsClient::new(
            DEFAULT_ENDPOINT,
            "key",
            Duration::from_secs(10),
            3,
            Duration::from_secs(2),
        )
        .unwrap();
        let url = client.coverage_url(BBox {
            min_x: 385000.7,
            min_y: 6670000.2,
            max_x: 386000.9,
            max_y: 6671000.4,
        });
        assert!(url.contains("SUBSET=E(385000,386000)"));
        assert!(url.contains("SUBSET=N(6670000,6671000)"));
        assert!(url.contains("CoverageID=korkeusmalli_2m"));
        assert!(url.contains("api-key=key"));
    }
}
