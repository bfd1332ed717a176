//! Snapshot loading for the in-memory store.
//!
//! Readings are exported by the ingestion job as CSV, optionally gzip
//! compressed, either next to the service or in an S3 bucket.

use anyhow::{Context, Result};
use bytes::Bytes;
use flate2::read::GzDecoder;
use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use tracing::{info, warn};

use super::reading::{ReadingRow, SensorReading};

/// Where a reading snapshot lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadingSource {
    /// A CSV file on local disk.
    File(PathBuf),
    /// An object in S3, written as `s3://bucket/key`.
    S3 { bucket: String, key: String },
}

impl ReadingSource {
    pub fn parse(s: &str) -> Result<Self> {
        match s.strip_prefix("s3://") {
            Some(rest) => {
                let (bucket, key) = rest
                    .split_once('/')
                    .filter(|(b, k)| !b.is_empty() && !k.is_empty())
                    .ok_or_else(|| anyhow::anyhow!("S3 source must look like s3://bucket/key, got '{s}'"))?;
                Ok(ReadingSource::S3 {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                })
            }
            None => Ok(ReadingSource::File(PathBuf::from(s))),
        }
    }

    fn is_gzip(&self) -> bool {
        match self {
            ReadingSource::File(path) => path.extension().and_then(|e| e.to_str()) == Some("gz"),
            ReadingSource::S3 { key, .. } => key.ends_with(".gz"),
        }
    }
}

impl fmt::Display for ReadingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadingSource::File(path) => write!(f, "{}", path.display()),
            ReadingSource::S3 { bucket, key } => write!(f, "s3://{bucket}/{key}"),
        }
    }
}

/// Loads every reading from `source`, decompressing `.gz` snapshots.
#[tracing::instrument(skip(source), fields(source = %source))]
pub async fn load_readings(source: &ReadingSource) -> Result<Vec<SensorReading>> {
    let raw = match source {
        ReadingSource::File(path) => {
            let data = tokio::fs::read(path)
                .await
                .with_context(|| format!("failed to read readings file {}", path.display()))?;
            Bytes::from(data)
        }
        ReadingSource::S3 { bucket, key } => fetch_s3_object(bucket, key).await?,
    };

    let readings = if source.is_gzip() {
        parse_readings(GzDecoder::new(&raw[..]))?
    } else {
        parse_readings(&raw[..])?
    };

    info!(readings = readings.len(), "Reading snapshot loaded");
    Ok(readings)
}

/// Parses CSV rows (header required) into readings.
///
/// Rows that fail to deserialize are skipped with a warning so one bad export
/// line does not take the whole snapshot down.
pub fn parse_readings<R: Read>(reader: R) -> Result<Vec<SensorReading>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    // fail fast when the header itself is unreadable
    rdr.headers().context("readings CSV has no readable header")?;

    let mut readings = Vec::new();
    let mut skipped = 0usize;

    for (line, result) in rdr.deserialize::<ReadingRow>().enumerate() {
        match result {
            Ok(row) => readings.push(SensorReading::from(row)),
            Err(e) => {
                skipped += 1;
                warn!(line = line + 2, error = %e, "Skipping malformed reading row");
            }
        }
    }

    if skipped > 0 {
        warn!(skipped, "Some reading rows were skipped");
    }

    Ok(readings)
}

async fn fetch_s3_object(bucket: &str, key: &str) -> Result<Bytes> {
    let config = aws_config::load_from_env().await;
    let client = aws_sdk_s3::Client::new(&config);

    let resp = client
        .get_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .with_context(|| format!("S3 GetObject failed for s3://{bucket}/{key}"))?;

    let body = resp
        .body
        .collect()
        .await
        .with_context(|| format!("failed to read body of s3://{bucket}/{key}"))?;

    Ok(body.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    const CSV: &str = "\
detid,lon,lat,timestamp,speed,flow,occupancy,speed_limit,road_name
08.0001,-2.2401,53.4801,2017-09-05T08:00:00Z,42.5,310,0.12,48,A6 Stockport Road
08.0001,-2.2401,53.4801,2017-09-05T08:05:00Z,,305,,48,
08.0002,-2.2500,53.4700,not-a-time,30,10,0.1,30,
";

    #[test]
    fn test_source_parse() {
        assert_eq!(
            ReadingSource::parse("s3://bucket/snapshots/readings.csv.gz").unwrap(),
            ReadingSource::S3 {
                bucket: "bucket".to_string(),
                key: "snapshots/readings.csv.gz".to_string()
            }
        );
        assert_eq!(
            ReadingSource::parse("data/readings.csv").unwrap(),
            ReadingSource::File(PathBuf::from("data/readings.csv"))
        );
        assert!(ReadingSource::parse("s3://bucket").is_err());
        assert!(ReadingSource::parse("s3:///key").is_err());
    }

    #[test]
    fn test_parse_readings_handles_empty_fields_and_bad_rows() {
        let readings = parse_readings(CSV.as_bytes()).unwrap();

        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].speed, Some(42.5));
        assert_eq!(readings[0].road_name.as_deref(), Some("A6 Stockport Road"));
        assert_eq!(readings[1].speed, None);
        assert_eq!(readings[1].occupancy, None);
        assert_eq!(readings[1].road_name, None);
    }

    #[test]
    fn test_parse_gzip_snapshot() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(CSV.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        let readings = parse_readings(GzDecoder::new(compressed.as_slice())).unwrap();
        assert_eq!(readings.len(), 2);
    }

    #[tokio::test]
    async fn test_load_readings_missing_file() {
        let source = ReadingSource::File(PathBuf::from("/definitely/not/here.csv"));
        assert!(load_readings(&source).await.is_err());
    }
}
