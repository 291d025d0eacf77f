#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use camino::Utf8PathBuf;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

use datapoints::error::DatapointsError;
use datapoints::http::HttpSource;
use datapoints::inspire::PARCELS_FILE;

pub const BASE: &str = "https://example.test";

pub const SAMPLE_GML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs/2.0" xmlns:gml="http://www.opengis.net/gml/3.2">
<gml:featureMember>
  <LR:PREDEFINED gml:id="LR.1001">
    <LR:INSPIREID>1001</LR:INSPIREID>
    <LR:GEOMETRY>
      <gml:Polygon gml:id="P1" srsName="urn:ogc:def:crs:EPSG::27700">
        <gml:exterior>
          <gml:LinearRing>
            <gml:posList srsDimension="2" count="5">0 0 10 0 10 10 0 10 0 0</gml:posList>
          </gml:LinearRing>
        </gml:exterior>
        <gml:interior>
          <gml:LinearRing>
            <gml:posList srsDimension="2" count="5">4 4 6 4 6 6 4 6 4 4</gml:posList>
          </gml:LinearRing>
        </gml:interior>
      </gml:Polygon>
    </LR:GEOMETRY>
  </LR:PREDEFINED>
</gml:featureMember>
<gml:featureMember>
  <LR:PREDEFINED gml:id="LR.1002">
    <LR:INSPIREID>1002</LR:INSPIREID>
    <LR:GEOMETRY>
      <gml:Polygon gml:id="P2" srsName="urn:ogc:def:crs:EPSG::27700">
        <gml:exterior>
          <gml:LinearRing>
            <gml:posList srsDimension="2" count="5">20 0 30 0 30 10 20 10 20 0</gml:posList>
          </gml:LinearRing>
        </gml:exterior>
      </gml:Polygon>
    </LR:GEOMETRY>
  </LR:PREDEFINED>
</gml:featureMember>
</wfs:FeatureCollection>
"#;

type Handler = dyn Fn(&str, usize) -> Result<Vec<u8>, DatapointsError> + Send + Sync;

/// Serves canned responses and records every requested URL.
///
/// The handler receives the URL and how many times it has been requested so far,
/// counting the current request.
#[derive(Clone)]
pub struct MockHttp {
    handler: Arc<Handler>,
    requests: Arc<Mutex<Vec<String>>>,
    delays: Arc<HashMap<String, Duration>>,
}

impl MockHttp {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&str, usize) -> Result<Vec<u8>, DatapointsError> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            requests: Arc::new(Mutex::new(Vec::new())),
            delays: Arc::new(HashMap::new()),
        }
    }

    /// Always answers with a valid authority archive.
    pub fn serving_archives() -> Self {
        Self::new(|_, _| Ok(parcels_zip()))
    }

    pub fn with_delay(mut self, url: &str, delay: Duration) -> Self {
        Arc::make_mut(&mut self.delays).insert(url.to_string(), delay);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|logged| logged.as_str() == url)
            .count()
    }
}

#[async_trait]
impl HttpSource for MockHttp {
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, DatapointsError> {
        let call = {
            let mut log = self.requests.lock().unwrap();
            log.push(url.to_string());
            log.iter().filter(|logged| logged.as_str() == url).count()
        };
        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }
        (self.handler)(url, call)
    }
}

pub fn zip_bytes(members: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in members {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// An authority archive as published: the parcels plus the licence text.
pub fn parcels_zip() -> Vec<u8> {
    zip_bytes(&[
        (PARCELS_FILE, SAMPLE_GML),
        ("INSPIRE Download Licence.txt", "Contains HM Land Registry data"),
    ])
}

pub fn temp_root() -> (TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    (dir, root)
}

/// Number of entries left in `dir`, treating a missing directory as empty.
pub fn entry_count(dir: &camino::Utf8Path) -> usize {
    std::fs::read_dir(dir.as_std_path())
        .map(|entries| entries.count())
        .unwrap_or(0)
}

pub fn archive_url(name: &str) -> String {
    format!("{BASE}/datasets/inspire/download/{name}.zip")
}
