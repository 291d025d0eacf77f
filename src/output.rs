use std::io::{self, Write};

use serde::Serialize;

use crate::app::{CatalogResult, FetchResult, ListResult, LocateResult, PathResult, ShowResult};
use crate::inspire::{BulkReport, ItemStatus};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Text,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_catalog(result: &CatalogResult) -> io::Result<()> {
        let mut out = io::stdout().lock();
        for entry in &result.entries {
            match &entry.source_url {
                Some(url) => writeln!(out, "{}\t{url}", entry.name)?,
                None => writeln!(out, "{}", entry.name)?,
            }
        }
        Ok(())
    }

    pub fn print_bulk(report: &BulkReport) -> io::Result<()> {
        let mut out = io::stdout().lock();
        for item in &report.items {
            let detail = match (&item.path, &item.error) {
                (Some(path), _) => format!("-> {path}"),
                (None, Some(error)) => error.clone(),
                (None, None) => String::new(),
            };
            writeln!(out, "{:<10} {} {detail}", status_label(item.status), item.name)?;
        }
        let failed = report.failures().count();
        writeln!(
            out,
            "{} authorities, {} failed",
            report.items.len(),
            failed
        )
    }

    pub fn print_fetch(result: &FetchResult) -> io::Result<()> {
        writeln!(
            io::stdout(),
            "{} ({}) -> {}",
            result.name,
            result.action,
            result.path
        )
    }

    pub fn print_path(result: &PathResult) -> io::Result<()> {
        writeln!(io::stdout(), "{}", result.path)
    }

    pub fn print_list(result: &ListResult) -> io::Result<()> {
        let mut out = io::stdout().lock();
        for path in &result.paths {
            writeln!(out, "{path}")?;
        }
        Ok(())
    }

    pub fn print_show(result: &ShowResult) -> io::Result<()> {
        let mut out = io::stdout().lock();
        for sale in &result.sales {
            writeln!(out, "{}", sale.summary)?;
        }
        Ok(())
    }

    pub fn print_locate(result: &LocateResult) -> io::Result<()> {
        let mut out = io::stdout().lock();
        match (result.index, &result.inspire_id) {
            (Some(index), Some(id)) => {
                write!(out, "parcel #{index} INSPIREID {id}")?;
                if let Some((x, y)) = result.anchor {
                    write!(out, " (centroid {x:.2}, {y:.2})")?;
                }
                writeln!(out)
            }
            _ => writeln!(out, "no parcel contains ({}, {})", result.x, result.y),
        }
    }
}

fn status_label(status: ItemStatus) -> &'static str {
    match status {
        ItemStatus::Cached => "cached",
        ItemStatus::Downloaded => "downloaded",
        ItemStatus::Failed => "failed",
    }
}
