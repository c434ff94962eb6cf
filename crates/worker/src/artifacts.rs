//! Published artifact files.
//!
//! Each file is replaced whole: written to a sibling temp path unique to the
//! write and renamed over the target, so a reader sees either the previous or
//! the new table. Concurrent writers each rename a complete file; the last
//! rename wins.
//! A missing file is a normal state (`Ok(None)`), not an error.

use chrono::NaiveDate;
use outage_core::{CalendarSeason, ClusterRow, Error, Result, SeasonCount, SeverityLevel};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use telemetry::metrics;
use tracing::{debug, info};
use uuid::Uuid;

pub const CLUSTER_TABLE_FILE: &str = "cluster_table.csv";
pub const SEASON_COUNTS_FILE: &str = "season_counts.csv";

const CLUSTER_HEADER: &str = "period,percent_outage,trend,seasonal,cluster,cluster_name,calendar_season";

fn season_header() -> String {
    let names: Vec<&str> = SeverityLevel::ALL.iter().map(|l| l.name()).collect();
    format!("year,{}", names.join(","))
}

fn opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn cluster_table_path(&self) -> PathBuf {
        self.dir.join(CLUSTER_TABLE_FILE)
    }

    pub fn season_counts_path(&self) -> PathBuf {
        self.dir.join(SEASON_COUNTS_FILE)
    }

    pub async fn write_cluster_table(&self, rows: &[ClusterRow]) -> Result<()> {
        let mut out = String::with_capacity(64 * (rows.len() + 1));
        out.push_str(CLUSTER_HEADER);
        out.push('\n');
        for r in rows {
            out.push_str(&format!(
                "{},{},{},{},{},{},{}\n",
                r.period,
                r.percent_outage,
                opt(r.trend),
                opt(r.seasonal),
                r.cluster,
                r.cluster_name,
                r.calendar_season
            ));
        }
        self.write_atomic(&self.cluster_table_path(), out).await
    }

    pub async fn write_season_counts(&self, counts: &[SeasonCount]) -> Result<()> {
        let mut out = season_header();
        out.push('\n');
        for c in counts {
            let cells: Vec<String> = c.counts.iter().map(u64::to_string).collect();
            out.push_str(&format!("{},{}\n", c.year, cells.join(",")));
        }
        self.write_atomic(&self.season_counts_path(), out).await
    }

    pub async fn read_cluster_table(&self) -> Result<Option<Vec<ClusterRow>>> {
        let Some(body) = read_optional(&self.cluster_table_path()).await? else {
            return Ok(None);
        };
        body.lines()
            .skip(1)
            .filter(|l| !l.trim().is_empty())
            .map(parse_cluster_row)
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    pub async fn read_season_counts(&self) -> Result<Option<Vec<SeasonCount>>> {
        let Some(body) = read_optional(&self.season_counts_path()).await? else {
            return Ok(None);
        };
        body.lines()
            .skip(1)
            .filter(|l| !l.trim().is_empty())
            .map(parse_season_count)
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    async fn write_atomic(&self, path: &Path, contents: String) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::artifact(format!("create {}: {}", self.dir.display(), e)))?;

        let tmp = path.with_extension(format!("csv.{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&tmp, contents.as_bytes())
            .await
            .map_err(|e| Error::artifact(format!("write {}: {}", tmp.display(), e)))?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(Error::artifact(format!("publish {}: {}", path.display(), e)));
        }

        metrics().artifacts_written.inc();
        info!(path = %path.display(), bytes = contents.len(), "Published artifact");
        Ok(())
    }
}

async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(body) => Ok(Some(body)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "Artifact not published yet");
            Ok(None)
        }
        Err(e) => Err(Error::artifact(format!("read {}: {}", path.display(), e))),
    }
}

fn malformed(line: &str, what: &str) -> Error {
    Error::artifact(format!("malformed artifact row ({}): {}", what, line))
}

fn parse_f64(cell: &str, line: &str) -> Result<f64> {
    cell.parse().map_err(|_| malformed(line, "number"))
}

fn parse_opt_f64(cell: &str, line: &str) -> Result<Option<f64>> {
    if cell.is_empty() {
        Ok(None)
    } else {
        parse_f64(cell, line).map(Some)
    }
}

fn parse_cluster_row(line: &str) -> Result<ClusterRow> {
    let cells: Vec<&str> = line.split(',').collect();
    let [period, pct, trend, seasonal, cluster, name, season] = cells[..] else {
        return Err(malformed(line, "column count"));
    };
    Ok(ClusterRow {
        period: NaiveDate::parse_from_str(period, "%Y-%m-%d").map_err(|_| malformed(line, "period"))?,
        percent_outage: parse_f64(pct, line)?,
        trend: parse_opt_f64(trend, line)?,
        seasonal: parse_opt_f64(seasonal, line)?,
        cluster: cluster.parse().map_err(|_| malformed(line, "cluster"))?,
        cluster_name: SeverityLevel::parse(name).ok_or_else(|| malformed(line, "cluster_name"))?,
        calendar_season: CalendarSeason::parse(season).ok_or_else(|| malformed(line, "season"))?,
    })
}

fn parse_season_count(line: &str) -> Result<SeasonCount> {
    let cells: Vec<&str> = line.split(',').collect();
    if cells.len() != 1 + SeverityLevel::ALL.len() {
        return Err(malformed(line, "column count"));
    }
    let mut count = SeasonCount::new(cells[0].parse().map_err(|_| malformed(line, "year"))?);
    for (slot, cell) in count.counts.iter_mut().zip(&cells[1..]) {
        *slot = cell.parse().map_err(|_| malformed(line, "count"))?;
    }
    Ok(count)
}
