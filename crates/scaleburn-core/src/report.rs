use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::LevelStatistic;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub concurrency: u32,
    #[serde(flatten)]
    pub stats: LevelStatistic,
}

/// Ordered per-level results of one test case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub name: String,
    pub rows: Vec<ReportRow>,
    pub total_elapsed_secs: f64,
}

impl Report {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, concurrency: u32, stats: LevelStatistic) {
        self.rows.push(ReportRow { concurrency, stats });
    }

    pub fn levels(&self) -> Vec<u32> {
        self.rows.iter().map(|r| r.concurrency).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::from("concurrency,prompt_tokens,completion_tokens,elapsed_time\n");
        for row in &self.rows {
            let _ = writeln!(
                out,
                "{},{},{},{}",
                row.concurrency,
                row.stats.prompt_tokens,
                row.stats.completion_tokens,
                row.stats.elapsed_secs
            );
        }
        out
    }

    pub fn to_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} stage:", self.name);
        let _ = writeln!(out, "{:-<78}", "");
        let _ = writeln!(
            out,
            "  {:>6} {:>14} {:>14} {:>12} {:>12} {:>12}",
            "conc", "prompt tok", "compl tok", "latency s", "prefill t/s", "decode t/s"
        );
        let _ = writeln!(out, "{:-<78}", "");
        for row in &self.rows {
            let s = &row.stats;
            let _ = writeln!(
                out,
                "  {:>6} {:>14.2} {:>14.2} {:>12.3} {:>12.2} {:>12.2}",
                row.concurrency,
                s.prompt_tokens,
                s.completion_tokens,
                s.elapsed_secs,
                s.prefill_tps(),
                s.decode_tps()
            );
        }
        let _ = writeln!(out, "{:-<78}", "");
        let _ = writeln!(out, "  Total time elapsed: {:.2} sec", self.total_elapsed_secs);
        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub info: String,
    pub host: String,
    #[serde(default)]
    pub models: Vec<String>,
}

/// Header describing the environment a set of reports was measured in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    #[serde(with = "datetime_format")]
    pub datetime: DateTime<Utc>,
    pub model: String,
    pub server: ServerInfo,
}

mod datetime_format {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}
