//! LNT test-suite report for a merged stats directory
//!
//! Printed as pretty JSON, or submitted to an LNT server's `submitRun`
//! endpoint as the `input_data` form field.

use crate::jobstats::JobStats;
use anyhow::{anyhow, Context, Result};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Machine and run metadata for a submission
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LntOptions {
    pub machine: String,
    pub machine_info: BTreeMap<String, String>,
    pub run_info: BTreeMap<String, String>,
    pub order: String,
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LntMachine {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Info")]
    pub info: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LntRun {
    #[serde(rename = "Start Time")]
    pub start_time: String,
    #[serde(rename = "End Time")]
    pub end_time: String,
    #[serde(rename = "Info")]
    pub info: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LntTest {
    #[serde(rename = "Data")]
    pub data: Vec<i64>,
    #[serde(rename = "Info")]
    pub info: BTreeMap<String, String>,
    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LntReport {
    #[serde(rename = "Machine")]
    pub machine: LntMachine,
    #[serde(rename = "Run")]
    pub run: LntRun,
    #[serde(rename = "Tests")]
    pub tests: Vec<LntTest>,
}

/// LNT metric suffix for a counter
pub fn metric_suffix(stat: &str) -> &'static str {
    if stat.contains("BytesOutput") {
        "code_size"
    } else if stat.contains("RSS") || stat.contains("BytesAllocated") {
        "mem"
    } else {
        "compile"
    }
}

fn format_usec(usec: i64) -> Result<String> {
    let time = DateTime::from_timestamp_micros(usec)
        .ok_or_else(|| anyhow!("timestamp {}us out of range", usec))?;
    Ok(time.format(TIME_FORMAT).to_string())
}

impl LntReport {
    pub fn from_job(job: &JobStats, options: &LntOptions) -> Result<Self> {
        let mut run_info = BTreeMap::new();
        run_info.insert("run_order".to_string(), options.order.clone());
        run_info.insert("tag".to_string(), options.tag.clone());
        run_info.extend(options.run_info.clone());

        let tests = job
            .stats
            .iter()
            .map(|(stat, value)| LntTest {
                data: vec![*value],
                info: BTreeMap::new(),
                name: format!(
                    "{}.{}.{}.{}",
                    options.tag,
                    job.module,
                    stat,
                    metric_suffix(stat)
                ),
            })
            .collect();

        Ok(Self {
            machine: LntMachine {
                name: options.machine.clone(),
                info: options.machine_info.clone(),
            },
            run: LntRun {
                start_time: format_usec(job.start_usec)?,
                end_time: format_usec(job.end_usec())?,
                info: run_info,
            },
            tests,
        })
    }

    /// Pretty JSON with a four-space indent
    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        Ok(String::from_utf8(buf)?)
    }
}

pub fn write_lnt_report<W: Write>(mut out: W, report: &LntReport) -> Result<()> {
    writeln!(out, "{}", report.to_json()?)?;
    out.flush()?;
    Ok(())
}

/// Submit a report; the server must answer with a `success` key
pub fn submit_lnt_report(url: &str, report: &LntReport) -> Result<serde_json::Value> {
    tracing::info!("submitting to LNT server: {}", url);
    let input_data = serde_json::to_string(report)?;
    let response: serde_json::Value = reqwest::blocking::Client::new()
        .post(url)
        .form(&[("input_data", input_data.as_str()), ("commit", "1")])
        .send()
        .with_context(|| format!("Failed to submit to {}", url))?
        .json()
        .context("Failed to parse LNT server response")?;
    tracing::debug!("LNT response: {}", response);

    check_lnt_response(response)
}

fn check_lnt_response(response: serde_json::Value) -> Result<serde_json::Value> {
    if response.get("success").is_some() {
        tracing::info!("server response: Success");
        Ok(response)
    } else {
        let error = response
            .get("error")
            .map_or_else(|| response.to_string(), |e| e.to_string());
        Err(anyhow!("LNT server rejected submission: {}", error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobstats::JobKind;
    use crate::Snapshot;

    fn job() -> JobStats {
        let stats: Snapshot = [
            ("AST.NumSourceLines".to_string(), 120),
            ("IRGen.NumLLVMBytesOutput".to_string(), 4096),
            ("Frontend.MaxRSS".to_string(), 1 << 20),
        ]
        .into_iter()
        .collect();
        JobStats {
            kind: JobKind::Frontend,
            job_id: 1,
            module: "Swift".to_string(),
            start_usec: 1_500_000_000_000_000,
            dur_usec: 2_000_000,
            job_args: Vec::new(),
            stats,
        }
    }

    fn options() -> LntOptions {
        LntOptions {
            machine: "builder".to_string(),
            machine_info: [("os".to_string(), "macos".to_string())].into(),
            run_info: [("branch".to_string(), "main".to_string())].into(),
            order: "1234".to_string(),
            tag: "swift-compile".to_string(),
        }
    }

    #[test]
    fn test_metric_suffix() {
        assert_eq!(metric_suffix("IRGen.NumLLVMBytesOutput"), "code_size");
        assert_eq!(metric_suffix("Frontend.MaxRSS"), "mem");
        assert_eq!(metric_suffix("Frontend.BytesAllocated"), "mem");
        assert_eq!(metric_suffix("AST.NumSourceLines"), "compile");
    }

    #[test]
    fn test_report_from_job() {
        let report = LntReport::from_job(&job(), &options()).unwrap();
        assert_eq!(report.machine.name, "builder");
        assert_eq!(report.machine.info["os"], "macos");
        assert_eq!(report.run.start_time, "2017-07-14 02:40:00");
        assert_eq!(report.run.end_time, "2017-07-14 02:40:02");
        assert_eq!(report.run.info["run_order"], "1234");
        assert_eq!(report.run.info["tag"], "swift-compile");
        assert_eq!(report.run.info["branch"], "main");

        let names: Vec<&str> = report.tests.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "swift-compile.Swift.AST.NumSourceLines.compile",
                "swift-compile.Swift.Frontend.MaxRSS.mem",
                "swift-compile.Swift.IRGen.NumLLVMBytesOutput.code_size",
            ]
        );
        assert_eq!(report.tests[0].data, vec![120]);
    }

    #[test]
    fn test_run_info_overrides() {
        let mut opts = options();
        opts.run_info.insert("tag".to_string(), "override".to_string());
        let report = LntReport::from_job(&job(), &opts).unwrap();
        assert_eq!(report.run.info["tag"], "override");
    }

    #[test]
    fn test_json_layout() {
        let report = LntReport::from_job(&job(), &options()).unwrap();
        let json = report.to_json().unwrap();
        assert!(json.starts_with("{\n    \"Machine\": {\n        \"Name\": \"builder\""));
        assert!(json.contains("\"Start Time\": \"2017-07-14 02:40:00\""));
        assert!(json.contains("\"Data\": [\n                120\n            ]"));

        let parsed: LntReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn test_check_response() {
        assert!(check_lnt_response(serde_json::json!({"success": "yes"})).is_ok());
        let err = check_lnt_response(serde_json::json!({"error": "bad order"})).unwrap_err();
        assert!(err.to_string().contains("bad order"));
    }
}
