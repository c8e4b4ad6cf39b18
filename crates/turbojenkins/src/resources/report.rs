//! Test and coverage reports attached to a build

use serde::Deserialize;
use serde_json::{Map, Value};
use turbojenkins_core::snake_to_camel;

use crate::{
    error::{Error, Result},
    item::Item,
};

/// JUnit results of one build.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestReport {
    /// Total run time in seconds
    #[serde(default)]
    pub duration: f64,
    /// Failed cases
    #[serde(default)]
    pub fail_count: u64,
    /// Passed cases
    #[serde(default)]
    pub pass_count: u64,
    /// Skipped cases
    #[serde(default)]
    pub skip_count: u64,
    /// Suites in the order reported
    #[serde(default)]
    pub suites: Vec<TestSuite>,
    /// Any other fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TestReport {
    /// Suite named `name`.
    pub fn get(&self, name: &str) -> Option<&TestSuite> {
        self.suites.iter().find(|suite| suite.name == name)
    }

    /// An unmapped field by snake_case name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.extra.get(&snake_to_camel(name))
    }
}

/// One suite of a [`TestReport`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSuite {
    /// Suite name
    pub name: String,
    /// Run time in seconds
    #[serde(default)]
    pub duration: f64,
    /// Cases in the order reported
    #[serde(default)]
    pub cases: Vec<TestCase>,
    /// Any other fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TestSuite {
    /// Case named `name`.
    pub fn get(&self, name: &str) -> Option<&TestCase> {
        self.cases.iter().find(|case| case.name == name)
    }

    /// An unmapped field by snake_case name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.extra.get(&snake_to_camel(name))
    }
}

/// One case of a [`TestSuite`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    /// Case name
    pub name: String,
    /// Class the case belongs to
    #[serde(default)]
    pub class_name: Option<String>,
    /// `PASSED`, `FAILED`, `SKIPPED`, `FIXED`, `REGRESSION`
    #[serde(default)]
    pub status: Option<String>,
    /// Run time in seconds
    #[serde(default)]
    pub duration: f64,
    /// Failure message
    #[serde(default)]
    pub error_details: Option<String>,
    /// Failure stack trace
    #[serde(default)]
    pub error_stack_trace: Option<String>,
    /// Any other fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TestCase {
    /// An unmapped field by snake_case name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.extra.get(&snake_to_camel(name))
    }
}

/// The coverage counters JaCoCo publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoverageType {
    /// `branchCoverage`
    Branch,
    /// `classCoverage`
    Class,
    /// `complexityScore`
    Complexity,
    /// `instructionCoverage`
    Instruction,
    /// `lineCoverage`
    Line,
    /// `methodCoverage`
    Method,
}

impl CoverageType {
    /// Field name in the report's `api/json`.
    pub fn field(self) -> &'static str {
        match self {
            CoverageType::Branch => "branchCoverage",
            CoverageType::Class => "classCoverage",
            CoverageType::Complexity => "complexityScore",
            CoverageType::Instruction => "instructionCoverage",
            CoverageType::Line => "lineCoverage",
            CoverageType::Method => "methodCoverage",
        }
    }
}

/// One coverage counter.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coverage {
    /// Counter name, e.g. `lineCoverage`
    #[serde(skip)]
    pub name: String,
    /// Covered units
    #[serde(default)]
    pub covered: u64,
    /// Missed units
    #[serde(default)]
    pub missed: u64,
    /// Total units
    #[serde(default)]
    pub total: u64,
    /// Rounded percentage
    #[serde(default)]
    pub percentage: Option<f64>,
    /// Exact percentage
    #[serde(default)]
    pub percentage_float: Option<f64>,
    /// Any other fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Keys of a coverage result that are not counters.
const NON_COUNTER_KEYS: [&str; 2] = ["_class", "previousResult"];

/// JaCoCo report of one build, at `{build}/jacoco/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageReport {
    item: Item,
}

impl CoverageReport {
    pub(crate) fn new(item: Item) -> Self {
        Self { item }
    }

    /// Every counter of this build.
    pub async fn iter(&self) -> Result<Vec<Coverage>> {
        let data = self.item.fetch_json("", 0).await?;
        counters(&data, self.item.url())
    }

    /// The counter of `kind`, if reported.
    pub async fn get(&self, kind: CoverageType) -> Result<Option<Coverage>> {
        Ok(self
            .iter()
            .await?
            .into_iter()
            .find(|coverage| coverage.name == kind.field()))
    }

    /// Counters of this build and up to `count` previous ones, oldest
    /// first.
    pub async fn trends(&self, count: u32) -> Result<Vec<Coverage>> {
        let data = self.item.fetch_json("", count).await?;
        let mut chain = Vec::new();
        let mut current = Some(&data);
        while let Some(result) = current {
            chain.push(result);
            current = result.get("previousResult").filter(|prev| prev.is_object());
        }
        let mut trends = Vec::new();
        for result in chain.into_iter().rev() {
            trends.extend(counters(result, self.item.url())?);
        }
        Ok(trends)
    }
}

remote_item!(CoverageReport);

fn counters(result: &Value, url: &str) -> Result<Vec<Coverage>> {
    let Some(object) = result.as_object() else {
        return Ok(Vec::new());
    };
    object
        .iter()
        .filter(|(key, value)| !NON_COUNTER_KEYS.contains(&key.as_str()) && value.is_object())
        .map(|(key, value)| {
            let mut coverage: Coverage = serde_json::from_value(value.clone())
                .map_err(|e| Error::ResponseValidation(format!("{key} of {url}: {e}")))?;
            coverage.name = key.clone();
            Ok(coverage)
        })
        .collect()
}
