//! JSON Schema of the audit report.

use anyhow::Result;
use schemars::schema_for;
use sheetaudit_core::AuditReport;

pub fn report_schema() -> Result<String> {
    let schema = schema_for!(AuditReport);
    Ok(serde_json::to_string_pretty(&schema)?)
}

pub fn run() -> Result<()> {
    println!("{}", report_schema()?);
    Ok(())
}
