//! Type definitions for the Google Drive v3 and Sheets v4 APIs.

use serde::{Deserialize, Serialize};
use sheetaudit_core::{OwnerRef, PermissionEntry, SheetTab, TabStructure};

// API request/response types for internal use with Google Drive

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileListResponse<T> {
    #[serde(default = "Vec::new")]
    pub files: Vec<T>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PermissionListResponse {
    #[serde(default)]
    pub permissions: Vec<PermissionEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub web_view_link: Option<String>,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub modified_time: Option<String>,
    #[serde(default)]
    pub owners: Vec<OwnerRef>,
}

// API request/response types for internal use with Google Sheets

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Spreadsheet {
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Sheet {
    pub properties: SheetProperties,
    #[serde(default)]
    pub data: Vec<GridData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SheetProperties {
    #[serde(default)]
    pub sheet_id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub grid_properties: GridProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GridProperties {
    #[serde(default)]
    pub row_count: i64,
    #[serde(default)]
    pub column_count: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GridData {
    #[serde(default)]
    pub row_data: Vec<RowData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RowData {
    #[serde(default)]
    pub values: Vec<CellData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CellData {
    #[serde(default)]
    pub user_entered_value: Option<ExtendedValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExtendedValue {
    #[serde(default)]
    pub formula_value: Option<String>,
}

/// The API omits `values` entirely for an empty range.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ValueRange {
    #[serde(default)]
    pub values: Vec<Vec<serde_json::Value>>,
}

impl Sheet {
    pub(crate) fn into_tab_structure(self) -> TabStructure {
        let Self { properties, data } = self;
        let formulas = data
            .into_iter()
            .flat_map(|grid| grid.row_data)
            .map(|row| {
                row.values
                    .into_iter()
                    .map(|cell| {
                        cell.user_entered_value
                            .and_then(|value| value.formula_value)
                    })
                    .collect()
            })
            .collect();

        TabStructure::new(SheetTab {
            title: properties.title,
            sheet_id: properties.sheet_id,
            index: properties.index,
            row_count: properties.grid_properties.row_count,
            column_count: properties.grid_properties.column_count,
        })
        .with_formulas(formulas)
    }
}

// Display types returned by the spreadsheet views and file actions

/// A spreadsheet in the display listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetLink {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
}

/// File metadata and tab structure of one spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetDetails {
    pub id: String,
    pub name: String,
    pub web_view_link: Option<String>,
    pub created_time: Option<String>,
    pub modified_time: Option<String>,
    pub owners: Vec<OwnerRef>,
    pub sheet_count: usize,
    pub tabs: Vec<SheetTab>,
}

/// The file created by a copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopiedFile {
    pub id: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_sheet_collects_formulas_across_grid_chunks() {
        let sheet: Sheet = serde_json::from_value(json!({
            "properties": {
                "sheetId": 7,
                "title": "Data",
                "index": 1,
                "gridProperties": {"rowCount": 100, "columnCount": 5}
            },
            "data": [
                {"rowData": [
                    {"values": [
                        {"userEnteredValue": {"formulaValue": "=IMPORTRANGE(\"u\",\"A1\")"}},
                        {"userEnteredValue": {"stringValue": "plain"}},
                        {}
                    ]}
                ]},
                {"rowData": [
                    {},
                    {"values": [{"userEnteredValue": {"formulaValue": "=SUM(A1:A2)"}}]}
                ]}
            ]
        }))
        .unwrap();

        let structure = sheet.into_tab_structure();

        assert_eq!(structure.tab.title, "Data");
        assert_eq!(structure.tab.sheet_id, 7);
        assert_eq!(structure.tab.row_count, 100);
        assert_eq!(
            structure.formulas,
            vec![
                vec![Some("=IMPORTRANGE(\"u\",\"A1\")".to_string()), None, None],
                vec![],
                vec![Some("=SUM(A1:A2)".to_string())],
            ]
        );
    }

    #[test]
    fn test_value_range_without_values_is_empty() {
        let range: ValueRange =
            serde_json::from_value(json!({"range": "'Empty'!A1:Z1000", "majorDimension": "ROWS"}))
                .unwrap();
        assert!(range.values.is_empty());
    }

    #[test]
    fn test_sheet_without_grid_properties_defaults_extent() {
        let sheet: Sheet =
            serde_json::from_value(json!({"properties": {"title": "Bare"}})).unwrap();
        let structure = sheet.into_tab_structure();
        assert_eq!(structure.tab.row_count, 0);
        assert!(structure.formulas.is_empty());
    }
}
