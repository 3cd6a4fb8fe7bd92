//! Card catalog ingest: an 8-column CSV of card definitions, validated row
//! by row. Malformed rows are rejected and reported, never fatal; the engine
//! only ever sees well-formed definitions.
//!
//! Columns: `attribute_id, buff_type, trigger_type, value_type, target_type,
//! buff_description, report_description, value`. The three `*_type` columns
//! carry numeric codes from the card data format; `target_type` is
//! `self`/`enemy`.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::combat::card::{BuffStat, CardDefinition, TargetType, TriggerType, ValueType};

#[derive(Debug)]
pub enum CatalogError {
    Read(std::io::Error),
    Csv(csv::Error),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read(err) => write!(f, "failed to read card catalog: {err}"),
            Self::Csv(err) => write!(f, "failed to parse card catalog: {err}"),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read(err) => Some(err),
            Self::Csv(err) => Some(err),
        }
    }
}

/// A catalog row that failed validation, with the 1-based data row number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedRecord {
    pub row: usize,
    pub id: String,
    pub reason: String,
}

/// Accepted definitions plus everything that was turned away and why.
#[derive(Debug, Clone, Default)]
pub struct CatalogReport {
    pub cards: Vec<CardDefinition>,
    pub rejected: Vec<RejectedRecord>,
}

impl CatalogReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&CardDefinition> {
        self.cards.iter().find(|card| card.id == id)
    }
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    attribute_id: String,
    buff_type: String,
    trigger_type: String,
    value_type: String,
    target_type: String,
    buff_description: String,
    report_description: String,
    value: String,
}

fn validate(raw: &RawRecord) -> Result<CardDefinition, String> {
    let id = raw.attribute_id.trim();
    if id.is_empty() {
        return Err("missing attribute_id".to_string());
    }

    let buff_code: u8 = raw
        .buff_type
        .trim()
        .parse()
        .map_err(|_| format!("buff_type '{}' is not a number", raw.buff_type))?;
    let buff_stat =
        BuffStat::from_code(buff_code).ok_or_else(|| format!("unknown buff_type {buff_code}"))?;

    let trigger_code: u8 = raw
        .trigger_type
        .trim()
        .parse()
        .map_err(|_| format!("trigger_type '{}' is not a number", raw.trigger_type))?;
    let trigger = TriggerType::from_code(trigger_code)
        .ok_or_else(|| format!("unknown trigger_type {trigger_code}"))?;

    let value_code: u8 = raw
        .value_type
        .trim()
        .parse()
        .map_err(|_| format!("value_type '{}' is not a number", raw.value_type))?;
    let value = ValueType::from_code(value_code)
        .ok_or_else(|| format!("unknown value_type {value_code}"))?;

    let target = TargetType::from_label(&raw.target_type)
        .ok_or_else(|| format!("unknown target_type '{}'", raw.target_type.trim()))?;

    if raw.buff_description.trim().is_empty() {
        return Err("missing buff_description".to_string());
    }
    if raw.report_description.trim().is_empty() {
        return Err("missing report_description".to_string());
    }

    let magnitude: f64 = raw
        .value
        .trim()
        .parse()
        .map_err(|_| format!("value '{}' is not a number", raw.value))?;
    if !magnitude.is_finite() {
        return Err(format!("value '{}' is not finite", raw.value));
    }

    Ok(CardDefinition {
        id: id.to_string(),
        buff_stat,
        trigger,
        value,
        target,
        magnitude,
        description: raw.buff_description.trim().to_string(),
        report_template: raw.report_description.trim().to_string(),
    })
}

/// Parse a catalog from any reader. Row-level problems land in the report;
/// only unreadable input is an error.
pub fn parse_catalog<R: Read>(reader: R) -> Result<CatalogReport, CatalogError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut report = CatalogReport::default();
    for (index, result) in csv_reader.deserialize::<RawRecord>().enumerate() {
        let row = index + 1;
        let raw = match result {
            Ok(raw) => raw,
            Err(err) => {
                report.rejected.push(RejectedRecord {
                    row,
                    id: String::new(),
                    reason: format!("unreadable row: {err}"),
                });
                continue;
            }
        };
        match validate(&raw) {
            Ok(card) => report.cards.push(card),
            Err(reason) => report.rejected.push(RejectedRecord {
                row,
                id: raw.attribute_id.trim().to_string(),
                reason,
            }),
        }
    }
    Ok(report)
}

/// Load a catalog CSV from disk.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<CatalogReport, CatalogError> {
    let file = File::open(path).map_err(CatalogError::Read)?;
    parse_catalog(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "attribute_id,buff_type,trigger_type,value_type,target_type,buff_description,report_description,value\n";

    fn parse(rows: &str) -> CatalogReport {
        let input = format!("{HEADER}{rows}");
        parse_catalog(input.as_bytes()).expect("catalog parse")
    }

    #[test]
    fn well_formed_rows_are_accepted() {
        let report = parse(
            "sharpen,1,2,1,self,Attack up at battle start,{player} sharpens their blade,50\n\
             weaken,1,2,1,enemy,Lower enemy attack,{player} curses the foe,-25.5\n",
        );
        assert!(report.is_clean());
        assert_eq!(report.cards.len(), 2);

        let sharpen = report.find("sharpen").expect("sharpen present");
        assert_eq!(sharpen.buff_stat, BuffStat::Attack);
        assert_eq!(sharpen.trigger, TriggerType::OnBattleStart);
        assert_eq!(sharpen.value, ValueType::Flat);
        assert_eq!(sharpen.target, TargetType::SelfSide);
        assert_eq!(sharpen.magnitude, 50.0);

        let weaken = report.find("weaken").expect("weaken present");
        assert_eq!(weaken.target, TargetType::Enemy);
        assert_eq!(weaken.magnitude, -25.5);
    }

    #[test]
    fn unknown_codes_are_rejected_per_row() {
        let report = parse(
            "ok,1,2,1,self,desc,{player} acts,10\n\
             bad_buff,99,2,1,self,desc,{player} acts,10\n\
             bad_trigger,1,42,1,self,desc,{player} acts,10\n\
             bad_value,1,2,9,self,desc,{player} acts,10\n\
             bad_target,1,2,1,everyone,desc,{player} acts,10\n",
        );
        assert_eq!(report.cards.len(), 1);
        assert_eq!(report.rejected.len(), 4);
        assert!(report.rejected[0].reason.contains("unknown buff_type"));
        assert!(report.rejected[1].reason.contains("unknown trigger_type"));
        assert!(report.rejected[2].reason.contains("unknown value_type"));
        assert!(report.rejected[3].reason.contains("unknown target_type"));
    }

    #[test]
    fn missing_fields_and_bad_numbers_are_rejected() {
        let report = parse(
            ",1,2,1,self,desc,{player} acts,10\n\
             no_desc,1,2,1,self,,{player} acts,10\n\
             no_report,1,2,1,self,desc,,10\n\
             nan_value,1,2,1,self,desc,{player} acts,much\n",
        );
        assert!(report.cards.is_empty());
        assert_eq!(report.rejected.len(), 4);
        assert_eq!(report.rejected[0].reason, "missing attribute_id");
        assert_eq!(report.rejected[1].reason, "missing buff_description");
        assert_eq!(report.rejected[2].reason, "missing report_description");
        assert!(report.rejected[3].reason.contains("not a number"));
    }

    #[test]
    fn rejection_rows_are_one_based_data_rows() {
        let report = parse(
            "first,1,2,1,self,desc,{player} acts,10\n\
             ,1,2,1,self,desc,{player} acts,10\n",
        );
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].row, 2);
    }

    #[test]
    fn empty_catalog_is_clean_and_empty() {
        let report = parse("");
        assert!(report.is_clean());
        assert!(report.cards.is_empty());
    }
}
