use chrono::NaiveDate;
use polars::prelude::*;
use serde::Serialize;

use crate::config::ProhibitedSpecies;
use crate::error::CatchNetError;
use crate::frame::{
    check_parse, ensure_unique_keys, float_expr, float_values, require_columns, string_values,
};
use crate::schema::{attribution, fish, transaction};
use crate::temporal::timestamp_expr;

/// Restricts transactions to one harbor and one export day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFilter {
    pub harbor: String,
    pub date: NaiveDate,
}

/// Validated transactions: string `cargo_id`/`fish_id`, numeric `qty_tons`,
/// calendar `date`.
///
/// Required columns: source, fish_id, qty_tons, target_harbor, date.
/// A row without species, harbor or date is malformed and rejects the
/// whole table.
fn validated_transactions(transactions: &DataFrame) -> Result<DataFrame, CatchNetError> {
    require_columns(
        transactions,
        transaction::TABLE,
        &[
            transaction::SOURCE,
            transaction::FISH_ID,
            transaction::QTY_TONS,
            transaction::TARGET_HARBOR,
            transaction::DATE,
        ],
    )?;

    let raw_dates = transactions.column(transaction::DATE)?.null_count();
    if raw_dates > 0 {
        return Err(CatchNetError::InvalidData(format!(
            "{}.{}: {raw_dates} row(s) have no value",
            transaction::TABLE,
            transaction::DATE
        )));
    }

    let df = transactions
        .clone()
        .lazy()
        .select([
            col(transaction::SOURCE)
                .cast(DataType::String)
                .alias(attribution::CARGO_ID),
            col(transaction::FISH_ID).cast(DataType::String),
            float_expr(transactions, transaction::QTY_TONS)?,
            col(transaction::TARGET_HARBOR).cast(DataType::String),
            timestamp_expr(transactions, transaction::DATE)?.cast(DataType::Date),
        ])
        .collect()?;
    check_parse(
        transactions,
        transaction::QTY_TONS,
        &df,
        transaction::QTY_TONS,
        transaction::TABLE,
        "numeric",
    )?;
    check_parse(
        transactions,
        transaction::DATE,
        &df,
        transaction::DATE,
        transaction::TABLE,
        "dates",
    )?;

    for required in [transaction::FISH_ID, transaction::TARGET_HARBOR] {
        let nulls = df.column(required)?.null_count();
        if nulls > 0 {
            return Err(CatchNetError::InvalidData(format!(
                "{}.{required}: {nulls} row(s) have no value",
                transaction::TABLE
            )));
        }
    }
    Ok(df)
}

fn apply_filter(df: DataFrame, filter: Option<&ExportFilter>) -> LazyFrame {
    let lazy = df.lazy();
    match filter {
        Some(f) => lazy.filter(
            col(transaction::TARGET_HARBOR)
                .eq(lit(f.harbor.clone()))
                .and(col(transaction::DATE).eq(lit(f.date))),
        ),
        None => lazy,
    }
}

/// Fish lookup keyed by string `fish_id`.
fn species_frame(fish_table: &DataFrame) -> Result<DataFrame, CatchNetError> {
    require_columns(fish_table, fish::TABLE, &[fish::ID, fish::ENTITY_NAME])?;
    let species = fish_table
        .clone()
        .lazy()
        .select([
            col(fish::ID)
                .cast(DataType::String)
                .alias(transaction::FISH_ID),
            col(fish::ENTITY_NAME).cast(DataType::String),
        ])
        .collect()?;
    ensure_unique_keys(&species, fish::TABLE, transaction::FISH_ID)?;
    Ok(species)
}

/// Attribution units: one row per (cargo_id, fish_id) with summed
/// `qty_tons` and the species `entity_name` (null for unknown fish ids).
pub fn prepare_cargos(
    transactions: &DataFrame,
    fish_table: &DataFrame,
    filter: Option<&ExportFilter>,
) -> Result<DataFrame, CatchNetError> {
    let tx = validated_transactions(transactions)?;
    let species = species_frame(fish_table)?;

    let cargos = apply_filter(tx, filter)
        .group_by([col(attribution::CARGO_ID), col(transaction::FISH_ID)])
        .agg([col(transaction::QTY_TONS).sum()])
        .join(
            species.lazy(),
            [col(transaction::FISH_ID)],
            [col(transaction::FISH_ID)],
            JoinArgs::new(JoinType::Left),
        )
        .collect()?;

    tracing::debug!(cargos = cargos.height(), "cargo units prepared");
    Ok(cargos)
}

/// Per-species export volume at a harbor on a day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub fish_id: String,
    pub exports_tons: Option<f64>,
    pub fish_name: Option<String>,
    pub is_prohibited: bool,
}

/// Sum `qty_tons` per fish for the filtered transactions, sorted by fish_id.
pub fn daily_exports(
    transactions: &DataFrame,
    fish_table: &DataFrame,
    prohibited: &ProhibitedSpecies,
    filter: &ExportFilter,
) -> Result<Vec<ExportRow>, CatchNetError> {
    let tx = validated_transactions(transactions)?;
    let species = species_frame(fish_table)?;

    let summed = apply_filter(tx, Some(filter))
        .group_by([col(transaction::FISH_ID)])
        .agg([col(transaction::QTY_TONS)
            .sum()
            .alias(attribution::EXPORTS_TONS)])
        .join(
            species.lazy(),
            [col(transaction::FISH_ID)],
            [col(transaction::FISH_ID)],
            JoinArgs::new(JoinType::Left),
        )
        .collect()?;

    let ids = string_values(&summed, transaction::FISH_ID)?;
    let tons = float_values(&summed, attribution::EXPORTS_TONS)?;
    let names = string_values(&summed, fish::ENTITY_NAME)?;

    let mut rows: Vec<ExportRow> = ids
        .into_iter()
        .zip(tons)
        .zip(names)
        .filter_map(|((id, tons), name)| {
            id.map(|fish_id| ExportRow {
                fish_id,
                exports_tons: tons.and_then(crate::frame::finite),
                is_prohibited: name.as_deref().is_some_and(|n| prohibited.contains(n)),
                fish_name: name,
            })
        })
        .collect();
    rows.sort_by(|a, b| a.fish_id.cmp(&b.fish_id));
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transactions() -> DataFrame {
        df!(
            "source" => &["C1", "C1", "C2", "C3"],
            "fish_id" => &["1", "1", "2", "1"],
            "qty_tons" => &["10", "5", "2.5", "7"],
            "target_harbor" => &["City of Haacklee", "City of Haacklee", "City of Haacklee", "City of Paackland"],
            "date" => &["2035-09-16", "2035-09-16", "2035-09-16 00:00:00", "2035-09-16"]
        )
        .unwrap()
    }

    fn fish_table() -> DataFrame {
        df!(
            "id" => &[1i64, 2],
            "entity_name" => &["Tuna", "Sockfish/Pisces foetida"]
        )
        .unwrap()
    }

    fn haacklee() -> ExportFilter {
        ExportFilter {
            harbor: "City of Haacklee".to_string(),
            date: NaiveDate::from_ymd_opt(2035, 9, 16).unwrap(),
        }
    }

    #[test]
    fn cargo_rows_are_summed_per_cargo_and_species() {
        let cargos = prepare_cargos(&transactions(), &fish_table(), Some(&haacklee())).unwrap();
        assert_eq!(cargos.height(), 2);
        let ids = string_values(&cargos, "cargo_id").unwrap();
        let qty = float_values(&cargos, "qty_tons").unwrap();
        let names = string_values(&cargos, "entity_name").unwrap();
        for i in 0..cargos.height() {
            match ids[i].as_deref() {
                Some("C1") => {
                    assert_eq!(qty[i], Some(15.0));
                    assert_eq!(names[i].as_deref(), Some("Tuna"));
                }
                Some("C2") => assert_eq!(qty[i], Some(2.5)),
                other => panic!("unexpected cargo {other:?}"),
            }
        }
    }

    #[test]
    fn daily_exports_flags_prohibited_species() {
        let rows = daily_exports(
            &transactions(),
            &fish_table(),
            &ProhibitedSpecies::default(),
            &haacklee(),
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fish_id, "1");
        assert_eq!(rows[0].exports_tons, Some(15.0));
        assert!(!rows[0].is_prohibited);
        assert_eq!(rows[1].fish_name.as_deref(), Some("Sockfish/Pisces foetida"));
        assert!(rows[1].is_prohibited);
    }

    #[test]
    fn unknown_harbor_gives_no_rows() {
        let filter = ExportFilter {
            harbor: "Nowhere".to_string(),
            ..haacklee()
        };
        let rows = daily_exports(
            &transactions(),
            &fish_table(),
            &ProhibitedSpecies::default(),
            &filter,
        )
        .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn cargo_without_harbor_is_rejected() {
        let tx = df!(
            "source" => &["C1"],
            "fish_id" => &["1"],
            "qty_tons" => &[1.0],
            "target_harbor" => &[None::<&str>],
            "date" => &["2035-09-16"]
        )
        .unwrap();
        assert!(matches!(
            prepare_cargos(&tx, &fish_table(), None),
            Err(CatchNetError::InvalidData(_))
        ));
    }

    #[test]
    fn duplicate_fish_ids_are_fatal() {
        let fish = df!(
            "id" => &[1i64, 1, 2],
            "entity_name" => &["Tuna", "Thunnus", "Cod"]
        )
        .unwrap();
        assert!(matches!(
            prepare_cargos(&transactions(), &fish, Some(&haacklee())),
            Err(CatchNetError::JoinIntegrity { duplicates: 1, .. })
        ));
        assert!(matches!(
            daily_exports(
                &transactions(),
                &fish,
                &ProhibitedSpecies::default(),
                &haacklee()
            ),
            Err(CatchNetError::JoinIntegrity { .. })
        ));
    }

    #[test]
    fn missing_date_is_invalid_data() {
        let tx = df!(
            "source" => &["C1"],
            "fish_id" => &["1"],
            "qty_tons" => &[1.0],
            "target_harbor" => &["City of Haacklee"],
            "date" => &[None::<&str>]
        )
        .unwrap();
        assert!(matches!(
            prepare_cargos(&tx, &fish_table(), None),
            Err(CatchNetError::InvalidData(_))
        ));
    }

    #[test]
    fn bad_date_is_a_validation_error() {
        let tx = df!(
            "source" => &["C1"],
            "fish_id" => &["1"],
            "qty_tons" => &[1.0],
            "target_harbor" => &["City of Haacklee"],
            "date" => &["someday"]
        )
        .unwrap();
        assert!(matches!(
            prepare_cargos(&tx, &fish_table(), None),
            Err(CatchNetError::Validation(_))
        ));
    }
}
