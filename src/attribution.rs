use std::cmp::Ordering;
use std::collections::BTreeSet;

use polars::prelude::*;
use serde::Serialize;

use crate::config::ProhibitedSpecies;
use crate::error::CatchNetError;
use crate::frame::{finite_opt, float_values, require_columns, string_values};
use crate::habitat::HabitatIndex;
use crate::schema::{attribution, dwell, fish, prepared, transaction};

/// Estimated share of one cargo caught by one vessel at one location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatchAttribution {
    pub cargo_id: String,
    pub vessel_name: String,
    pub fish_name: String,
    pub location_name: String,
    /// Summed dwell seconds of the vessel's candidate visits.
    pub dwell: Option<f64>,
    pub tonnage: Option<f64>,
    pub estimated_tons: f64,
    pub share_percent: f64,
    pub is_prohibited: bool,
}

/// Apportions cargo tonnage across vessels that dwelt in the species'
/// habitat, weighting each visit by `tonnage * dwell`.
pub struct AttributionEngine<'a> {
    habitat: &'a HabitatIndex,
    prohibited: &'a ProhibitedSpecies,
}

impl<'a> AttributionEngine<'a> {
    pub fn new(habitat: &'a HabitatIndex, prohibited: &'a ProhibitedSpecies) -> Self {
        Self {
            habitat,
            prohibited,
        }
    }

    /// Attribute every cargo to its candidate vessels.
    ///
    /// `cargos` needs cargo_id, fish_id, entity_name, qty_tons (see
    /// [`crate::exports::prepare_cargos`]); `dwell_events` needs
    /// vessel_name, location_name, dwell, tonnage (see
    /// [`crate::dwell::prepare`]).
    ///
    /// Cargos whose species has no habitat, that have no candidate visits,
    /// whose candidates all weigh zero or whose quantity is not positive are
    /// skipped. For every emitted cargo the estimated tons sum to its
    /// quantity and the shares to 100.
    pub fn attribute(
        &self,
        cargos: &DataFrame,
        dwell_events: &DataFrame,
    ) -> Result<Vec<CatchAttribution>, CatchNetError> {
        require_columns(
            cargos,
            "cargos",
            &[
                attribution::CARGO_ID,
                transaction::FISH_ID,
                fish::ENTITY_NAME,
                transaction::QTY_TONS,
            ],
        )?;
        require_columns(
            dwell_events,
            dwell::TABLE,
            &[
                dwell::VESSEL_NAME,
                dwell::LOCATION_NAME,
                dwell::DWELL,
                prepared::TONNAGE,
            ],
        )?;

        let habitat = self.habitat.to_frame()?;
        let units = cargos.clone().lazy().select([
            col(attribution::CARGO_ID).cast(DataType::String),
            col(transaction::FISH_ID).cast(DataType::String),
            col(fish::ENTITY_NAME).cast(DataType::String),
            col(transaction::QTY_TONS).cast(DataType::Float64),
        ]);
        let candidates = dwell_events.clone().lazy().select([
            col(dwell::VESSEL_NAME),
            col(dwell::LOCATION_NAME),
            col(dwell::DWELL).cast(DataType::Float64),
            col(prepared::TONNAGE).cast(DataType::Float64),
        ]);

        let unit_keys = [col(attribution::CARGO_ID), col(transaction::FISH_ID)];

        let out = units
            .filter(col(transaction::QTY_TONS).gt(lit(0.0)))
            // cargo -> habitat locations
            .join(
                habitat.lazy(),
                [col(fish::ENTITY_NAME)],
                [col(fish::ENTITY_NAME)],
                JoinArgs::new(JoinType::Inner),
            )
            // habitat locations -> visits there
            .join(
                candidates,
                [col(dwell::LOCATION_NAME)],
                [col(dwell::LOCATION_NAME)],
                JoinArgs::new(JoinType::Inner),
            )
            .filter(col(dwell::VESSEL_NAME).is_not_null())
            .with_column(
                (col(prepared::TONNAGE).fill_null(lit(0.0)) * col(dwell::DWELL).fill_null(lit(0.0)))
                    .alias(attribution::WEIGHT),
            )
            // one row per (cargo, vessel, location)
            .group_by([
                col(attribution::CARGO_ID),
                col(transaction::FISH_ID),
                col(fish::ENTITY_NAME),
                col(dwell::VESSEL_NAME),
                col(dwell::LOCATION_NAME),
            ])
            .agg([
                col(transaction::QTY_TONS).first(),
                col(dwell::DWELL).sum(),
                col(prepared::TONNAGE).first(),
                col(attribution::WEIGHT).sum(),
            ])
            .with_column(
                col(attribution::WEIGHT)
                    .sum()
                    .over(unit_keys.clone())
                    .alias(attribution::TOTAL_WEIGHT),
            )
            .filter(col(attribution::TOTAL_WEIGHT).gt(lit(0.0)))
            .with_column(
                (col(transaction::QTY_TONS) * col(attribution::WEIGHT)
                    / col(attribution::TOTAL_WEIGHT))
                .alias(attribution::ESTIMATED_TONS),
            )
            .with_column(
                (lit(100.0) * col(attribution::ESTIMATED_TONS)
                    / col(attribution::ESTIMATED_TONS)
                        .sum()
                        .over([col(attribution::CARGO_ID)]))
                .alias(attribution::SHARE_PERCENT),
            )
            .collect()?;

        let rows = self.collect_rows(&out)?;
        self.log_skipped(cargos, &rows)?;
        Ok(rows)
    }

    fn collect_rows(&self, out: &DataFrame) -> Result<Vec<CatchAttribution>, CatchNetError> {
        let cargo_ids = string_values(out, attribution::CARGO_ID)?;
        let species = string_values(out, fish::ENTITY_NAME)?;
        let vessels = string_values(out, dwell::VESSEL_NAME)?;
        let locations = string_values(out, dwell::LOCATION_NAME)?;
        let dwells = float_values(out, dwell::DWELL)?;
        let tonnages = float_values(out, prepared::TONNAGE)?;
        let estimates = float_values(out, attribution::ESTIMATED_TONS)?;
        let shares = float_values(out, attribution::SHARE_PERCENT)?;

        let mut rows = Vec::with_capacity(out.height());
        for i in 0..out.height() {
            let (Some(cargo_id), Some(fish_name), Some(vessel_name), Some(location_name)) = (
                cargo_ids[i].clone(),
                species[i].clone(),
                vessels[i].clone(),
                locations[i].clone(),
            ) else {
                continue;
            };
            let is_prohibited = self.prohibited.contains(&fish_name);
            rows.push(CatchAttribution {
                cargo_id,
                vessel_name,
                fish_name,
                location_name,
                dwell: finite_opt(dwells[i]),
                tonnage: finite_opt(tonnages[i]),
                estimated_tons: estimates[i].unwrap_or(0.0),
                share_percent: shares[i].unwrap_or(0.0),
                is_prohibited,
            });
        }

        rows.sort_by(|a, b| {
            a.cargo_id
                .cmp(&b.cargo_id)
                .then_with(|| {
                    b.estimated_tons
                        .partial_cmp(&a.estimated_tons)
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| a.vessel_name.cmp(&b.vessel_name))
                .then_with(|| a.location_name.cmp(&b.location_name))
        });
        Ok(rows)
    }

    fn log_skipped(
        &self,
        cargos: &DataFrame,
        rows: &[CatchAttribution],
    ) -> Result<(), CatchNetError> {
        let attributed: BTreeSet<&str> = rows.iter().map(|r| r.cargo_id.as_str()).collect();
        let ids = string_values(cargos, attribution::CARGO_ID)?;
        let species = string_values(cargos, fish::ENTITY_NAME)?;

        for (id, name) in ids.iter().zip(&species) {
            let Some(id) = id.as_deref() else { continue };
            if attributed.contains(id) {
                continue;
            }
            let reason = match name.as_deref() {
                None => "unknown species",
                Some(n) if !self.habitat.contains(n) => "no mapped habitat",
                Some(_) => "no weighted dwell candidates",
            };
            tracing::debug!(cargo_id = id, species = ?name, reason, "cargo skipped");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn habitat() -> HabitatIndex {
        let rows = df!(
            "entity_name" => &["Tuna", "Tuna", "Sockfish/Pisces foetida", "Cod"],
            "location_id" => &["X", "Y", "X", "Q"]
        )
        .unwrap();
        HabitatIndex::build(&rows).unwrap()
    }

    fn cargo(ids: &[&str], species: &[&str], qty: &[f64]) -> DataFrame {
        let fish_ids: Vec<String> = (0..ids.len()).map(|i| format!("f{i}")).collect();
        df!(
            "cargo_id" => ids,
            "fish_id" => &fish_ids,
            "entity_name" => species,
            "qty_tons" => qty
        )
        .unwrap()
    }

    fn visits(
        vessels: &[&str],
        locations: &[&str],
        dwell: &[f64],
        tonnage: &[Option<f64>],
    ) -> DataFrame {
        df!(
            "vessel_name" => vessels,
            "location_name" => locations,
            "dwell" => dwell,
            "tonnage" => tonnage
        )
        .unwrap()
    }

    fn engine_rows(cargos: &DataFrame, events: &DataFrame) -> Vec<CatchAttribution> {
        let habitat = habitat();
        let prohibited = ProhibitedSpecies::default();
        AttributionEngine::new(&habitat, &prohibited)
            .attribute(cargos, events)
            .unwrap()
    }

    #[test]
    fn heavier_longer_vessel_gets_larger_share() {
        let rows = engine_rows(
            &cargo(&["C1"], &["Tuna"], &[30.0]),
            &visits(&["A", "B"], &["X", "X"], &[3600.0, 1800.0], &[Some(100.0), Some(50.0)]),
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].vessel_name, "A");
        assert!((rows[0].estimated_tons - 24.0).abs() < 1e-9);
        assert!((rows[0].share_percent - 80.0).abs() < 1e-9);
        assert_eq!(rows[1].vessel_name, "B");
        assert!((rows[1].estimated_tons - 6.0).abs() < 1e-9);
        assert!((rows[1].share_percent - 20.0).abs() < 1e-9);
        assert!(!rows[0].is_prohibited);
    }

    #[test]
    fn species_without_habitat_is_skipped_without_touching_others() {
        let rows = engine_rows(
            &cargo(&["C1", "C2"], &["Tuna", "Salmon"], &[30.0, 12.0]),
            &visits(&["A"], &["X"], &[60.0], &[Some(10.0)]),
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cargo_id, "C1");
        assert!((rows[0].estimated_tons - 30.0).abs() < 1e-9);
    }

    #[test]
    fn zero_weight_cargo_is_skipped() {
        let rows = engine_rows(
            &cargo(&["C1"], &["Tuna"], &[30.0]),
            &visits(&["A", "B"], &["X", "Y"], &[0.0, 500.0], &[Some(100.0), Some(0.0)]),
        );
        assert!(rows.is_empty());
    }

    #[test]
    fn non_positive_quantity_is_skipped() {
        let rows = engine_rows(
            &cargo(&["C0", "C1", "C2"], &["Tuna", "Tuna", "Tuna"], &[0.0, -5.0, 12.0]),
            &visits(&["A", "B"], &["X", "Y"], &[100.0, 300.0], &[Some(2.0), Some(1.0)]),
        );
        assert!(rows.iter().all(|r| r.cargo_id == "C2"));
        assert_eq!(rows.len(), 2);
        let tons: f64 = rows.iter().map(|r| r.estimated_tons).sum();
        assert!((tons - 12.0).abs() < 1e-9);
        assert!(rows
            .iter()
            .all(|r| r.estimated_tons >= 0.0 && r.share_percent >= 0.0));
    }

    #[test]
    fn unregistered_vessels_weigh_nothing() {
        let rows = engine_rows(
            &cargo(&["C1"], &["Tuna"], &[10.0]),
            &visits(&["A", "Ghost"], &["X", "X"], &[100.0, 100.0], &[Some(5.0), None]),
        );
        assert_eq!(rows.len(), 2);
        assert!((rows[0].estimated_tons - 10.0).abs() < 1e-9);
        assert_eq!(rows[1].vessel_name, "Ghost");
        assert_eq!(rows[1].tonnage, None);
        assert_eq!(rows[1].estimated_tons, 0.0);
    }

    #[test]
    fn no_candidates_in_habitat_is_skipped() {
        let rows = engine_rows(
            &cargo(&["C1"], &["Cod"], &[3.0]),
            &visits(&["A"], &["X"], &[100.0], &[Some(5.0)]),
        );
        assert!(rows.is_empty());
    }

    #[test]
    fn repeated_visits_collapse_to_one_row() {
        let rows = engine_rows(
            &cargo(&["C1"], &["Tuna"], &[9.0]),
            &visits(
                &["A", "A", "B"],
                &["X", "X", "Y"],
                &[100.0, 100.0, 100.0],
                &[Some(1.0), Some(1.0), Some(1.0)],
            ),
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].vessel_name, "A");
        assert_eq!(rows[0].dwell, Some(200.0));
        assert!((rows[0].estimated_tons - 6.0).abs() < 1e-9);
        assert!((rows[1].estimated_tons - 3.0).abs() < 1e-9);
    }

    #[test]
    fn prohibited_species_are_flagged() {
        let rows = engine_rows(
            &cargo(&["C9"], &["Sockfish/Pisces foetida"], &[4.0]),
            &visits(&["A"], &["X"], &[10.0], &[Some(1.0)]),
        );
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_prohibited);
    }

    #[test]
    fn injected_prohibited_set_replaces_default() {
        let habitat = habitat();
        let prohibited = ProhibitedSpecies::new(["Tuna"]);
        let rows = AttributionEngine::new(&habitat, &prohibited)
            .attribute(
                &cargo(&["C1"], &["Tuna"], &[1.0]),
                &visits(&["A"], &["X"], &[10.0], &[Some(1.0)]),
            )
            .unwrap();
        assert!(rows[0].is_prohibited);
    }

    #[test]
    fn shares_sum_to_one_hundred_per_cargo() {
        let rows = engine_rows(
            &cargo(&["C1", "C2"], &["Tuna", "Sockfish/Pisces foetida"], &[7.0, 11.0]),
            &visits(
                &["A", "B", "C"],
                &["X", "Y", "X"],
                &[10.0, 20.0, 30.0],
                &[Some(3.0), Some(2.0), Some(1.0)],
            ),
        );
        for (cargo_id, qty) in [("C1", 7.0), ("C2", 11.0)] {
            let share: f64 = rows
                .iter()
                .filter(|r| r.cargo_id == cargo_id)
                .map(|r| r.share_percent)
                .sum();
            let tons: f64 = rows
                .iter()
                .filter(|r| r.cargo_id == cargo_id)
                .map(|r| r.estimated_tons)
                .sum();
            assert!((share - 100.0).abs() < 1e-6);
            assert!((tons - qty).abs() < 1e-6);
        }
    }

    #[test]
    fn missing_tonnage_column_is_reported() {
        let events = df!(
            "vessel_name" => &["A"],
            "location_name" => &["X"],
            "dwell" => &[1.0]
        )
        .unwrap();
        let habitat = habitat();
        let prohibited = ProhibitedSpecies::default();
        let result = AttributionEngine::new(&habitat, &prohibited)
            .attribute(&cargo(&["C1"], &["Tuna"], &[1.0]), &events);
        assert!(matches!(result, Err(CatchNetError::MissingColumn { .. })));
    }
}
