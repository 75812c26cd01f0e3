//! Property tests: attributed tonnage is conserved per cargo.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use polars::prelude::*;
use proptest::prelude::*;

use catchnet::{AnalysisConfig, CatchNetModel, Tables};

const PORT: &str = "City of Haacklee";
const VESSELS: [&str; 4] = ["A", "B", "C", "D"];
const LOCATIONS: [&str; 3] = ["X", "Y", "Z"];

fn build_model(
    visits: &[(usize, usize, f64)],
    tonnages: &[f64],
    cargos: &[(usize, f64)],
) -> CatchNetModel {
    let n = visits.len();
    let dwell_events = df!(
        "vessel_name" => visits.iter().map(|v| VESSELS[v.0]).collect::<Vec<_>>(),
        "location_name" => visits.iter().map(|v| LOCATIONS[v.1]).collect::<Vec<_>>(),
        "kind" => vec!["Fishing Ground"; n],
        "arrival_time" => vec!["2035-09-15 06:00:00"; n],
        "dwell" => visits.iter().map(|v| v.2).collect::<Vec<_>>(),
        "arrival_port" => vec![PORT; n]
    )
    .unwrap();
    let vessels = df!(
        "vessel_id" => VESSELS.to_vec(),
        "tonnage" => tonnages.to_vec()
    )
    .unwrap();
    let transactions = df!(
        "source" => cargos.iter().enumerate().map(|(i, _)| format!("cargo-{i}")).collect::<Vec<_>>(),
        "fish_id" => cargos.iter().map(|c| c.0 as i64).collect::<Vec<_>>(),
        "qty_tons" => cargos.iter().map(|c| c.1).collect::<Vec<_>>(),
        "target_harbor" => vec![PORT; cargos.len()],
        "date" => vec!["2035-09-16"; cargos.len()]
    )
    .unwrap();
    let fish = df!(
        "id" => &[0i64, 1, 2],
        "entity_name" => &["Tuna", "Cod", "Sockfish/Pisces foetida"]
    )
    .unwrap();
    let fish_locations = df!(
        "entity_name" => &["Tuna", "Tuna", "Cod", "Sockfish/Pisces foetida"],
        "location_id" => &["X", "Y", "Y", "Z"]
    )
    .unwrap();
    let tables = Tables::new(dwell_events, vessels, transactions, fish, fish_locations);
    CatchNetModel::new(tables, AnalysisConfig::default()).unwrap()
}

fn visit() -> impl Strategy<Value = (usize, usize, f64)> {
    (0..VESSELS.len(), 0..LOCATIONS.len(), 1.0f64..50_000.0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn estimates_sum_to_cargo_quantity(
        visits in prop::collection::vec(visit(), 1..12),
        tonnages in prop::collection::vec(1.0f64..2_000.0, VESSELS.len()),
        cargos in prop::collection::vec((0usize..3, 0.5f64..500.0), 1..5),
    ) {
        let model = build_model(&visits, &tonnages, &cargos);
        let date = NaiveDate::from_ymd_opt(2035, 9, 16).unwrap();
        let result = model.vessel_catch(PORT, date).unwrap();

        let mut tons: BTreeMap<&str, f64> = BTreeMap::new();
        let mut shares: BTreeMap<&str, f64> = BTreeMap::new();
        for row in &result.rows {
            prop_assert!(row.estimated_tons.is_finite() && row.estimated_tons >= 0.0);
            prop_assert!(row.share_percent >= 0.0 && row.share_percent <= 100.0 + 1e-9);
            *tons.entry(row.cargo_id.as_str()).or_default() += row.estimated_tons;
            *shares.entry(row.cargo_id.as_str()).or_default() += row.share_percent;
        }

        for (i, (_, qty)) in cargos.iter().enumerate() {
            let id = format!("cargo-{i}");
            if let Some(total) = tons.get(id.as_str()) {
                prop_assert!((total - qty).abs() < 1e-6 * qty.max(1.0));
                prop_assert!((shares[id.as_str()] - 100.0).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn every_candidate_appears_once_per_cargo_and_location(
        visits in prop::collection::vec(visit(), 1..12),
        tonnages in prop::collection::vec(1.0f64..2_000.0, VESSELS.len()),
    ) {
        let model = build_model(&visits, &tonnages, &[(0, 10.0)]);
        let date = NaiveDate::from_ymd_opt(2035, 9, 16).unwrap();
        let result = model.vessel_catch(PORT, date).unwrap();

        let mut seen = std::collections::BTreeSet::new();
        for row in &result.rows {
            prop_assert!(LOCATIONS[..2].contains(&row.location_name.as_str()));
            prop_assert!(seen.insert((row.vessel_name.clone(), row.location_name.clone())));
        }
        let tuna_visits = visits.iter().any(|v| v.1 < 2);
        prop_assert_eq!(result.rows.is_empty(), !tuna_visits);
    }
}
