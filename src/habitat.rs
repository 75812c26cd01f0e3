use std::collections::{HashMap, HashSet};

use polars::prelude::*;

use crate::error::CatchNetError;
use crate::frame::{require_columns, string_values};
use crate::schema::{dwell, fish};

/// Species name → habitat locations.
///
/// Built once from the `fish_locations` table. Duplicate (species, location)
/// pairs collapse; locations keep first-seen order.
#[derive(Debug, Clone, Default)]
pub struct HabitatIndex {
    locations: HashMap<String, Vec<String>>,
}

impl HabitatIndex {
    /// Required columns: entity_name, location_id. Rows with a null on either
    /// side carry no mapping and are ignored.
    pub fn build(habitat_rows: &DataFrame) -> Result<Self, CatchNetError> {
        require_columns(
            habitat_rows,
            fish::LOCATIONS_TABLE,
            &[fish::ENTITY_NAME, fish::LOCATION_ID],
        )?;
        let species = string_values(habitat_rows, fish::ENTITY_NAME)?;
        let locations = string_values(habitat_rows, fish::LOCATION_ID)?;

        let mut index: HashMap<String, Vec<String>> = HashMap::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();
        for (name, location) in species.into_iter().zip(locations) {
            let (Some(name), Some(location)) = (name, location) else {
                continue;
            };
            if !seen.insert((name.clone(), location.clone())) {
                continue;
            }
            index.entry(name).or_default().push(location);
        }

        tracing::debug!(species = index.len(), "habitat index built");
        Ok(Self { locations: index })
    }

    /// Habitat locations of a species; empty when the species is unmapped.
    pub fn locations(&self, species: &str) -> &[String] {
        self.locations
            .get(species)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, species: &str) -> bool {
        !self.locations(species).is_empty()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Long-form (entity_name, location_name) frame used as a join bridge
    /// between cargos and dwell events.
    pub fn to_frame(&self) -> Result<DataFrame, CatchNetError> {
        let mut names: Vec<&str> = Vec::new();
        let mut locations: Vec<&str> = Vec::new();
        for (name, locs) in &self.locations {
            for loc in locs {
                names.push(name);
                locations.push(loc);
            }
        }
        let df = DataFrame::new(vec![
            Column::new(fish::ENTITY_NAME.into(), &names),
            Column::new(dwell::LOCATION_NAME.into(), &locations),
        ])?;
        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        df!(
            "entity_name" => &[Some("Tuna"), Some("Tuna"), Some("Cod"), Some("Tuna"), None],
            "location_id" => &[Some("X"), Some("Y"), Some("Z"), Some("X"), Some("W")]
        )
        .unwrap()
    }

    #[test]
    fn groups_locations_by_species() {
        let index = HabitatIndex::build(&sample()).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.locations("Tuna"), ["X", "Y"]);
        assert_eq!(index.locations("Cod"), ["Z"]);
    }

    #[test]
    fn wide_habitats_dedup_and_keep_first_seen_order() {
        let n = 5_000;
        let species = vec!["Tuna"; 2 * n];
        let locations: Vec<String> = (0..n).chain(0..n).map(|i| format!("L{i}")).collect();
        let rows = df!("entity_name" => species, "location_id" => locations).unwrap();
        let index = HabitatIndex::build(&rows).unwrap();
        let tuna = index.locations("Tuna");
        assert_eq!(tuna.len(), n);
        assert_eq!(tuna[0], "L0");
        assert_eq!(tuna[n - 1], format!("L{}", n - 1));
    }

    #[test]
    fn unknown_species_has_no_locations() {
        let index = HabitatIndex::build(&sample()).unwrap();
        assert!(index.locations("Salmon").is_empty());
        assert!(!index.contains("Salmon"));
    }

    #[test]
    fn empty_input_gives_empty_index() {
        let empty = df!(
            "entity_name" => Vec::<&str>::new(),
            "location_id" => Vec::<&str>::new()
        )
        .unwrap();
        let index = HabitatIndex::build(&empty).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.to_frame().unwrap().height(), 0);
    }

    #[test]
    fn missing_column_is_reported() {
        let bad = df!("entity_name" => &["Tuna"]).unwrap();
        match HabitatIndex::build(&bad) {
            Err(CatchNetError::MissingColumn { column, .. }) => assert_eq!(column, "location_id"),
            other => panic!("expected missing column, got {other:?}"),
        }
    }

    #[test]
    fn bridge_frame_has_one_row_per_pair() {
        let index = HabitatIndex::build(&sample()).unwrap();
        let frame = index.to_frame().unwrap();
        assert_eq!(frame.height(), 3);
        assert_eq!(frame.get_column_names_str(), ["entity_name", "location_name"]);
    }
}
