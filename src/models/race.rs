use serde::{Deserialize, Serialize};

/// A race distance we predict finish times for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRace {
  pub name: String,
  pub distance_miles: f64,
}

impl TargetRace {
  pub fn new(name: impl Into<String>, distance_miles: f64) -> Self {
    Self {
      name: name.into(),
      distance_miles,
    }
  }

  /// Canonical race catalog, shortest first
  pub fn catalog() -> Vec<TargetRace> {
    RACE_CATALOG
      .iter()
      .map(|(name, miles)| TargetRace::new(*name, *miles))
      .collect()
  }

  pub fn find(name: &str) -> Option<TargetRace> {
    RACE_CATALOG
      .iter()
      .find(|(n, _)| n.eq_ignore_ascii_case(name))
      .map(|(n, miles)| TargetRace::new(*n, *miles))
  }
}

const RACE_CATALOG: [(&str, f64); 8] = [
  ("Mile", 1.0),
  ("5K", 3.10686),
  ("10K", 6.21371),
  ("Half Marathon", 13.1094),
  ("Marathon", 26.2188),
  ("50K", 31.07),
  ("50 Mile", 50.0),
  ("100 Mile", 100.0),
];

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_catalog_is_ordered_by_distance() {
    let races = TargetRace::catalog();
    assert_eq!(races.len(), 8);
    assert!(races.windows(2).all(|w| w[0].distance_miles < w[1].distance_miles));
    assert_eq!(races[0].name, "Mile");
    assert_eq!(races[7].name, "100 Mile");
  }

  #[test]
  fn test_find_is_case_insensitive() {
    let race = TargetRace::find("half marathon").unwrap();
    assert_eq!(race.name, "Half Marathon");
    assert!(TargetRace::find("15K").is_none());
  }
}
