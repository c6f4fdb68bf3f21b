//! Station directory glue: display-name lookup with duplicate-name
//! disambiguation.

use std::collections::HashMap;

use crate::aggregator::types::Station;

/// Maps station ids to display names. Canonical names are used as-is;
/// when two or more stations share one, each gets its route list appended
/// (e.g. "Canal St (A/C/E)") so the displayed names stay distinct.
pub fn display_names(stations: &[Station]) -> HashMap<String, String> {
    let mut name_counts: HashMap<&str, usize> = HashMap::new();
    for station in stations {
        *name_counts.entry(station.name.as_str()).or_default() += 1;
    }

    stations
        .iter()
        .map(|station| {
            let name = if name_counts[station.name.as_str()] > 1 && !station.routes.is_empty() {
                format!("{} ({})", station.name, station.routes.join("/"))
            } else {
                station.name.clone()
            };
            (station.id.clone(), name)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(id: &str, name: &str, routes: &[&str]) -> Station {
        Station {
            id: id.into(),
            name: name.into(),
            borough: None,
            latitude: None,
            longitude: None,
            routes: routes.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn unique_names_pass_through() {
        let names = display_names(&[
            station("611", "Times Sq-42 St", &["N", "Q", "R"]),
            station("167", "Grand Central-42 St", &["4", "5", "6"]),
        ]);
        assert_eq!(names["611"], "Times Sq-42 St");
        assert_eq!(names["167"], "Grand Central-42 St");
    }

    #[test]
    fn colliding_names_get_route_suffixes() {
        let names = display_names(&[
            station("169", "Canal St", &["A", "C", "E"]),
            station("623", "Canal St", &["N", "Q", "R", "W"]),
        ]);
        assert_eq!(names["169"], "Canal St (A/C/E)");
        assert_eq!(names["623"], "Canal St (N/Q/R/W)");
    }

    #[test]
    fn collision_without_routes_keeps_canonical_name() {
        let names = display_names(&[
            station("1", "Canal St", &[]),
            station("2", "Canal St", &["J", "Z"]),
        ]);
        assert_eq!(names["1"], "Canal St");
        assert_eq!(names["2"], "Canal St (J/Z)");
    }
}
