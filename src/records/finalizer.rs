use crate::records::aggregator::{Accumulators, TemperatureSums};
use crate::types::aggregate::{TemperatureAverages, YearSummary};
use std::collections::BTreeMap;

/// Turns running sums into rounded averages.
///
/// Seasons without any observation are dropped, and so are years left without a
/// season, even when they carry yearly sums.
pub fn finalize(accumulators: Accumulators) -> BTreeMap<i32, YearSummary> {
    accumulators
        .into_iter()
        .filter_map(|(year, accumulator)| {
            let seasons: BTreeMap<_, _> = accumulator
                .seasons
                .iter()
                .map(|(&season, sums)| (season, averages(sums)))
                .filter(|(_, averages)| !averages.is_empty())
                .collect();
            if seasons.is_empty() {
                return None;
            }
            let totals = averages(&accumulator.totals);
            Some((
                year,
                YearSummary {
                    avg_tmax: totals.avg_tmax,
                    avg_tmin: totals.avg_tmin,
                    seasons,
                },
            ))
        })
        .collect()
}

fn averages(sums: &TemperatureSums) -> TemperatureAverages {
    TemperatureAverages {
        avg_tmax: sums.tmax.average(),
        avg_tmin: sums.tmin.average(),
    }
}
