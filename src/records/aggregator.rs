use crate::records::parser::{parse_line, DailyRecordLine};
use crate::types::element::Element;
use crate::types::query::YearRange;
use crate::types::season::Season;
use crate::utils::round_to;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How records around the edges of the year window are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RangePolicy {
    /// Records from calendar years outside the window are ignored entirely. A December
    /// of the last year still counts toward that year, but not toward the winter of
    /// the following year.
    #[default]
    CalendarYear,
    /// Yearly sums need the calendar year in the window, seasonal sums need the season
    /// year in the window. The December before the window feeds its first winter.
    SeasonYear,
}

/// Running sum and count of valid observations for one element.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ElementSums {
    pub sum: f64,
    pub count: u32,
}

impl ElementSums {
    fn add(&mut self, values: &[f64]) {
        self.sum += values.iter().sum::<f64>();
        self.count += values.len() as u32;
    }

    /// The mean rounded to one decimal, or `None` without observations.
    pub fn average(&self) -> Option<f64> {
        (self.count > 0).then(|| round_to(self.sum / f64::from(self.count), 1))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TemperatureSums {
    pub tmax: ElementSums,
    pub tmin: ElementSums,
}

impl TemperatureSums {
    pub fn get(&self, element: Element) -> &ElementSums {
        match element {
            Element::Tmax => &self.tmax,
            Element::Tmin => &self.tmin,
        }
    }

    fn get_mut(&mut self, element: Element) -> &mut ElementSums {
        match element {
            Element::Tmax => &mut self.tmax,
            Element::Tmin => &mut self.tmin,
        }
    }
}

/// Sums for one calendar year, plus the seasons filed under it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YearAccumulator {
    pub totals: TemperatureSums,
    pub seasons: BTreeMap<Season, TemperatureSums>,
}

pub type Accumulators = BTreeMap<i32, YearAccumulator>;

/// Folds one record into `accumulators`.
///
/// Returns the number of valid values taken from the record, which is 0 when the
/// record falls outside the window or holds only missing values. Accumulators are
/// only created for records that contribute at least one value.
pub fn accumulate(
    accumulators: &mut Accumulators,
    record: &DailyRecordLine<'_>,
    range: YearRange,
    policy: RangePolicy,
) -> usize {
    let season = Season::of_month(record.month);
    let season_year = Season::season_year(record.year, record.month);

    let (count_year, count_season) = match policy {
        RangePolicy::CalendarYear => {
            if !range.contains(record.year) {
                return 0;
            }
            (true, !(season == Season::Winter && season_year > range.end()))
        }
        RangePolicy::SeasonYear => (range.contains(record.year), range.contains(season_year)),
    };
    if !count_year && !count_season {
        return 0;
    }

    let values: Vec<f64> = record.present_values().collect();
    if values.is_empty() {
        return 0;
    }
    if count_year {
        accumulators
            .entry(record.year)
            .or_default()
            .totals
            .get_mut(record.element)
            .add(&values);
    }
    if count_season {
        accumulators
            .entry(season_year)
            .or_default()
            .seasons
            .entry(season)
            .or_default()
            .get_mut(record.element)
            .add(&values);
    }
    values.len()
}

/// Aggregation state for one (station, year window) request.
#[derive(Debug, Clone)]
pub struct SeasonalAggregator {
    range: YearRange,
    policy: RangePolicy,
    accumulators: Accumulators,
    observed_lines: usize,
}

impl SeasonalAggregator {
    pub fn new(range: YearRange, policy: RangePolicy) -> Self {
        Self {
            range,
            policy,
            accumulators: Accumulators::new(),
            observed_lines: 0,
        }
    }

    pub fn push(&mut self, record: &DailyRecordLine<'_>) {
        if accumulate(&mut self.accumulators, record, self.range, self.policy) > 0 {
            self.observed_lines += 1;
        }
    }

    /// Number of temperature lines inside the window that held at least one valid value.
    pub fn observed_lines(&self) -> usize {
        self.observed_lines
    }

    pub fn accumulators(&self) -> &Accumulators {
        &self.accumulators
    }

    pub fn into_accumulators(self) -> Accumulators {
        self.accumulators
    }
}

/// Streams every line of a station's `.dly` text through a [`SeasonalAggregator`].
///
/// Lines belonging to a different station id are ignored.
pub fn aggregate_station(
    text: &str,
    station_id: &str,
    range: YearRange,
    policy: RangePolicy,
) -> SeasonalAggregator {
    let mut aggregator = SeasonalAggregator::new(range, policy);
    for record in text.lines().filter_map(parse_line) {
        if record.station_id == station_id {
            aggregator.push(&record);
        }
    }
    aggregator
}
