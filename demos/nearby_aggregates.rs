use ghcn_climate::{Ghcn, GhcnConfig, GhcnError, RangePolicy, SearchQuery, YearRange};

#[tokio::main]
async fn main() -> Result<(), GhcnError> {
    env_logger::init();
    let config = GhcnConfig::builder()
        .concurrency(8)
        .range_policy(RangePolicy::SeasonYear)
        .build();
    let client = Ghcn::with_config(config).await?;

    // Raw request parameters, the way an HTTP handler would receive them.
    let query = SearchQuery::parse("49.13", "9.35", Some("50"), Some("5"))?;
    let years = YearRange::parse(Some("2015"), Some("2020"))?;

    let stations: Vec<String> = client
        .search(&query, None)
        .await
        .into_iter()
        .map(|result| result.station.id)
        .collect();

    let prefetched = client.prefetch(&stations).await;
    for (station, result) in &prefetched {
        if let Err(e) = result {
            eprintln!("Could not download {station}: {e}");
        }
    }

    for (station, result) in client.station_aggregates(&stations, years).await {
        match result {
            Ok(aggregate) => {
                let latest = aggregate.years.last_key_value();
                println!(
                    "{station} {}: {} years, latest {:?}",
                    aggregate.station_name,
                    aggregate.years.len(),
                    latest.map(|(year, summary)| (year, summary.avg_tmax, summary.avg_tmin))
                );
            }
            Err(e) => println!("{station}: {e}"),
        }
    }
    Ok(())
}
