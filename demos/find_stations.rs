use ghcn_climate::{Ghcn, GhcnError, LatLon, YearRange};

#[tokio::main]
async fn main() -> Result<(), GhcnError> {
    env_logger::init();
    let client = Ghcn::new().await?;

    // Stuttgart city centre
    let location = LatLon(48.7758, 9.1829);

    let nearby = client
        .find_stations()
        .location(location)
        .max_distance_km(30.0)
        .call()
        .await?;
    println!("Stations within 30 km:");
    for result in &nearby {
        println!("{:>8.2} km  {}  {}", result.distance, result.station.id, result.station.name);
    }

    let covered = client
        .find_stations()
        .location(location)
        .max_distance_km(100.0)
        .station_limit(3)
        .coverage(YearRange::new(2000, 2020)?)
        .call()
        .await?;
    println!("\nStations within 100 km with TMAX/TMIN in 2000 and 2020:");
    for result in &covered {
        println!("{:>8.2} km  {}  {}", result.distance, result.station.id, result.station.name);
    }

    Ok(())
}
