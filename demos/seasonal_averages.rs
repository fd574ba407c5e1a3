use ghcn_climate::{Ghcn, GhcnError, Season, YearRange};
use std::env;

#[tokio::main]
async fn main() -> Result<(), GhcnError> {
    env_logger::init();
    let mut args = env::args().skip(1);
    let station = args.next().unwrap_or_else(|| "GME00115771".to_string());
    let years = YearRange::parse(args.next().as_deref(), args.next().as_deref())?;

    let client = Ghcn::new().await?;
    let aggregate = client
        .station_aggregate()
        .station(&station)
        .years(years)
        .call()
        .await?;

    println!("{} ({})", aggregate.station_name, aggregate.station_id);
    for (year, summary) in &aggregate.years {
        println!(
            "{year}: TMAX {:?} TMIN {:?}",
            summary.avg_tmax, summary.avg_tmin
        );
        for season in Season::ALL {
            if let Some(averages) = summary.season(season) {
                println!(
                    "    {season:<6} TMAX {:?} TMIN {:?}",
                    averages.avg_tmax, averages.avg_tmin
                );
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&aggregate).unwrap());
    Ok(())
}
