use actix_web::web;
use tracing::info;
use tracing_subscriber::EnvFilter;

use slot_occupancy::assignment::{AssignmentEngine, FallbackOccupancyGenerator, Period};
use slot_occupancy::config::AppConfig;
use slot_occupancy::directory::Directory;
use slot_occupancy::display::{print_section_occupancy, write_occupancy_to_file};
use slot_occupancy::parser::{load_slots, load_units, parse_period};
use slot_occupancy::source::{seed_section, CsvOccupancySource};
use slot_occupancy::web::{start_server, AppState};

fn enable_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    enable_tracing();

    let config = AppConfig::load()?;
    let capacity = config.capacity_model()?;

    let slots = load_slots(&config.slots_csv)?;
    let units = load_units(&config.units_csv)?;
    let directory = Directory::new(slots, units);
    info!(
        slots = directory.slot_count(),
        units = directory.unit_count(),
        "Loaded master data"
    );

    let engine = AssignmentEngine::new(capacity);
    let generator = FallbackOccupancyGenerator::new(capacity);
    let source = CsvOccupancySource::new(&config.occupancy_csv);

    // Check if we should run in web mode
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 && args[1] == "web" {
        let port = args
            .get(2)
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(config.port);

        info!(port, "Starting web server");
        let state = web::Data::new(AppState {
            engine,
            directory,
            source: Box::new(source),
            generator,
            seed_policy: config.seed_policy(),
        });
        start_server(port, state).await?;
        return Ok(());
    }

    // Report mode: `slot-occupancy [DATE SHIFT]`, housing period when omitted
    let period = match (args.get(1), args.get(2)) {
        (Some(date), Some(shift)) => parse_period(date, shift, 0)?,
        _ => Period::Indefinite,
    };

    println!("=== Occupancy report for {} ===", period);
    let sections: Vec<String> = directory.sections().into_iter().map(String::from).collect();
    for section in &sections {
        let report = seed_section(
            &engine,
            &directory,
            &source,
            &generator,
            config.seed_policy(),
            section,
            &period,
        )?;
        print_section_occupancy(&directory, section, &report.snapshots);

        let filename = format!("occupancy_{}.txt", section.to_lowercase().replace(' ', "_"));
        write_occupancy_to_file(&directory, section, &report.snapshots, &filename)?;
        println!("Saved to {}", filename);
    }

    Ok(())
}
