use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::assignment::{OccupancySnapshot, OccupancyStatus, UnitId};
use crate::directory::Directory;

/// Formats a unit for display, falling back to the raw id for units that
/// are not in the directory (e.g. generated occupants).
pub fn format_unit_name(directory: &Directory, unit_id: &UnitId) -> String {
    match directory.unit(unit_id) {
        Some(unit) => format!("{} ({})", unit.display_name, unit.id),
        None => unit_id.to_string(),
    }
}

fn status_label(status: OccupancyStatus) -> &'static str {
    match status {
        OccupancyStatus::Empty => "EMPTY",
        OccupancyStatus::Partial => "PARTIAL",
        OccupancyStatus::Full => "FULL",
    }
}

/// One line per slot: `A-1 [PARTIAL] 2/5: Officer Ray (s1), p7`
pub fn format_snapshot_line(directory: &Directory, snapshot: &OccupancySnapshot) -> String {
    let names: Vec<String> = snapshot
        .occupants
        .iter()
        .map(|u| format_unit_name(directory, u))
        .collect();
    let mut line = format!(
        "{} [{}] {}/{}",
        snapshot.slot_id,
        status_label(snapshot.status),
        snapshot.count,
        snapshot.capacity
    );
    if !names.is_empty() {
        line.push_str(": ");
        line.push_str(&names.join(", "));
    }
    line
}

fn header(section: &str, snapshots: &[OccupancySnapshot]) -> String {
    let period = snapshots
        .first()
        .map(|s| s.period.to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut header = format!("** {} ({}) **", section, period);
    if snapshots.iter().any(|s| s.synthetic) {
        header.push_str(" [SYNTHETIC - source unavailable]");
    }
    header
}

/// Writes a section's occupancy to a file, one slot per line
pub fn write_occupancy_to_file<P: AsRef<Path>>(
    directory: &Directory,
    section: &str,
    snapshots: &[OccupancySnapshot],
    filename: P,
) -> Result<(), std::io::Error> {
    let mut file = File::create(filename)?;
    writeln!(file, "{}", header(section, snapshots))?;
    for snapshot in snapshots {
        writeln!(file, "{}", format_snapshot_line(directory, snapshot))?;
    }
    Ok(())
}

/// Prints a section's occupancy in a readable format
pub fn print_section_occupancy(directory: &Directory, section: &str, snapshots: &[OccupancySnapshot]) {
    println!("\n=== {} ===", header(section, snapshots));
    let occupied: usize = snapshots.iter().map(|s| s.count).sum();
    let capacity: usize = snapshots.iter().map(|s| s.capacity).sum();
    println!("Occupancy: {}/{}", occupied, capacity);

    for snapshot in snapshots {
        println!("  {}", format_snapshot_line(directory, snapshot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::{AssignableUnit, Period, Slot, SlotId};

    fn directory() -> Directory {
        Directory::new(
            vec![Slot::new("A-1")],
            vec![AssignableUnit::new("s1", "Officer Ray")],
        )
    }

    #[test]
    fn test_snapshot_line() {
        let snapshot = OccupancySnapshot::new(
            SlotId::new("A-1"),
            Period::Indefinite,
            vec![UnitId::new("s1"), UnitId::new("p7")],
            5,
            false,
        );
        assert_eq!(
            format_snapshot_line(&directory(), &snapshot),
            "A-1 [PARTIAL] 2/5: Officer Ray (s1), p7"
        );
    }

    #[test]
    fn test_empty_line_has_no_names() {
        let snapshot =
            OccupancySnapshot::new(SlotId::new("A-1"), Period::Indefinite, vec![], 2, false);
        assert_eq!(format_snapshot_line(&directory(), &snapshot), "A-1 [EMPTY] 0/2");
    }

    #[test]
    fn test_report_flags_synthetic_data() {
        let snapshot = OccupancySnapshot::new(
            SlotId::new("A-1"),
            Period::Indefinite,
            vec![UnitId::new("synthetic:A-1:1")],
            2,
            true,
        );
        let path = std::env::temp_dir().join(format!(
            "slot-occupancy-report-{}.txt",
            std::process::id()
        ));
        write_occupancy_to_file(&directory(), "Block A", &[snapshot], &path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let mut lines = contents.lines();
        assert_eq!(
            lines.next(),
            Some("** Block A (indefinite) ** [SYNTHETIC - source unavailable]")
        );
        assert_eq!(lines.next(), Some("A-1 [PARTIAL] 1/2: synthetic:A-1:1"));
    }
}
