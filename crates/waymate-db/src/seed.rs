use rusqlite::Connection;
use tracing::info;

use crate::StoreError;

/// Reference transit catalog, seeded once at migration time. The backend
/// treats this table as read-only; an operator can replace it with a real
/// GTFS import without touching any code that joins against it.
///
/// Columns: id, short_name, long_name, route_type, color, text_color.
const CATALOG: &[(&str, &str, &str, &str, &str, &str)] = &[
    // Train lines
    ("01", "LW", "Lakeshore West", "train", "96092B", "FFFFFF"),
    ("09", "LE", "Lakeshore East", "train", "E8340C", "FFFFFF"),
    ("21", "MI", "Milton", "train", "F46F1A", "FFFFFF"),
    ("31", "KI", "Kitchener", "train", "00853F", "FFFFFF"),
    ("61", "RH", "Richmond Hill", "train", "00A6E4", "FFFFFF"),
    ("65", "BR", "Barrie", "train", "0079C2", "FFFFFF"),
    ("71", "ST", "Stouffville", "train", "794500", "FFFFFF"),
    // Bus routes
    ("16", "16", "Hamilton / Toronto Express", "bus", "00854A", "FFFFFF"),
    ("19", "19", "Mississauga / North York", "bus", "00854A", "FFFFFF"),
    ("25", "25", "Waterloo / Mississauga", "bus", "00854A", "FFFFFF"),
    ("27", "27", "Milton / North York", "bus", "00854A", "FFFFFF"),
    ("40", "40", "Hamilton / Richmond Hill", "bus", "00854A", "FFFFFF"),
    ("45", "45", "Mississauga / North York Express", "bus", "00854A", "FFFFFF"),
    ("47", "47", "Hamilton / York University", "bus", "00854A", "FFFFFF"),
    ("96", "96", "Oshawa / Finch Express", "bus", "00854A", "FFFFFF"),
];

pub fn run(conn: &Connection) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO routes (id, short_name, long_name, route_type, color, text_color)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;

    let mut inserted = 0usize;
    for (id, short_name, long_name, route_type, color, text_color) in CATALOG {
        inserted += stmt.execute((id, short_name, long_name, route_type, color, text_color))?;
    }

    if inserted > 0 {
        info!("Seeded {} catalog routes", inserted);
    }
    Ok(())
}
