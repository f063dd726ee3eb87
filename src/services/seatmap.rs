use crate::{
    error::{Error, Result},
    models::{showroom::MAX_CAPACITY, NewSeat, SeatZone, Show, Showroom},
};

/// Spreadsheet-style row name: 1 -> A, 26 -> Z, 27 -> AA.
pub fn row_letters(row: i32) -> String {
    let mut n = row.max(1) as u32;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

pub fn seat_label(row: i32, column: i32) -> String {
    format!("{}{}", row_letters(row), column)
}

/// Definition-time check: zones are well formed, pairwise disjoint and cover
/// exactly `capacity` cells.
pub fn validate_template(capacity: i32, zones: &[SeatZone]) -> Result<()> {
    if zones.is_empty() {
        return Err(Error::TemplateMismatch("template has no zones".to_string()));
    }
    for (i, zone) in zones.iter().enumerate() {
        if !zone.is_well_formed() {
            return Err(Error::TemplateMismatch(format!(
                "zone {} has an empty or non 1-based range",
                i
            )));
        }
        if let Some(j) = zones[..i].iter().position(|other| other.overlaps(zone)) {
            return Err(Error::TemplateMismatch(format!("zones {} and {} overlap", j, i)));
        }
    }
    check_capacity(capacity, zones)
}

fn check_capacity(capacity: i32, zones: &[SeatZone]) -> Result<()> {
    if capacity > MAX_CAPACITY {
        return Err(Error::TemplateMismatch(format!(
            "capacity {} exceeds the limit of {} seats",
            capacity, MAX_CAPACITY
        )));
    }
    let cells = zones
        .iter()
        .fold(0i64, |cells, zone| cells.saturating_add(zone.cell_count()));
    if cells != i64::from(capacity) {
        return Err(Error::TemplateMismatch(format!(
            "template covers {} seats but capacity is {}",
            cells, capacity
        )));
    }
    Ok(())
}

/// Materialises one available seat per template cell for `show`, in zone
/// order and row-major within a zone.
pub fn generate_seats(show: &Show, showroom: &Showroom) -> Result<Vec<NewSeat>> {
    check_capacity(showroom.capacity, &showroom.zones)?;

    let mut seats = Vec::with_capacity(showroom.capacity.max(0) as usize);
    for zone in &showroom.zones {
        for row in zone.rows() {
            for column in zone.columns() {
                seats.push(NewSeat {
                    show_id: show.id,
                    row,
                    column,
                    label: seat_label(row, column),
                    seat_type: zone.seat_type,
                });
            }
        }
    }
    Ok(seats)
}
