//! CSV export of tournament standings.

use serde::Serialize;

/// One line of the results sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandingRow {
    pub finish_place: Option<u32>,
    pub email: String,
    pub checked_in: bool,
    pub seat_number: Option<u32>,
    pub table_number: Option<u32>,
}

/// Render standings as CSV
///
/// Rows are ordered by finish place; players without a place come last in
/// their input order. Missing values are left empty.
pub fn results_csv(rows: &[StandingRow]) -> Result<String, csv::Error> {
    let mut ordered: Vec<&StandingRow> = rows.iter().collect();
    // Stable sort keeps unplaced rows in input order
    ordered.sort_by_key(|row| (row.finish_place.is_none(), row.finish_place));

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Place", "Email", "Checked-In", "Seat", "Table"])?;

    for row in ordered {
        writer.write_record([
            optional(row.finish_place),
            row.email.clone(),
            if row.checked_in { "Yes" } else { "No" }.to_string(),
            optional(row.seat_number),
            optional(row.table_number),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn optional(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
