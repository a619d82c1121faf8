use crate::process::raw_table::Cell;

/// Parse a count; anything unparsable, negative or non-finite is 0.
pub fn coerce_numeric(raw: &str) -> f64 {
    non_negative(raw.trim().parse::<f64>().unwrap_or(0.0))
}

/// Count coercion for a cell. Missing counts read as 0.
pub fn coerce_count(cell: &Cell) -> f64 {
    match cell {
        Cell::Number(n) => non_negative(*n),
        Cell::Text(s) => coerce_numeric(s),
        Cell::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Cell::Empty | Cell::Date(_) => 0.0,
    }
}

fn non_negative(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        0.0
    }
}

/// Four-digit year from a cell, `None` when it is not one.
pub fn coerce_year(cell: &Cell) -> Option<i32> {
    let value = match cell {
        Cell::Number(n) => *n,
        Cell::Text(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if value.fract() != 0.0 || !(1000.0..=9999.0).contains(&value) {
        return None;
    }
    Some(value as i32)
}
