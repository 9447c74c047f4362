//! Month arithmetic for the due axis: month boundaries and the 35-cell
//! calendar grid the due-focus motions move across.

use chrono::{Datelike, NaiveDate};

/// Cells in the month grid: five rows of seven, Monday-based columns.
pub const GRID_CELLS: i64 = 35;

pub fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = (date.year(), date.month());
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next_month.and_then(|d| d.pred_opt()).unwrap_or(date)
}

pub fn days_in_month(date: NaiveDate) -> u32 {
    last_day_of_month(date).day()
}

/// Column of the month's first day (0 = Monday).
fn month_offset(date: NaiveDate) -> i64 {
    i64::from(first_day_of_month(date).weekday().num_days_from_monday())
}

/// Grid cell occupied by `date` within its own month.
pub fn grid_index(date: NaiveDate) -> i64 {
    i64::from(date.day0()) + month_offset(date)
}

/// The date at grid cell `index` in `anchor`'s month, or `None` when the
/// cell is outside the grid or belongs to a neighboring month.
pub fn date_at_grid_index(anchor: NaiveDate, index: i64) -> Option<NaiveDate> {
    if !(0..GRID_CELLS).contains(&index) {
        return None;
    }
    let day = index - month_offset(anchor) + 1;
    if day < 1 || day > i64::from(days_in_month(anchor)) {
        return None;
    }
    anchor.with_day(day as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn month_boundaries() {
        assert_eq!(first_day_of_month(d(2019, 11, 20)), d(2019, 11, 1));
        assert_eq!(last_day_of_month(d(2019, 11, 20)), d(2019, 11, 30));
        assert_eq!(last_day_of_month(d(2020, 2, 3)), d(2020, 2, 29));
        assert_eq!(last_day_of_month(d(2019, 12, 31)), d(2019, 12, 31));
        assert_eq!(days_in_month(d(2019, 2, 1)), 28);
    }

    #[test]
    fn grid_index_of_first_day() {
        // November 2019 starts on a Friday: cell 4 of the Monday-based grid.
        assert_eq!(grid_index(d(2019, 11, 1)), 4);
        assert_eq!(date_at_grid_index(d(2019, 11, 15), 4), Some(d(2019, 11, 1)));
    }

    #[test]
    fn grid_round_trip() {
        let anchor = d(2019, 11, 15);
        for day in 1..=30 {
            let date = d(2019, 11, day);
            assert_eq!(date_at_grid_index(anchor, grid_index(date)), Some(date));
        }
    }

    #[test]
    fn grid_rejects_cells_outside_month() {
        let anchor = d(2019, 11, 15);
        // Cells before the 1st belong to October
        assert_eq!(date_at_grid_index(anchor, 3), None);
        // Cells after the 30th belong to December
        assert_eq!(date_at_grid_index(anchor, 35), None);
        assert_eq!(date_at_grid_index(anchor, -1), None);
        assert_eq!(date_at_grid_index(anchor, grid_index(d(2019, 11, 30)) + 1), None);
    }
}
