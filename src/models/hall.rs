use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Сетка мест зала: rows x cols, нумерация мест с единицы.
// В БД колонки называются seat_rows/seat_cols, "rows" в Postgres зарезервировано.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Hall {
    pub id: i64,
    pub name: String,
    #[sqlx(rename = "seat_rows")]
    pub rows: i32,
    #[sqlx(rename = "seat_cols")]
    pub cols: i32,
}

impl Hall {
    // Истинная прямоугольная проверка попадания места в сетку.
    pub fn contains_seat(&self, row: i32, col: i32) -> bool {
        row >= 1 && col >= 1 && row <= self.rows && col <= self.cols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hall_10x10() -> Hall {
        Hall { id: 1, name: "Зал 1".to_string(), rows: 10, cols: 10 }
    }

    #[test]
    fn accepts_seats_inside_the_grid() {
        let hall = hall_10x10();
        assert!(hall.contains_seat(1, 1));
        assert!(hall.contains_seat(5, 6));
        assert!(hall.contains_seat(10, 10));
    }

    #[test]
    fn rejects_seats_outside_the_grid() {
        let hall = hall_10x10();
        assert!(!hall.contains_seat(11, 1));
        assert!(!hall.contains_seat(1, 11));
        assert!(!hall.contains_seat(0, 5));
        assert!(!hall.contains_seat(5, 0));
        assert!(!hall.contains_seat(-1, 3));
    }

    // row * col <= rows * cols приняла бы (100, 1) для зала 10x10 -
    // прямоугольная проверка обязана такое отбрасывать
    #[test]
    fn product_bound_counterexample_is_rejected() {
        let hall = hall_10x10();
        assert!(!hall.contains_seat(100, 1));
        assert!(!hall.contains_seat(1, 100));
    }
}
