use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::errors::ApiError;

// Два допустимых литеральных формата дат во входящих запросах
const FORMAT_ISO_T: &str = "%Y-%m-%dT%H:%M:%S";
const FORMAT_SPACE: &str = "%Y-%m-%d %H:%M:%S";

/// Нормализатор времени: все даты от клиентов трактуются как локальное время
/// кинотеатра и приводятся к каноническому моменту в UTC. Обратно наружу
/// моменты всегда отдаются в референсной таймзоне с точностью до секунды.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    tz: Tz,
}

impl Clock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Принимает строго `YYYY-MM-DDTHH:mm:ss` либо `YYYY-MM-DD HH:mm:ss`.
    /// Несуществующее или неоднозначное локальное время (переводы часов)
    /// отклоняется так же, как и синтаксически кривая строка.
    pub fn normalize(&self, raw: &str) -> Result<DateTime<Utc>, ApiError> {
        let naive = NaiveDateTime::parse_from_str(raw, FORMAT_ISO_T)
            .or_else(|_| NaiveDateTime::parse_from_str(raw, FORMAT_SPACE))
            .map_err(|_| ApiError::MalformedDate)?;

        self.tz
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or(ApiError::MalformedDate)
    }

    // Граница диапазона в фильтрах списков: голая дата без времени
    // разворачивается в начало либо конец суток
    pub fn normalize_range_bound(
        &self,
        raw: &str,
        end_of_day: bool,
    ) -> Result<DateTime<Utc>, ApiError> {
        if !raw.contains('T') && !raw.contains(':') {
            let time = if end_of_day { "23:59:59" } else { "00:00:00" };
            return self.normalize(&format!("{raw}T{time}"));
        }
        self.normalize(raw)
    }

    pub fn format(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.tz)
            .format(FORMAT_SPACE)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Kyiv;

    fn clock() -> Clock {
        Clock::new(Kyiv)
    }

    #[test]
    fn accepts_both_literal_formats() {
        let a = clock().normalize("2025-07-01T18:00:00").unwrap();
        let b = clock().normalize("2025-07-01 18:00:00").unwrap();
        assert_eq!(a, b);
        // Киев летом UTC+3
        assert_eq!(a.to_rfc3339(), "2025-07-01T15:00:00+00:00");
    }

    #[test]
    fn rejects_other_shapes() {
        for raw in [
            "2025-07-01",
            "01.07.2025 18:00:00",
            "2025-07-01T18:00",
            "2025-07-01T18:00:00.000Z",
            "2025-07-01T18:00:00+03:00",
            "сьогодні",
            "",
        ] {
            assert!(matches!(
                clock().normalize(raw),
                Err(ApiError::MalformedDate)
            ), "accepted: {raw}");
        }
    }

    #[test]
    fn rejects_invalid_calendar_dates() {
        assert!(clock().normalize("2025-02-30T12:00:00").is_err());
        assert!(clock().normalize("2025-13-01 12:00:00").is_err());
        assert!(clock().normalize("2025-06-31 12:00:00").is_err());
        assert!(clock().normalize("2025-06-15 24:00:00").is_err());
    }

    // Весной стрелки прыгают с 03:00 на 04:00 - этого получаса не существует
    #[test]
    fn rejects_nonexistent_local_time() {
        assert!(matches!(
            clock().normalize("2025-03-30T03:30:00"),
            Err(ApiError::MalformedDate)
        ));
    }

    // Осенью 03:00-03:59 встречается дважды - неоднозначность тоже отказ
    #[test]
    fn rejects_ambiguous_local_time() {
        assert!(matches!(
            clock().normalize("2025-10-26T03:30:00"),
            Err(ApiError::MalformedDate)
        ));
    }

    #[test]
    fn formats_back_in_reference_timezone() {
        let instant = clock().normalize("2025-07-01T18:00:00").unwrap();
        assert_eq!(clock().format(instant), "2025-07-01 18:00:00");

        // зимой смещение другое, формат тот же
        let winter = clock().normalize("2025-12-01 09:15:30").unwrap();
        assert_eq!(clock().format(winter), "2025-12-01 09:15:30");
        assert_eq!(winter.to_rfc3339(), "2025-12-01T07:15:30+00:00");
    }

    #[test]
    fn bare_dates_expand_to_day_bounds() {
        let from = clock().normalize_range_bound("2025-06-24", false).unwrap();
        let to = clock().normalize_range_bound("2025-06-24", true).unwrap();
        assert_eq!(clock().format(from), "2025-06-24 00:00:00");
        assert_eq!(clock().format(to), "2025-06-24 23:59:59");

        // полная строка проходит без разворачивания
        let exact = clock()
            .normalize_range_bound("2025-06-24T10:00:00", false)
            .unwrap();
        assert_eq!(clock().format(exact), "2025-06-24 10:00:00");
    }
}
