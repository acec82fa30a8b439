use chrono::{DateTime, Datelike, Days, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;

/// The single zone every event is scheduled in.
pub const EVENT_TIMEZONE: Tz = chrono_tz::Asia::Jerusalem;

pub const ALL_WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Reference point for resolving "today", "tomorrow" and weekday names.
///
/// Computed once per extraction so that a request straddling midnight never
/// mixes two different "todays".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateContext {
    pub reference_date: NaiveDate,
    pub reference_weekday: Weekday,
}

impl DateContext {
    pub fn resolve(now: DateTime<Utc>) -> Self {
        let local = now.with_timezone(&EVENT_TIMEZONE);
        Self::for_date(local.date_naive())
    }

    pub fn for_date(reference_date: NaiveDate) -> Self {
        Self {
            reference_date,
            reference_weekday: reference_date.weekday(),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.reference_date
    }

    pub fn tomorrow(&self) -> NaiveDate {
        self.reference_date + Days::new(1)
    }

    /// Nearest occurrence of `weekday`, counting today as a match.
    pub fn next_weekday(&self, weekday: Weekday) -> NaiveDate {
        let ahead = (7 + weekday.num_days_from_monday()
            - self.reference_weekday.num_days_from_monday())
            % 7;
        self.reference_date + Days::new(u64::from(ahead))
    }

    /// Resolves a relative-day word in English or Hebrew.
    ///
    /// `this`/`next` prefixes and the Hebrew `יום`/`ביום` prefixes are
    /// ignored, so "next Tuesday" follows the same nearest-occurrence rule
    /// as "Tuesday".
    pub fn resolve_expression(&self, expr: &str) -> Option<NaiveDate> {
        let lowered = expr.trim().to_lowercase();
        let mut word = lowered.as_str();
        for prefix in ["this ", "next ", "ביום ", "יום "] {
            if let Some(rest) = word.strip_prefix(prefix) {
                word = rest.trim_start();
            }
        }

        match word {
            "today" | "היום" => Some(self.today()),
            "tomorrow" | "מחר" => Some(self.tomorrow()),
            other => parse_weekday(other).map(|w| self.next_weekday(w)),
        }
    }
}

fn parse_weekday(word: &str) -> Option<Weekday> {
    ALL_WEEKDAYS.into_iter().find(|w| {
        let english = weekday_name_en(*w).to_lowercase();
        word == english || word == &english[..3] || word == weekday_name_he(*w)
    })
}

pub fn weekday_name_en(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub fn weekday_name_he(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "שני",
        Weekday::Tue => "שלישי",
        Weekday::Wed => "רביעי",
        Weekday::Thu => "חמישי",
        Weekday::Fri => "שישי",
        Weekday::Sat => "שבת",
        Weekday::Sun => "ראשון",
    }
}
