use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};

/// Which dates a run covers: an explicit list or an inclusive range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DateSelection {
    #[default]
    Unset,
    Dates(Vec<NaiveDate>),
    Range { start: NaiveDate, end: NaiveDate },
}

impl DateSelection {
    /// Combine the two selection modes. Supplying both is an error, as is a
    /// range that ends before it starts. An empty list counts as unset.
    pub fn from_parts(
        dates: Option<Vec<NaiveDate>>,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Self> {
        let dates = dates.filter(|d| !d.is_empty());
        match (dates, range) {
            (Some(_), Some(_)) => {
                bail!("Only one of `dates` or `date_range` should be provided")
            }
            (Some(dates), None) => Ok(Self::Dates(dates)),
            (None, Some((start, end))) => {
                if end < start {
                    bail!("Date range ends ({end}) before it starts ({start})");
                }
                Ok(Self::Range { start, end })
            }
            (None, None) => Ok(Self::Unset),
        }
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        !matches!(self, Self::Unset)
    }

    #[must_use]
    pub fn expand(&self) -> Vec<NaiveDate> {
        match self {
            Self::Unset => Vec::new(),
            Self::Dates(dates) => dates.clone(),
            Self::Range { start, end } => start.iter_days().take_while(|d| d <= end).collect(),
        }
    }
}

/// Parse a date argument: `YYYY-MM-DD` or today/yesterday/tomorrow.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let today = Local::now().date_naive();
    match s {
        "today" => Ok(today),
        "yesterday" => Ok(today - chrono::Duration::days(1)),
        "tomorrow" => Ok(today + chrono::Duration::days(1)),
        _ => NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| {
            format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
        }),
    }
}

/// Date selection from command-line flags; `Unset` when no flag was given.
pub fn selection_from_args(
    dates: &[String],
    from: Option<&str>,
    to: Option<&str>,
) -> Result<DateSelection> {
    let dates = dates
        .iter()
        .map(|d| parse_date(d))
        .collect::<Result<Vec<_>>>()?;
    let range = match (from, to) {
        (Some(from), Some(to)) => Some((parse_date(from)?, parse_date(to)?)),
        (None, None) => None,
        _ => bail!("Both --from and --to are required for a date range"),
    };
    DateSelection::from_parts(Some(dates), range)
}
