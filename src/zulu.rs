//! "Zulu" time helpers: `YYYY-MM-DDTHH:MM:SS[.fraction]Z` text to and from UTC instants.

// crates.io
use time::{PrimitiveDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
// self
use crate::_prelude::*;

const ZULU_FORMAT: &[FormatItem<'static>] =
	format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");
const ZULU_PARSE_FORMAT: &[FormatItem<'static>] = format_description!(
	"[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]Z"
);

/// Errors raised while parsing Zulu strings.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ZuluError {
	/// The text is not a valid `YYYY-MM-DDTHH:MM:SS[.fraction]Z` instant.
	#[error("The string `{value}` is not in Zulu time format.")]
	NotZulu {
		/// Offending text.
		value: String,
	},
}

/// Returns true when `value` is a valid `YYYY-MM-DDTHH:MM:SS[.fraction]Z` instant.
pub fn is_zulu_string(value: &str) -> bool {
	parse_zulu(value).is_ok()
}

/// Parses a Zulu string into an offset-aware UTC instant.
pub fn parse_zulu(value: &str) -> Result<OffsetDateTime, ZuluError> {
	PrimitiveDateTime::parse(value, ZULU_PARSE_FORMAT)
		.map(PrimitiveDateTime::assume_utc)
		.map_err(|_| ZuluError::NotZulu { value: value.to_owned() })
}

/// Formats an instant as a whole-second Zulu string, converting to UTC first.
pub fn format_zulu(instant: OffsetDateTime) -> String {
	instant
		.to_offset(UtcOffset::UTC)
		.format(ZULU_FORMAT)
		.unwrap_or_else(|_| instant.unix_timestamp().to_string())
}
