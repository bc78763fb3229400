//! Constants shared across request building, parsing and configuration.

// =============================================================================
// Session Defaults
// =============================================================================

/// Default host of the local Bloomberg API endpoint
pub const DEFAULT_HOST: &str = "localhost";

/// Default port of the local Bloomberg API endpoint
pub const DEFAULT_PORT: u16 = 8194;

/// Default wait for the next event before a request is declared timed out
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Directory that receives debug snapshots when debug mode is enabled
pub const DEFAULT_DEBUG_DIR: &str = "debug_cases";

// =============================================================================
// Services and Request Types
// =============================================================================

/// Reference, historical and intraday data service
pub const REFDATA_SERVICE: &str = "//blp/refdata";

/// BQL query service
pub const BQL_SERVICE: &str = "//blp/bqlsvc";

/// Excel-style search (BSRCH) service
pub const SEARCH_SERVICE: &str = "//blp/exrsvc";

/// Every service opened when a session is connected
pub const SERVICES: [&str; 3] = [REFDATA_SERVICE, BQL_SERVICE, SEARCH_SERVICE];

pub const REFERENCE_DATA_REQUEST: &str = "ReferenceDataRequest";
pub const HISTORICAL_DATA_REQUEST: &str = "HistoricalDataRequest";
pub const INTRADAY_BAR_REQUEST: &str = "IntradayBarRequest";
pub const BQL_REQUEST: &str = "sendQuery";
pub const SEARCH_REQUEST: &str = "ExcelGetGridRequest";

/// Application name sent in the BQL client context
pub const BQL_APP_NAME: &str = "EXCEL";

/// Periodicity used for historical requests
pub const DAILY_PERIODICITY: &str = "DAILY";

// =============================================================================
// Response Parsing
// =============================================================================

/// Name given to the BQL ID column when the response does not carry one
pub const DEFAULT_ID_COLUMN: &str = "ID";

/// Prefix of the log line emitted for BQL exception sets
pub const BQL_ERROR_PREFIX: &str = "BQL error: ";

/// Fallback text for BQL exceptions without a usable message
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Separator between BQL exception messages
pub const ERROR_SEPARATOR: &str = "; ";

/// Column holding the security identifier in BDP/BDH/BDIB frames
pub const SECURITY_COLUMN: &str = "security";

/// Column holding the observation date in BDH frames
pub const DATE_COLUMN: &str = "date";

/// Column holding the bar timestamp in BDIB frames
pub const TIME_COLUMN: &str = "time";

/// Tags wrapping a single scalar in BSRCH grid records
pub const SEARCH_VALUE_TAGS: [&str; 12] = [
    "StringData",
    "StringValue",
    "DoubleData",
    "DoubleValue",
    "Int32Data",
    "Int32Value",
    "Int64Value",
    "IntValue",
    "DateData",
    "DateValue",
    "BoolData",
    "BoolValue",
];

/// Days between 0001-01-01 (CE day 1) and the Unix epoch
pub const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;
