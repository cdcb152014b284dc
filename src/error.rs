use thiserror::Error;

/// Data-integrity failures. Each of them aborts the run.
#[derive(Error, Debug, PartialEq)]
pub enum HairpinError {
    #[error("statistics table is empty; expected a header line")]
    EmptyTable,

    #[error("missing required column '{0}' in statistics header")]
    MissingColumn(&'static str),

    #[error("column '{0}' is absent from the row")]
    ShortRow(&'static str),

    #[error("invalid value '{token}' in column '{column}'")]
    Malformed { column: &'static str, token: Box<str> },

    #[error("'{column}' is NA at position {start}, but the hairpin rule needs it")]
    NullField { column: &'static str, start: i64 },

    #[error("VCF and statistics mismatch at position VCF: {variant}, statistics: {stat}")]
    PositionMismatch { variant: i64, stat: i64 },

    #[error("VCF has more records than the statistics table (first unpaired VCF position: {0})")]
    ExtraVariants(i64),

    #[error("statistics table has more rows than the VCF (first unpaired statistics position: {0})")]
    ExtraStatRows(i64),

    #[error("FILTER/{0} is not defined in the output header")]
    HeaderMutation(&'static str),
}
