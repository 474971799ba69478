//! Record versioning: the "actual rates" variant of a quotation.
//!
//! A quotation is priced with estimated rates. Once the tour runs, the
//! operator records what was really paid in a derived copy of the quotation
//! that points back to its source through `originalRecordId`. The source is
//! never modified.

pub mod actual_rates;

pub use actual_rates::{
    ActualRatesWorkflow, Derivation, DerivedState, ACTUAL_RATES_FLAG, ORIGINAL_RECORD_ID,
    UPDATED_AT,
};
