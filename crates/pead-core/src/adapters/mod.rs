//! Upstream price provider adapters.

mod financial_datasets;

pub use financial_datasets::FinancialDatasetsAdapter;
