pub mod financial_lf;
pub mod fut_fin_archive;
pub mod report_row;
pub mod tiered_fetcher;
