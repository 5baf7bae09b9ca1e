pub mod formatter;

pub use formatter::{format_run, format_tally, print_ledger, print_plan, print_summary};
