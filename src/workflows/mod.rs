pub mod guarantee;
