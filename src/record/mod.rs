//! Applicant records: domain types, wire types and the mapper between them.

pub mod api_types;
pub mod mapper;
pub mod types;

pub use mapper::{map_analytics, map_pagination, map_record, map_records};
pub use types::{Analytics, Category, Page, PageSlot, Pagination, Record};
