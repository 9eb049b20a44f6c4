//! Domain layer: the article aggregate, pipeline jobs, audit records and
//! shared foundation types.

pub mod article;
pub mod audit;
pub mod foundation;
pub mod job;
