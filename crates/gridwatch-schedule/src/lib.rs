//! The schedule-lookup client, shared by the Schedule Enrichment process
//! (photo refresh) and Delivery (status-change annotation). Lives as a
//! library so both binaries depend on the same trait and the same fact
//! representation instead of duplicating either.

pub mod client;
pub mod fact;
