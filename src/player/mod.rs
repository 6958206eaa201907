pub(crate) mod events;
pub(crate) mod host;
pub(crate) mod opts;
pub(crate) mod scheduler;
