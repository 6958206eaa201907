pub(crate) mod blend;
pub(crate) mod cache;
pub(crate) mod compositor;
