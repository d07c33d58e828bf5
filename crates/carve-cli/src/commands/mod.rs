pub(crate) mod decompose;
pub(crate) mod helpers;
pub(crate) mod shared;
