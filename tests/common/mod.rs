pub(crate) mod host;

pub(crate) mod logging;
