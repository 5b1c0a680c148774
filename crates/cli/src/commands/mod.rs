pub(crate) mod queue;
pub(crate) mod serve;
