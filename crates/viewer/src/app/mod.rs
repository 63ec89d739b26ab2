mod bootstrap;
mod connection;
mod loop_runner;

pub(crate) use bootstrap::build_app;
pub(crate) use loop_runner::run;
