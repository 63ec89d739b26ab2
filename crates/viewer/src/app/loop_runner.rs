use std::process::ExitCode;

use engine::run_app;
use tracing::error;

use super::bootstrap::AppWiring;
use super::connection::WebSocketLink;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let link = match WebSocketLink::connect(&app.config.server_url) {
        Ok(link) => link,
        Err(err) => {
            error!(error = %err, "connection_worker_spawn_failed");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = run_app(app.config, Box::new(link)) {
        error!(error = %err, "startup_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
