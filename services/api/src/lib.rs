mod audits;
mod cli;
mod demo;
mod infra;
mod routes;
mod server;

use gate_audit::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
