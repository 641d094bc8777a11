mod commands;
mod terminal;

use commands::{CommandLine, scan};
use terminal::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();
    logging::init_logging(commands.log_level());
    scan::scan(&commands).await
}
