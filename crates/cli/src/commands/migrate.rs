use pizzabot_db::migrations;

use crate::commands::{with_database, CommandResult};

pub fn run() -> CommandResult {
    let result = with_database("migrate", |pool| async move {
        migrations::run_pending(&pool).await.map_err(|error| ("migration", error.to_string(), 5u8))
    });

    match result {
        Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
        Err(failure) => failure,
    }
}
