use pizzabot_db::{migrations, MenuSeed, SqlProductRepository};

use crate::commands::{with_database, CommandResult};

pub fn run() -> CommandResult {
    let result = with_database("seed", |pool| async move {
        migrations::run_pending(&pool).await.map_err(|error| ("migration", error.to_string(), 5u8))?;

        let repository = SqlProductRepository::new(pool);
        let seeded = MenuSeed::load(&repository)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
        if seeded.inserted == 0 {
            return Ok(format!(
                "menu already present ({} pizzas); nothing inserted",
                seeded.already_present
            ));
        }

        let verification = MenuSeed::verify(&repository)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;
        if !verification.all_present {
            let missing = verification
                .checks
                .iter()
                .filter_map(|(name, present)| (!present).then_some(*name))
                .collect::<Vec<_>>();
            return Err((
                "seed_verification",
                format!("seeded pizzas not readable back: {}", missing.join(", ")),
                6u8,
            ));
        }

        Ok(format!("seeded default menu with {} pizzas", seeded.inserted))
    });

    match result {
        Ok(message) => CommandResult::success("seed", message),
        Err(failure) => failure,
    }
}
