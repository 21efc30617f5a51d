use rust_decimal::Decimal;
use tracing::info;

use pizzabot_core::domain::product::Product;

use crate::repositories::{ProductRepository, RepositoryError};

struct SeedPizza {
    name: &'static str,
    ingredients: &'static str,
    price_cents: i64,
}

/// Default menu, loaded only into an empty catalog.
const SEED_MENU: &[SeedPizza] = &[
    SeedPizza {
        name: "Calabresa",
        ingredients: "molho de tomate, mussarela, calabresa fatiada, cebola, orégano",
        price_cents: 3990,
    },
    SeedPizza {
        name: "Margherita",
        ingredients: "molho de tomate, mussarela, manjericão fresco, azeite",
        price_cents: 3590,
    },
    SeedPizza {
        name: "Portuguesa",
        ingredients: "molho de tomate, mussarela, presunto, ovo, cebola, azeitona, ervilha",
        price_cents: 4290,
    },
    SeedPizza {
        name: "Quatro Queijos",
        ingredients: "mussarela, gorgonzola, parmesão, catupiry",
        price_cents: 4490,
    },
    SeedPizza {
        name: "Frango com Catupiry",
        ingredients: "molho de tomate, frango desfiado, catupiry, milho",
        price_cents: 4190,
    },
    SeedPizza {
        name: "Pepperoni",
        ingredients: "molho de tomate, mussarela, pepperoni, orégano",
        price_cents: 4390,
    },
    SeedPizza {
        name: "Vegetariana",
        ingredients: "molho de tomate, mussarela, pimentão, champignon, cebola, azeitona, tomate",
        price_cents: 3890,
    },
    SeedPizza {
        name: "Napolitana",
        ingredients: "molho de tomate, mussarela, tomate, parmesão, alho",
        price_cents: 3790,
    },
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub inserted: usize,
    pub already_present: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

pub struct MenuSeed;

impl MenuSeed {
    pub fn products() -> Vec<Product> {
        SEED_MENU
            .iter()
            .map(|seed| Product::new(seed.name, seed.ingredients, Decimal::new(seed.price_cents, 2)))
            .collect()
    }

    /// Seeds the default menu unless the catalog already holds products.
    pub async fn load<R>(repository: &R) -> Result<SeedResult, RepositoryError>
    where
        R: ProductRepository + ?Sized,
    {
        let existing = repository.count().await?;
        if existing > 0 {
            info!(
                event_name = "system.seed.skipped",
                existing_products = existing,
                "catalog already seeded"
            );
            return Ok(SeedResult { inserted: 0, already_present: existing });
        }

        let products = Self::products();
        let inserted = products.len();
        for product in products {
            repository.save(product).await?;
        }

        info!(event_name = "system.seed.completed", inserted, "catalog seeded with default menu");
        Ok(SeedResult { inserted, already_present: 0 })
    }

    pub async fn verify<R>(repository: &R) -> Result<VerificationResult, RepositoryError>
    where
        R: ProductRepository + ?Sized,
    {
        let mut checks = Vec::with_capacity(SEED_MENU.len());
        for seed in SEED_MENU {
            let present = repository
                .find_by_name(seed.name)
                .await
                .map_err(|error| RepositoryError::Decode(error.to_string()))?
                .is_some_and(|product| product.name == seed.name);
            checks.push((seed.name, present));
        }

        Ok(VerificationResult { all_present: checks.iter().all(|(_, ok)| *ok), checks })
    }
}
