use pizzabot_core::catalog::CatalogLookup;
use pizzabot_core::domain::product::Product;
use pizzabot_db::SqlProductRepository;

use crate::commands::{with_database, CommandResult};

pub fn run() -> CommandResult {
    let result = with_database("menu", |pool| async move {
        SqlProductRepository::new(pool).list_all().await.map_err(|error| {
            ("catalog_unavailable", format!("{error} (run `pizzabot migrate` first?)"), 5u8)
        })
    });

    match result {
        Ok(products) => CommandResult::success("menu", render(&products)),
        Err(failure) => failure,
    }
}

fn render(products: &[Product]) -> String {
    if products.is_empty() {
        return "menu is empty (run `pizzabot seed`)".to_string();
    }
    products
        .iter()
        .map(|product| format!("{} - R$ {:.2} ({})", product.name, product.price, product.description))
        .collect::<Vec<_>>()
        .join("\n")
}
