use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use pizzabot_core::catalog::{CatalogError, CatalogLookup};
use pizzabot_core::domain::product::Product;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::conversation::ToolOutput;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToolKind {
    GetPrice,
    ListAll,
    AddToCart,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [Self::GetPrice, Self::ListAll, Self::AddToCart];

    pub fn name(self) -> &'static str {
        match self {
            Self::GetPrice => "get_price",
            Self::ListAll => "list_all",
            Self::AddToCart => "add_to_cart",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::GetPrice => "Look up the price and ingredients of a pizza by name.",
            Self::ListAll => "List every pizza on the menu with its price.",
            Self::AddToCart => "Add a pizza to the customer's cart.",
        }
    }

    fn parameters(self) -> Value {
        match self {
            Self::GetPrice => json!({
                "type": "object",
                "properties": {
                    "pizza_name": {"type": "string", "description": "Name of the pizza"}
                },
                "required": ["pizza_name"]
            }),
            Self::ListAll => json!({"type": "object", "properties": {}}),
            Self::AddToCart => json!({
                "type": "object",
                "properties": {
                    "pizza_name": {"type": "string", "description": "Name of the pizza"},
                    "quantity": {
                        "type": "integer",
                        "minimum": 1,
                        "default": 1,
                        "description": "How many pizzas to add"
                    }
                },
                "required": ["pizza_name"]
            }),
        }
    }

    pub fn spec(self) -> ToolSpec {
        ToolSpec { name: self.name(), description: self.description(), parameters: self.parameters() }
    }
}

/// Tool description published to the model.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartAction {
    AddToCart,
}

/// Structured result of a successful `add_to_cart` call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartAddition {
    pub action: CartAction,
    pub pizza_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
}

impl CartAddition {
    /// `None` when the subtotal does not fit in a `Decimal`.
    pub fn new(product: &Product, quantity: u32) -> Option<Self> {
        let subtotal = product.price.checked_mul(Decimal::from(quantity))?;
        Some(Self {
            action: CartAction::AddToCart,
            pizza_name: product.name.clone(),
            price: product.price,
            quantity,
            subtotal,
        })
    }

    pub fn summary(&self) -> String {
        format!(
            "Added {}x {} (R$ {:.2} each, subtotal R$ {:.2})",
            self.quantity, self.pizza_name, self.price, self.subtotal
        )
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[derive(Debug, Deserialize)]
struct PizzaArgs {
    pizza_name: String,
}

#[derive(Debug, Deserialize)]
struct AddToCartArgs {
    pizza_name: String,
    #[serde(default = "default_quantity")]
    quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

fn decode_args<T: serde::de::DeserializeOwned>(arguments: &Value) -> Result<T, ToolError> {
    let arguments = match arguments {
        Value::Null => json!({}),
        other => other.clone(),
    };
    serde_json::from_value(arguments).map_err(|error| ToolError::InvalidArguments(error.to_string()))
}

/// The callable domain operations, keyed by the names the model uses.
pub struct ToolSet {
    catalog: Arc<dyn CatalogLookup>,
    table: HashMap<&'static str, ToolKind>,
}

impl ToolSet {
    pub fn new(catalog: Arc<dyn CatalogLookup>) -> Self {
        let table = ToolKind::ALL.into_iter().map(|kind| (kind.name(), kind)).collect();
        Self { catalog, table }
    }

    pub fn resolve(&self, name: &str) -> Option<ToolKind> {
        self.table.get(name).copied()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        ToolKind::ALL.into_iter().map(ToolKind::spec).collect()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub async fn execute(&self, kind: ToolKind, arguments: &Value) -> Result<ToolOutput, ToolError> {
        match kind {
            ToolKind::GetPrice => {
                let args: PizzaArgs = decode_args(arguments)?;
                self.get_price(&args.pizza_name).await.map(ToolOutput::Text)
            }
            ToolKind::ListAll => self.list_all().await.map(ToolOutput::Text),
            ToolKind::AddToCart => {
                let args: AddToCartArgs = decode_args(arguments)?;
                self.add_to_cart(&args.pizza_name, args.quantity).await
            }
        }
    }

    pub async fn get_price(&self, pizza_name: &str) -> Result<String, ToolError> {
        match self.catalog.find_by_name(pizza_name).await? {
            Some(product) => Ok(format!(
                "{} costs R$ {:.2}. Ingredients: {}",
                product.name, product.price, product.description
            )),
            None => self.not_found(pizza_name).await,
        }
    }

    pub async fn list_all(&self) -> Result<String, ToolError> {
        let products = self.catalog.list_all().await?;
        if products.is_empty() {
            return Ok("Sorry, there are no pizzas available right now.".to_string());
        }

        let mut menu = String::from("Here are our available pizzas:");
        for product in &products {
            let _ = write!(menu, "\n- {}: R$ {:.2} ({})", product.name, product.price, product.description);
        }
        Ok(menu)
    }

    pub async fn add_to_cart(&self, pizza_name: &str, quantity: u32) -> Result<ToolOutput, ToolError> {
        if quantity == 0 {
            return Err(ToolError::InvalidArguments("quantity must be at least 1".to_string()));
        }
        match self.catalog.find_by_name(pizza_name).await? {
            Some(product) => CartAddition::new(&product, quantity)
                .map(ToolOutput::CartAddition)
                .ok_or_else(|| ToolError::InvalidArguments(format!("quantity {quantity} is too large"))),
            None => self.not_found(pizza_name).await.map(ToolOutput::Text),
        }
    }

    async fn not_found(&self, pizza_name: &str) -> Result<String, ToolError> {
        let products = self.catalog.list_all().await?;
        if products.is_empty() {
            return Ok(format!(
                "Sorry, I couldn't find a pizza called '{pizza_name}'. No pizzas are available right now."
            ));
        }
        let names = products.iter().map(|product| product.name.as_str()).collect::<Vec<_>>();
        Ok(format!(
            "Sorry, I couldn't find a pizza called '{pizza_name}'. Available pizzas: {}",
            names.join(", ")
        ))
    }
}
