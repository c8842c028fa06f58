use async_graphql::{InputValueError, InputValueResult, Number, Scalar, ScalarType, Value};
use std::fmt;

use infra::fantasy;

/// Fantasy price in millions of euros with one decimal (e.g. 5.5).
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Default, Debug)]
pub struct Price(pub fantasy::Price);

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<fantasy::Price> for Price {
    fn from(price: fantasy::Price) -> Self {
        Price(price)
    }
}

impl From<Price> for fantasy::Price {
    fn from(price: Price) -> Self {
        price.0
    }
}

#[Scalar]
impl ScalarType for Price {
    fn parse(value: Value) -> InputValueResult<Self> {
        match value {
            Value::Number(n) => n
                .as_f64()
                .and_then(fantasy::Price::from_millions_f64)
                .map(Price)
                .ok_or_else(|| {
                    InputValueError::custom(format!(
                        "Price must be between 0 and {} millions",
                        fantasy::MAX_PRICE.as_millions()
                    ))
                }),
            _ => Err(InputValueError::custom(
                "Price must be a number (millions of euros)",
            )),
        }
    }

    fn to_value(&self) -> Value {
        Number::from_f64(self.0.as_millions())
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}
