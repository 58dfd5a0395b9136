//! Local form validation. Nothing here touches the network: a form that
//! fails validation never produces a request.

use crate::api::LoginRequest;
use crate::models::{CakeForm, CakeSort};
use std::str::FromStr;

pub const USERNAME_REQUIRED: &str = "Nama pengguna wajib diisi!";
pub const PASSWORD_REQUIRED: &str = "Kata sandi wajib diisi!";
pub const CAKE_NAME_REQUIRED: &str = "Nama kue wajib diisi!";
pub const CAKE_PRICE_REQUIRED: &str = "Harga kue wajib diisi!";
pub const CAKE_PRICE_NOT_NUMBER: &str = "Harga kue harus angka!";
pub const CAKE_PRICE_NOT_POSITIVE: &str = "Harga kue harus lebih besar dari 0!";

/// Raw login inputs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoginErrors {
    pub username: Option<&'static str>,
    pub password: Option<&'static str>,
}

impl LoginErrors {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none()
    }
}

impl LoginInput {
    pub fn validate(&self) -> Result<LoginRequest, LoginErrors> {
        let errors = LoginErrors {
            username: self.username.trim().is_empty().then_some(USERNAME_REQUIRED),
            password: self.password.is_empty().then_some(PASSWORD_REQUIRED),
        };
        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(LoginRequest {
            username: self.username.trim().to_string(),
            password: self.password.clone(),
        })
    }
}

/// Raw cake form inputs, as typed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CakeInput {
    pub name: String,
    pub price: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CakeErrors {
    pub name: Option<&'static str>,
    pub price: Option<&'static str>,
}

impl CakeErrors {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.price.is_none()
    }
}

impl CakeInput {
    /// Pre-filled inputs for the edit form.
    pub fn from_form(form: &CakeForm) -> Self {
        Self {
            name: form.name.clone(),
            price: form.price.to_string(),
        }
    }

    pub fn validate(&self) -> Result<CakeForm, CakeErrors> {
        let name = self.name.trim();
        let price = validate_price(&self.price);

        let errors = CakeErrors {
            name: name.is_empty().then_some(CAKE_NAME_REQUIRED),
            price: price.err(),
        };
        match price {
            Ok(price) if errors.is_empty() => Ok(CakeForm {
                name: name.to_string(),
                price,
            }),
            _ => Err(errors),
        }
    }
}

fn validate_price(raw: &str) -> Result<u64, &'static str> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CAKE_PRICE_REQUIRED);
    }
    // Negative numbers are numbers; they fail positivity, not type.
    match i128::from_str(raw) {
        Ok(n) if n <= 0 => Err(CAKE_PRICE_NOT_POSITIVE),
        Ok(n) => u64::try_from(n).map_err(|_| CAKE_PRICE_NOT_NUMBER),
        Err(_) => Err(CAKE_PRICE_NOT_NUMBER),
    }
}

/// Inputs of the filter sheet. Empty name means "no filter".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CakeFilterInput {
    pub name_filter: String,
    pub sort: Option<CakeSort>,
}

impl CakeFilterInput {
    pub fn resolve(&self) -> (String, CakeSort) {
        (
            self.name_filter.trim().to_string(),
            self.sort.unwrap_or_default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_requires_both_fields() {
        let errors = LoginInput::default().validate().expect_err("empty form");
        assert_eq!(errors.username, Some(USERNAME_REQUIRED));
        assert_eq!(errors.password, Some(PASSWORD_REQUIRED));

        let ok = LoginInput {
            username: " budi ".to_string(),
            password: "rahasia".to_string(),
        }
        .validate()
        .expect("valid form");
        assert_eq!(ok.username, "budi");
    }

    #[test]
    fn test_cake_price_rules() {
        let check = |price: &str| {
            CakeInput {
                name: "Bolu".to_string(),
                price: price.to_string(),
            }
            .validate()
        };

        assert_eq!(check("").unwrap_err().price, Some(CAKE_PRICE_REQUIRED));
        assert_eq!(check("abc").unwrap_err().price, Some(CAKE_PRICE_NOT_NUMBER));
        assert_eq!(check("12.5").unwrap_err().price, Some(CAKE_PRICE_NOT_NUMBER));
        assert_eq!(check("0").unwrap_err().price, Some(CAKE_PRICE_NOT_POSITIVE));
        assert_eq!(check("-3").unwrap_err().price, Some(CAKE_PRICE_NOT_POSITIVE));
        assert_eq!(check(" 45000 ").unwrap().price, 45000);
    }

    #[test]
    fn test_cake_errors_reported_together() {
        let errors = CakeInput {
            name: "   ".to_string(),
            price: "x".to_string(),
        }
        .validate()
        .expect_err("both invalid");
        assert_eq!(errors.name, Some(CAKE_NAME_REQUIRED));
        assert_eq!(errors.price, Some(CAKE_PRICE_NOT_NUMBER));
    }

    #[test]
    fn test_cake_input_from_form() {
        let input = CakeInput::from_form(&CakeForm {
            name: "Klepon".to_string(),
            price: 7000,
        });
        assert_eq!(input.price, "7000");
        assert_eq!(input.validate().unwrap().name, "Klepon");
    }

    #[test]
    fn test_filter_defaults() {
        assert_eq!(
            CakeFilterInput::default().resolve(),
            (String::new(), CakeSort::NameAscending)
        );
    }
}
