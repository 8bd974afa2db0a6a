use std::{collections::HashMap, str::FromStr};

use crate::{constants::MAX_COUNT_PER_PAGE, error::ServiceError, schema::Uuid};

/// Raw query-string pairs as sent by the client. Keys may repeat.
pub type FormData = Vec<(String, String)>;

pub struct Form {
    inner: HashMap<String, Vec<String>>,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        let mut inner: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in data {
            inner.entry(key).or_default().push(value);
        }

        Self { inner }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.inner
            .get(key)
            .and_then(|values| values.first())
            .map(|value| value.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.inner.get(key).cloned().unwrap_or_default()
    }

    pub fn get_number<T>(&self, key: &'static str) -> Result<Option<T>, ServiceError>
    where
        T: FromStr,
    {
        match self.get_str(key) {
            Some(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_e| ServiceError::validation(key, "A valid integer is required")),
            None => Ok(None),
        }
    }

    pub fn get_flag(&self, key: &'static str) -> Result<bool, ServiceError> {
        match self.get_str(key) {
            Some("1" | "true" | "True") => Ok(true),
            Some("0" | "false" | "False") | None => Ok(false),
            Some(_) => Err(ServiceError::validation(key, "Must be 0 or 1")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn from_form(form: &Form, default_limit: i64) -> Result<Self, ServiceError> {
        let page = form.get_number::<i64>("page")?.unwrap_or(1);
        if page < 1 {
            return Err(ServiceError::validation("page", "Invalid page"));
        }

        let limit = form.get_number::<i64>("limit")?.unwrap_or(default_limit);
        if limit < 1 {
            return Err(ServiceError::validation("limit", "Must be a positive number"));
        }

        let limit = limit.min(MAX_COUNT_PER_PAGE);
        if (page - 1).checked_mul(limit).is_none() {
            return Err(ServiceError::validation("page", "Invalid page"));
        }

        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author: Option<Uuid>,
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub page: PageRequest,
}

impl RecipeFilter {
    pub fn from_form(form: &Form, default_limit: i64) -> Result<Self, ServiceError> {
        Ok(Self {
            author: form.get_number("author")?,
            tags: form.get_all("tags"),
            is_favorited: form.get_flag("is_favorited")?,
            is_in_shopping_cart: form.get_flag("is_in_shopping_cart")?,
            page: PageRequest::from_form(form, default_limit)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> Form {
        Form::from_data(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn repeated_tags_are_all_kept() {
        let filter = RecipeFilter::from_form(
            &form(&[("tags", "breakfast"), ("tags", "lunch"), ("author", "3")]),
            6,
        )
        .unwrap();

        assert_eq!(filter.tags, vec!["breakfast", "lunch"]);
        assert_eq!(filter.author, Some(3));
        assert!(!filter.is_favorited);
        assert_eq!(filter.page, PageRequest { page: 1, limit: 6 });
    }

    #[test]
    fn flags_accept_numeric_and_boolean_forms() {
        let filter = RecipeFilter::from_form(
            &form(&[("is_favorited", "1"), ("is_in_shopping_cart", "true")]),
            6,
        )
        .unwrap();

        assert!(filter.is_favorited);
        assert!(filter.is_in_shopping_cart);
        assert!(RecipeFilter::from_form(&form(&[("is_favorited", "yes")]), 6).is_err());
    }

    #[test]
    fn page_request_computes_offset_and_caps_limit() {
        let page = PageRequest::from_form(&form(&[("page", "3"), ("limit", "10")]), 6).unwrap();
        assert_eq!(page.offset(), 20);

        let capped = PageRequest::from_form(&form(&[("limit", "100000")]), 6).unwrap();
        assert_eq!(capped.limit, MAX_COUNT_PER_PAGE);
    }

    #[test]
    fn invalid_numbers_name_the_parameter() {
        match PageRequest::from_form(&form(&[("page", "abc")]), 6) {
            Err(ServiceError::Validation { field, .. }) => assert_eq!(field, "page"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(PageRequest::from_form(&form(&[("page", "0")]), 6).is_err());
    }

    #[test]
    fn huge_page_numbers_are_rejected() {
        match PageRequest::from_form(&form(&[("page", &i64::MAX.to_string())]), 6) {
            Err(ServiceError::Validation { field, .. }) => assert_eq!(field, "page"),
            other => panic!("unexpected {other:?}"),
        }

        let page = PageRequest {
            page: i64::MAX,
            limit: 6,
        };
        assert_eq!(page.offset(), i64::MAX);
    }
}
