//! Restaurant menu
//!
//! Listing resolves each dish's restaurant name and public image URL.
//! Adding a dish validates the form first, creates the record, then uploads
//! the image under the new dish id.

use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;

use crate::analytics::resolve_restaurant;
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::storage::{buckets, ObjectStorage};
use crate::store::{collections, fields, Direction, FieldValue, Query};
use crate::types::{Dish, UserProfile};

/// Largest accepted dish image.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

const UNKNOWN_RESTAURANT: &str = "Unknown Restaurant";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuEntry {
    pub dish: Dish,
    pub restaurant_name: String,
    pub image_url: Option<String>,
}

/// Every dish, newest first.
pub async fn list_menu(
    fetcher: &Fetcher<'_>,
    storage: &dyn ObjectStorage,
) -> Result<Vec<MenuEntry>> {
    let dishes: Vec<Dish> = fetcher
        .fetch_query(Query::new(collections::DISHES).order_by("createdAt", Direction::Descending))
        .await?;

    // Restaurant names live on the owning user profile
    let restaurant_ids: Vec<String> = dishes
        .iter()
        .filter_map(|d| d.restaurant_id.clone())
        .collect();
    let owners: Vec<UserProfile> = fetcher.fetch_by_ids(&restaurant_ids).await?;
    let names: HashMap<&str, &str> = owners
        .iter()
        .filter_map(|u| Some((u.id.as_str(), u.display_name.as_deref()?)))
        .collect();

    Ok(dishes
        .into_iter()
        .map(|dish| {
            let restaurant_name = dish
                .restaurant_id
                .as_deref()
                .and_then(|id| names.get(id).copied())
                .unwrap_or(UNKNOWN_RESTAURANT)
                .to_string();
            let image_url = dish.image_path.as_deref().map(|path| {
                if path.starts_with("http://") || path.starts_with("https://") {
                    path.to_string()
                } else {
                    storage.public_url(buckets::DISHES, path)
                }
            });
            MenuEntry {
                dish,
                restaurant_name,
                image_url,
            }
        })
        .collect())
}

/// Image attached to a new dish.
#[derive(Debug, Clone)]
pub struct DishImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl DishImage {
    fn extension(&self) -> &str {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
            .unwrap_or("img")
    }
}

/// Form input for a new dish.
#[derive(Debug, Clone)]
pub struct NewDish {
    pub name: String,
    pub category: String,
    pub price: f64,
    pub description: String,
    pub image: Option<DishImage>,
}

impl NewDish {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty()
            || self.category.trim().is_empty()
            || self.description.trim().is_empty()
        {
            return Err(Error::Validation(
                "name, category, price and description are required".to_string(),
            ));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(Error::Validation(format!("invalid price: {}", self.price)));
        }
        if let Some(image) = &self.image {
            if !image.content_type.starts_with("image/") {
                return Err(Error::Validation(format!(
                    "{} is not an image ({})",
                    image.file_name, image.content_type
                )));
            }
            if image.bytes.len() > MAX_IMAGE_BYTES {
                return Err(Error::Validation(format!(
                    "{} is larger than 10MB",
                    image.file_name
                )));
            }
        }
        Ok(())
    }
}

/// Add a dish to the signed-in owner's restaurant.
pub async fn add_dish(
    fetcher: &Fetcher<'_>,
    storage: &dyn ObjectStorage,
    new_dish: NewDish,
) -> Result<Dish> {
    new_dish.validate()?;
    let restaurant_id = resolve_restaurant(fetcher).await?;

    let store = fetcher.store();
    let session = fetcher.session();
    let created_at = Utc::now();

    let dish_id = store
        .create(
            session,
            collections::DISHES,
            fields([
                ("name", FieldValue::from(new_dish.name.trim())),
                ("category", FieldValue::from(new_dish.category.trim())),
                ("price", FieldValue::Double(new_dish.price)),
                ("description", FieldValue::from(new_dish.description.trim())),
                ("restaurantId", FieldValue::from(restaurant_id.as_str())),
                ("createdAt", FieldValue::Timestamp(created_at)),
            ]),
        )
        .await?;

    let mut image_path = None;
    if let Some(image) = new_dish.image {
        let path = format!("{}.{}", dish_id, image.extension());
        storage
            .upload(buckets::DISHES, &path, image.bytes, &image.content_type)
            .await?;
        store
            .update(
                session,
                collections::DISHES,
                &dish_id,
                fields([("imageUrl", FieldValue::from(path.as_str()))]),
            )
            .await?;
        image_path = Some(path);
    }

    tracing::info!(dish_id = %dish_id, restaurant_id = %restaurant_id, "Added dish");

    Ok(Dish {
        id: dish_id,
        name: new_dish.name.trim().to_string(),
        category: new_dish.category.trim().to_string(),
        price: new_dish.price,
        description: Some(new_dish.description.trim().to_string()),
        restaurant_id: Some(restaurant_id),
        image_path,
        created_at: Some(created_at),
    })
}
