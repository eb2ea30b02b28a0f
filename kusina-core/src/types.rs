//! Core domain types for kusina
//!
//! Typed views of the documents the dashboard reads. Each record implements
//! [`FromDocument`], which validates the raw document: fields that reports
//! cannot do without are required, everything else stays optional.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Restaurant** | A business approved through an application |
//! | **Owner** | The user account linked to a restaurant (`roles.business`) |
//! | **Order** | A customer order placed with one restaurant |
//! | **Interaction** | A like, comment or view on a video or user profile |
//! | **Application** | A request to open a restaurant, reviewed by an admin |
//! | **Report** | A user's complaint about a video (moderation) |

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::store::{collections, Document, FieldValue, FromDocument};

// ============================================
// Orders
// ============================================

/// Order lifecycle status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Completed,
    Cancelled,
    /// Any status this tool does not know about, kept verbatim
    Other(String),
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Other(s) => s,
        }
    }

    /// Parse a stored status; unknown values are preserved.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "pending" => OrderStatus::Pending,
            "preparing" => OrderStatus::Preparing,
            "completed" => OrderStatus::Completed,
            "cancelled" | "canceled" => OrderStatus::Cancelled,
            other => OrderStatus::Other(other.to_string()),
        }
    }
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
}

impl LineItem {
    pub fn subtotal(&self) -> f64 {
        self.unit_price * self.quantity as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub restaurant_id: String,
    pub status: OrderStatus,
    /// `None` when the stored timestamp is absent or unreadable
    pub created_at: Option<DateTime<Utc>>,
    pub total_price: f64,
    pub items: Vec<LineItem>,
    pub customer_id: Option<String>,
}

impl FromDocument for Order {
    const COLLECTION: &'static str = collections::ORDERS;

    fn from_document(doc: &Document) -> Result<Self> {
        let restaurant_id = doc.require_text("restaurantId")?;

        let mut items = Vec::new();
        for (index, raw) in doc.array("items").iter().enumerate() {
            let item = raw.as_map().ok_or_else(|| {
                Error::invalid(
                    &doc.collection,
                    &doc.id,
                    "items",
                    format!("line item {} is not a map", index),
                )
            })?;
            let name = item
                .get("name")
                .and_then(FieldValue::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    Error::invalid(
                        &doc.collection,
                        &doc.id,
                        "items",
                        format!("line item {} has no name", index),
                    )
                })?;
            let quantity = item
                .get("quantity")
                .and_then(FieldValue::as_f64)
                .map(|q| q.max(0.0) as u32)
                .unwrap_or(1);
            let unit_price = item
                .get("price")
                .and_then(FieldValue::as_f64)
                .unwrap_or(0.0);
            items.push(LineItem {
                name: name.to_string(),
                quantity,
                unit_price,
            });
        }

        // Orders written before totals were stored fall back to their lines
        let total_price = doc
            .f64("totalPrice")
            .unwrap_or_else(|| items.iter().map(LineItem::subtotal).sum());

        Ok(Order {
            id: doc.id.clone(),
            restaurant_id,
            status: doc
                .str("status")
                .map(OrderStatus::parse)
                .unwrap_or(OrderStatus::Pending),
            created_at: doc.timestamp("createdAt"),
            total_price,
            items,
            customer_id: doc.text("userId"),
        })
    }
}

// ============================================
// Interactions
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Like,
    Comment,
    View,
    Other(String),
}

impl InteractionKind {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "like" => InteractionKind::Like,
            "comment" => InteractionKind::Comment,
            "view" => InteractionKind::View,
            other => InteractionKind::Other(other.to_string()),
        }
    }
}

/// What an interaction points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    User,
    Video,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: String,
    pub kind: InteractionKind,
    pub user_id: String,
    pub target_id: String,
    /// Absent on older records; resolved against fetched videos
    pub target_kind: Option<TargetKind>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl FromDocument for Interaction {
    const COLLECTION: &'static str = collections::INTERACTIONS;

    fn from_document(doc: &Document) -> Result<Self> {
        let kind = InteractionKind::parse(&doc.require_text("type")?);
        let target_kind = match doc.str("targetType").map(str::to_lowercase).as_deref() {
            Some("user") => Some(TargetKind::User),
            Some("video") => Some(TargetKind::Video),
            _ => None,
        };

        Ok(Interaction {
            id: doc.id.clone(),
            kind,
            user_id: doc.require_text("userId")?,
            target_id: doc.require_text("targetId")?,
            target_kind,
            timestamp: doc.timestamp("timestamp"),
        })
    }
}

// ============================================
// Menu
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dish {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub description: Option<String>,
    pub restaurant_id: Option<String>,
    /// Object path in the `dishes` bucket
    pub image_path: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl FromDocument for Dish {
    const COLLECTION: &'static str = collections::DISHES;

    fn from_document(doc: &Document) -> Result<Self> {
        Ok(Dish {
            id: doc.id.clone(),
            name: doc.require_text("name")?,
            category: doc.text("category").unwrap_or_else(|| "uncategorized".to_string()),
            price: doc.f64("price").unwrap_or(0.0),
            description: doc.text("description"),
            restaurant_id: doc.text("restaurantId"),
            image_path: doc.text("imageUrl"),
            created_at: doc.timestamp("createdAt"),
        })
    }
}

// ============================================
// Videos and users
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub caption: String,
    pub uploader_id: Option<String>,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub views: i64,
}

impl FromDocument for Video {
    const COLLECTION: &'static str = collections::VIDEOS;

    fn from_document(doc: &Document) -> Result<Self> {
        Ok(Video {
            id: doc.id.clone(),
            caption: doc
                .text("caption")
                .unwrap_or_else(|| "(No caption)".to_string()),
            uploader_id: doc.text("uploaderId"),
            uploaded_at: doc.timestamp("uploadedAt"),
            views: doc.f64("views").map(|v| v as i64).unwrap_or(0),
        })
    }
}

/// Role flags on a user profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    pub user: bool,
    pub business: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: Option<String>,
    pub roles: Roles,
    pub restaurant_id: Option<String>,
}

impl UserProfile {
    /// Name to show in listings, falling back to the id.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }

    /// The linked restaurant; reports cannot run without it.
    pub fn require_restaurant(&self) -> Result<&str> {
        self.restaurant_id
            .as_deref()
            .ok_or_else(|| Error::missing(collections::USERS, &self.id, "restaurantId"))
    }
}

impl FromDocument for UserProfile {
    const COLLECTION: &'static str = collections::USERS;

    fn from_document(doc: &Document) -> Result<Self> {
        let roles = doc
            .map("roles")
            .map(|roles| Roles {
                user: roles.get("user").and_then(FieldValue::as_bool).unwrap_or(false),
                business: roles
                    .get("business")
                    .and_then(FieldValue::as_bool)
                    .unwrap_or(false),
            })
            .unwrap_or_default();

        Ok(UserProfile {
            id: doc.id.clone(),
            display_name: doc.text("displayname").or_else(|| doc.text("name")),
            roles,
            restaurant_id: doc.text("restaurantId"),
        })
    }
}

// ============================================
// Applications and restaurants
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Accepted,
    Denied,
    Rejected,
    Other(String),
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Denied => "denied",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Other(s) => s,
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "pending" => ApplicationStatus::Pending,
            "approved" => ApplicationStatus::Approved,
            "accepted" => ApplicationStatus::Accepted,
            "denied" => ApplicationStatus::Denied,
            "rejected" => ApplicationStatus::Rejected,
            other => ApplicationStatus::Other(other.to_string()),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ApplicationStatus::Pending)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub barangay: String,
    pub city: String,
    pub province: String,
}

impl Address {
    pub fn one_line(&self) -> String {
        [&self.street, &self.barangay, &self.city, &self.province]
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| part.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub uploader_id: String,
    pub status: ApplicationStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub restaurant_name: Option<String>,
    pub phone: Option<String>,
    pub average_income: Option<f64>,
    pub address: Option<Address>,
    /// Applicant details copied onto the restaurant record as-is
    /// (fullName, sex, age, civilStatus, birthdate, nationality, occupation)
    pub applicant: BTreeMap<String, String>,
    #[serde(skip)]
    pub business_hours: Option<FieldValue>,
    #[serde(skip)]
    pub delivery_areas: Vec<FieldValue>,
    /// Photo key (coverURL, selfieURL, ...) to stored URL
    pub photo_urls: BTreeMap<String, String>,
    pub additional_file_urls: Vec<String>,
}

/// Applicant detail fields carried from an application to its restaurant.
pub const APPLICANT_FIELDS: [&str; 7] = [
    "fullName",
    "sex",
    "age",
    "civilStatus",
    "birthdate",
    "nationality",
    "occupation",
];

impl FromDocument for Application {
    const COLLECTION: &'static str = collections::APPLICATIONS;

    fn from_document(doc: &Document) -> Result<Self> {
        let address = doc.map("address").map(|a| {
            let part = |key: &str| {
                a.get(key)
                    .and_then(FieldValue::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            Address {
                street: part("street"),
                barangay: part("barangay"),
                city: part("city"),
                province: part("province"),
            }
        });

        let applicant = APPLICANT_FIELDS
            .iter()
            .filter_map(|key| {
                let value = match doc.get(key)? {
                    FieldValue::String(s) => s.clone(),
                    FieldValue::Integer(i) => i.to_string(),
                    FieldValue::Double(d) => d.to_string(),
                    _ => return None,
                };
                Some((key.to_string(), value))
            })
            .collect();

        let photo_urls = doc
            .map("photoURLs")
            .map(|photos| {
                photos
                    .iter()
                    .filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Application {
            id: doc.id.clone(),
            uploader_id: doc.require_text("uploaderId")?,
            status: doc
                .str("status")
                .map(ApplicationStatus::parse)
                .unwrap_or(ApplicationStatus::Pending),
            submitted_at: doc.timestamp("submittedAt"),
            restaurant_name: doc.text("restaurantName"),
            phone: doc.text("phone"),
            average_income: doc.f64("averageIncome"),
            address,
            applicant,
            business_hours: doc.get("businessHours").cloned(),
            delivery_areas: doc.array("deliveryAreas").to_vec(),
            photo_urls,
            additional_file_urls: doc
                .array("additionalFileURLs")
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub status: String,
    pub photo_urls: BTreeMap<String, String>,
    pub additional_file_urls: Vec<String>,
}

impl FromDocument for Restaurant {
    const COLLECTION: &'static str = collections::RESTAURANTS;

    fn from_document(doc: &Document) -> Result<Self> {
        Ok(Restaurant {
            id: doc.id.clone(),
            owner_id: doc.require_text("ownerId")?,
            name: doc
                .text("name")
                .unwrap_or_else(|| "Unnamed Restaurant".to_string()),
            status: doc.text("status").unwrap_or_else(|| "active".to_string()),
            photo_urls: doc
                .map("photoURLs")
                .map(|photos| {
                    photos
                        .iter()
                        .filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_string())))
                        .collect()
                })
                .unwrap_or_default(),
            additional_file_urls: doc
                .array("additionalFileURLs")
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        })
    }
}

// ============================================
// Moderation reports
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    /// Reports that lost their video reference are listed nowhere
    pub video_id: Option<String>,
    pub reason: String,
    pub additional_details: Option<String>,
    pub user_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl FromDocument for Report {
    const COLLECTION: &'static str = collections::REPORTS;

    fn from_document(doc: &Document) -> Result<Self> {
        Ok(Report {
            id: doc.id.clone(),
            video_id: doc.text("videoId"),
            reason: doc.text("reason").unwrap_or_else(|| "unspecified".to_string()),
            additional_details: doc.text("additionalDetails"),
            user_id: doc.text("userId"),
            timestamp: doc.timestamp("timestamp"),
        })
    }
}
