//! Restaurant applications
//!
//! Accepting an application turns it into a restaurant: the record is
//! created, the applicant's uploaded files are copied into the restaurant's
//! storage folder and the applicant becomes a business owner. Only creating
//! the restaurant is fatal; every later step is logged and skipped on
//! failure so a half-copied application never blocks the rest.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::storage::{buckets, content_type_for, relative_path, ObjectStorage};
use crate::store::{collections, fields, Direction, FieldValue, Fields, Query};
use crate::types::{Application, ApplicationStatus, APPLICANT_FIELDS};

/// Photo slots copied from an application to its restaurant.
pub const PHOTO_KEYS: [&str; 5] = [
    "coverURL",
    "selfieURL",
    "validIdURL",
    "selfieWithValidIdURL",
    "displayURL",
];

/// Applications, newest first.
pub async fn list_applications(fetcher: &Fetcher<'_>) -> Result<Vec<Application>> {
    fetcher
        .fetch_query(
            Query::new(collections::APPLICATIONS).order_by("submittedAt", Direction::Descending),
        )
        .await
}

pub async fn set_application_status(
    fetcher: &Fetcher<'_>,
    application_id: &str,
    status: &ApplicationStatus,
) -> Result<()> {
    fetcher
        .store()
        .update(
            fetcher.session(),
            collections::APPLICATIONS,
            application_id,
            fields([("status", FieldValue::from(status.as_str()))]),
        )
        .await?;
    tracing::info!(application_id = %application_id, status = %status.as_str(), "Updated application status");
    Ok(())
}

/// What accepting an application did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcceptOutcome {
    pub restaurant_id: String,
    pub owner_id: String,
    /// Photo key to public URL in the restaurants bucket
    pub photo_urls: BTreeMap<String, String>,
    pub additional_file_urls: Vec<String>,
    /// Files that could not be copied
    pub skipped_files: Vec<String>,
    pub application_updated: bool,
    pub owner_updated: bool,
}

/// Accept `application_id` and create its restaurant.
pub async fn accept_application(
    fetcher: &Fetcher<'_>,
    storage: &dyn ObjectStorage,
    application_id: &str,
) -> Result<AcceptOutcome> {
    let application: Application =
        fetcher
            .get(application_id)
            .await?
            .ok_or_else(|| Error::NotFound {
                collection: collections::APPLICATIONS.to_string(),
                id: application_id.to_string(),
            })?;

    let store = fetcher.store();
    let session = fetcher.session();

    let restaurant_id = store
        .create(session, collections::RESTAURANTS, restaurant_fields(&application))
        .await?;
    tracing::info!(
        application_id = %application_id,
        restaurant_id = %restaurant_id,
        "Created restaurant from application"
    );

    let mut skipped_files = Vec::new();

    let mut photo_urls = BTreeMap::new();
    for key in PHOTO_KEYS {
        let Some(source) = application.photo_urls.get(key) else {
            continue;
        };
        let destination = format!("{}/{}", restaurant_id, key);
        match copy_file(storage, source, &destination).await {
            Ok(url) => {
                photo_urls.insert(key.to_string(), url);
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Skipped photo");
                skipped_files.push(key.to_string());
            }
        }
    }

    let mut additional_file_urls = Vec::new();
    for (i, source) in application.additional_file_urls.iter().enumerate() {
        let destination = format!("{}/proof{}", restaurant_id, i);
        match copy_file(storage, source, &destination).await {
            Ok(url) => additional_file_urls.push(url),
            Err(e) => {
                tracing::warn!(index = i, error = %e, "Skipped additional file");
                skipped_files.push(format!("proof{}", i));
            }
        }
    }

    let mut urls = Fields::new();
    urls.insert(
        "photoURLs".to_string(),
        FieldValue::Map(
            photo_urls
                .iter()
                .map(|(k, v)| (k.clone(), FieldValue::from(v.as_str())))
                .collect(),
        ),
    );
    urls.insert(
        "additionalFileURLs".to_string(),
        FieldValue::from(additional_file_urls.clone()),
    );
    store
        .update(session, collections::RESTAURANTS, &restaurant_id, urls)
        .await?;

    let application_updated = match mark_accepted(fetcher, application_id).await {
        Ok(updated) => updated,
        Err(e) => {
            tracing::error!(application_id = %application_id, error = %e, "Failed to update application status");
            false
        }
    };

    let owner = fields([
        (
            "roles",
            FieldValue::Map(fields([
                ("user", FieldValue::Bool(true)),
                ("business", FieldValue::Bool(true)),
            ])),
        ),
        ("restaurantId", FieldValue::from(restaurant_id.as_str())),
    ]);
    let owner_updated = match store
        .update(session, collections::USERS, &application.uploader_id, owner)
        .await
    {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(user_id = %application.uploader_id, error = %e, "Failed to update owner");
            false
        }
    };

    Ok(AcceptOutcome {
        restaurant_id,
        owner_id: application.uploader_id,
        photo_urls,
        additional_file_urls,
        skipped_files,
        application_updated,
        owner_updated,
    })
}

/// Set the application to accepted if it still exists.
async fn mark_accepted(fetcher: &Fetcher<'_>, application_id: &str) -> Result<bool> {
    let exists = fetcher
        .store()
        .get(fetcher.session(), collections::APPLICATIONS, application_id)
        .await?
        .is_some();
    if !exists {
        tracing::warn!(application_id = %application_id, "Application no longer exists");
        return Ok(false);
    }
    set_application_status(fetcher, application_id, &ApplicationStatus::Accepted).await?;
    Ok(true)
}

async fn copy_file(storage: &dyn ObjectStorage, source: &str, destination: &str) -> Result<String> {
    let path = relative_path(source, buckets::APPLICATIONS)
        .ok_or_else(|| Error::Storage(format!("not an application file: {}", source)))?;
    let bytes = storage.download(buckets::APPLICATIONS, &path).await?;
    storage
        .upload(buckets::RESTAURANTS, destination, bytes, content_type_for(&path))
        .await?;
    Ok(storage.public_url(buckets::RESTAURANTS, destination))
}

fn restaurant_fields(application: &Application) -> Fields {
    let mut restaurant = fields([
        ("ownerId", FieldValue::from(application.uploader_id.as_str())),
        (
            "name",
            FieldValue::from(
                application
                    .restaurant_name
                    .as_deref()
                    .unwrap_or("Unnamed Restaurant"),
            ),
        ),
        (
            "phone",
            FieldValue::from(application.phone.as_deref().unwrap_or_default()),
        ),
        (
            "averageIncome",
            FieldValue::Double(application.average_income.unwrap_or(0.0)),
        ),
        ("status", FieldValue::from("active")),
        ("createdAt", FieldValue::Timestamp(Utc::now())),
    ]);

    let address = application.address.clone().unwrap_or_default();
    restaurant.insert(
        "address".to_string(),
        FieldValue::Map(fields([
            ("street", FieldValue::from(address.street)),
            ("barangay", FieldValue::from(address.barangay)),
            ("city", FieldValue::from(address.city)),
            ("province", FieldValue::from(address.province)),
        ])),
    );

    for key in APPLICANT_FIELDS {
        let value = application.applicant.get(key).cloned().unwrap_or_default();
        restaurant.insert(key.to_string(), FieldValue::from(value));
    }

    restaurant.insert(
        "businessHours".to_string(),
        application
            .business_hours
            .clone()
            .unwrap_or_else(|| FieldValue::Map(Fields::new())),
    );
    restaurant.insert(
        "deliveryAreas".to_string(),
        FieldValue::Array(application.delivery_areas.clone()),
    );
    restaurant
}
