//! Standard response envelope helpers.

use crate::query::Page;
use crate::service::{BulkOutcome, UpdateOutcome};
use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: Meta,
}

#[derive(Serialize)]
pub struct Meta {
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
}

/// Acknowledgement for mutations. `no_changes` is a success, not an error.
#[derive(Serialize)]
pub struct Ack {
    pub ok: bool,
    pub message: String,
    pub no_changes: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<UpdateOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<BulkOutcome>,
}

impl Ack {
    pub fn new(message: impl Into<String>) -> Self {
        Ack {
            ok: true,
            message: message.into(),
            no_changes: false,
            outcome: None,
            counts: None,
        }
    }
}

pub fn success_one<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::CREATED, Json(SuccessOne { data }))
}

pub fn success_one_ok<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::OK, Json(SuccessOne { data }))
}

pub fn success_many<T: Serialize>(data: Vec<T>) -> (StatusCode, Json<SuccessMany<T>>) {
    let count = data.len() as u64;
    (
        StatusCode::OK,
        Json(SuccessMany {
            data,
            meta: Meta {
                count,
                page: None,
                per_page: None,
                total: None,
            },
        }),
    )
}

pub fn success_page<T: Serialize>(page: Page<T>) -> (StatusCode, Json<SuccessMany<T>>) {
    let count = page.items.len() as u64;
    (
        StatusCode::OK,
        Json(SuccessMany {
            data: page.items,
            meta: Meta {
                count,
                page: Some(page.page),
                per_page: Some(page.per_page),
                total: Some(page.total),
            },
        }),
    )
}

pub fn update_ack(entity: &str, key: &str, outcome: UpdateOutcome) -> (StatusCode, Json<Ack>) {
    let message = match outcome {
        UpdateOutcome::Updated => format!("{} '{}' updated", entity, key),
        UpdateOutcome::Created => format!("{} '{}' not found, created", entity, key),
        UpdateOutcome::NoChanges => format!("no changes for {} '{}'", entity, key),
    };
    let ack = Ack {
        no_changes: outcome.no_changes(),
        outcome: Some(outcome),
        ..Ack::new(message)
    };
    (StatusCode::OK, Json(ack))
}

pub fn bulk_ack(entity: &str, counts: BulkOutcome) -> (StatusCode, Json<Ack>) {
    let message = format!(
        "{}: {} inserted, {} updated, {} skipped",
        entity, counts.inserted, counts.updated, counts.skipped
    );
    let ack = Ack {
        counts: Some(counts),
        ..Ack::new(message)
    };
    (StatusCode::OK, Json(ack))
}
