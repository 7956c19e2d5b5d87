// src/notify.rs
//
// Notification intents. Delivery, storage and read-state belong to the
// notification collaborator; this side only describes what happened.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::AppointmentStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentKind {
    AppointmentConfirmed,
    AppointmentCancelled,
}

impl IntentKind {
    /// COMPLETED and SCHEDULED produce no intent.
    pub fn for_status(status: AppointmentStatus) -> Option<Self> {
        match status {
            AppointmentStatus::Confirmed => Some(IntentKind::AppointmentConfirmed),
            AppointmentStatus::Cancelled => Some(IntentKind::AppointmentCancelled),
            AppointmentStatus::Scheduled | AppointmentStatus::Completed => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationIntent {
    pub kind: IntentKind,
    /// Recipient: the booking owner.
    pub user_id: Uuid,
    pub appointment_id: Uuid,
    pub date: DateTime<Utc>,
    pub service_name: Option<String>,
    pub pet_name: Option<String>,
}

impl NotificationIntent {
    pub fn title(&self) -> &'static str {
        match self.kind {
            IntentKind::AppointmentConfirmed => "Appointment confirmed",
            IntentKind::AppointmentCancelled => "Appointment cancelled",
        }
    }

    pub fn message(&self) -> String {
        let service = self.service_name.as_deref().unwrap_or("service");
        let pet = self.pet_name.as_deref().unwrap_or("your pet");
        match self.kind {
            IntentKind::AppointmentConfirmed => format!(
                "Your {service} appointment for {pet} was confirmed for {}.",
                self.date.format("%Y-%m-%d %H:%M UTC")
            ),
            IntentKind::AppointmentCancelled => {
                format!("Your {service} appointment for {pet} was cancelled.")
            }
        }
    }
}

pub trait NotificationSink: Send + Sync {
    fn emit(&self, intent: NotificationIntent);
}

/// Hands intents to the delivery collaborator as structured log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn emit(&self, intent: NotificationIntent) {
        tracing::info!(
            target: "petshop::notification",
            kind = ?intent.kind,
            user_id = %intent.user_id,
            appointment_id = %intent.appointment_id,
            title = intent.title(),
            message = %intent.message(),
            "notification intent"
        );
    }
}
