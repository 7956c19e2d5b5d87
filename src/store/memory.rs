// src/store/memory.rs
//
// In-process store used by tests. One mutex guards all tables, so every
// trait call is atomic the same way a single SQL statement is.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{
    Appointment, AppointmentStatus, NewAppointment, PetRow, ProductRow, ServiceRow, UserProfile,
};
use crate::policy::Scope;
use crate::store::{AppointmentStore, RangeQuery, Registry, SessionIdentity, SessionStore};

#[derive(Default)]
struct Tables {
    appointments: HashMap<Uuid, Appointment>,
    pets: HashMap<Uuid, PetRow>,
    services: HashMap<Uuid, ServiceRow>,
    products: Vec<ProductRow>,
    users: HashMap<Uuid, UserProfile>,
    sessions: HashMap<String, SessionIdentity>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

fn sorted_by_date(mut list: Vec<Appointment>) -> Vec<Appointment> {
    list.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.appointment_id.cmp(&b.appointment_id))
    });
    list
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, CoreError> {
        self.tables
            .lock()
            .map_err(|_| CoreError::Store("memory store poisoned".into()))
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    /* -------- seeding -------- */

    pub fn add_user(&self, name: &str) -> Uuid {
        let user_id = Uuid::new_v4();
        self.tables().users.insert(
            user_id,
            UserProfile {
                user_id,
                name: name.to_string(),
                email: format!("{}@petshop.test", name.to_lowercase()),
            },
        );
        user_id
    }

    pub fn add_pet(&self, owner_id: Uuid, name: &str) -> Uuid {
        let pet_id = Uuid::new_v4();
        self.tables().pets.insert(
            pet_id,
            PetRow {
                pet_id,
                owner_id,
                name: name.to_string(),
                species: "dog".to_string(),
            },
        );
        pet_id
    }

    pub fn add_service(&self, name: &str, price_cents: i64) -> Uuid {
        let service_id = Uuid::new_v4();
        self.tables().services.insert(
            service_id,
            ServiceRow {
                service_id,
                name: name.to_string(),
                price_cents,
                duration_min: 60,
            },
        );
        service_id
    }

    pub fn set_service_price(&self, service_id: Uuid, price_cents: i64) {
        if let Some(svc) = self.tables().services.get_mut(&service_id) {
            svc.price_cents = price_cents;
        }
    }

    pub fn add_product(&self, name: &str, price_cents: i64, stock: i32) -> Uuid {
        let product_id = Uuid::new_v4();
        self.tables().products.push(ProductRow {
            product_id,
            name: name.to_string(),
            price_cents,
            stock,
        });
        product_id
    }

    pub fn add_session(&self, token_hash: &str, user_id: Uuid, role_code: i16) {
        self.tables().sessions.insert(
            token_hash.to_string(),
            SessionIdentity {
                session_token_id: Uuid::new_v4(),
                user_id,
                role_code,
            },
        );
    }

    /// Inserts a record as-is, bypassing the slot check. Used to stage
    /// historical data for report tests.
    pub fn insert_raw(
        &self,
        new: NewAppointment,
        status: AppointmentStatus,
    ) -> Appointment {
        let now = Utc::now();
        let appointment = Appointment {
            appointment_id: Uuid::new_v4(),
            pet_id: new.pet_id,
            service_id: new.service_id,
            user_id: new.user_id,
            date: new.date,
            status,
            created_at: now,
            updated_at: now,
        };
        self.tables()
            .appointments
            .insert(appointment.appointment_id, appointment.clone());
        appointment
    }

    pub fn all_appointments(&self) -> Vec<Appointment> {
        sorted_by_date(self.tables().appointments.values().cloned().collect())
    }
}

#[async_trait]
impl AppointmentStore for MemoryStore {
    async fn find_by_id(&self, appointment_id: Uuid) -> Result<Option<Appointment>, CoreError> {
        Ok(self.lock()?.appointments.get(&appointment_id).cloned())
    }

    async fn find_by_scope(&self, scope: Scope) -> Result<Vec<Appointment>, CoreError> {
        let tables = self.lock()?;
        let list = tables
            .appointments
            .values()
            .filter(|a| scope.permits(a))
            .cloned()
            .collect();
        Ok(sorted_by_date(list))
    }

    async fn find_conflicting(
        &self,
        date: DateTime<Utc>,
    ) -> Result<Option<Appointment>, CoreError> {
        Ok(self
            .lock()?
            .appointments
            .values()
            .find(|a| a.date == date && a.status.is_active())
            .cloned())
    }

    async fn create(&self, new: NewAppointment) -> Result<Appointment, CoreError> {
        let mut tables = self.lock()?;
        if tables
            .appointments
            .values()
            .any(|a| a.date == new.date && a.status.is_active())
        {
            return Err(CoreError::SlotTaken(new.date));
        }

        let now = Utc::now();
        let appointment = Appointment {
            appointment_id: Uuid::new_v4(),
            pet_id: new.pet_id,
            service_id: new.service_id,
            user_id: new.user_id,
            date: new.date,
            status: AppointmentStatus::Scheduled,
            created_at: now,
            updated_at: now,
        };
        tables
            .appointments
            .insert(appointment.appointment_id, appointment.clone());
        Ok(appointment)
    }

    async fn update_status(
        &self,
        current: &Appointment,
        status: AppointmentStatus,
    ) -> Result<Option<Appointment>, CoreError> {
        let mut tables = self.lock()?;

        let slot_clash = status.is_active()
            && tables.appointments.values().any(|a| {
                a.appointment_id != current.appointment_id
                    && a.date == current.date
                    && a.status.is_active()
            });

        let Some(stored) = tables.appointments.get_mut(&current.appointment_id) else {
            return Ok(None);
        };
        if stored.status != current.status {
            return Ok(None);
        }
        if slot_clash {
            return Err(CoreError::SlotTaken(current.date));
        }

        stored.status = status;
        stored.updated_at = Utc::now();
        Ok(Some(stored.clone()))
    }

    async fn delete(&self, appointment_id: Uuid) -> Result<bool, CoreError> {
        Ok(self.lock()?.appointments.remove(&appointment_id).is_some())
    }

    async fn find_in_range(&self, query: RangeQuery) -> Result<Vec<Appointment>, CoreError> {
        let tables = self.lock()?;
        let list = tables
            .appointments
            .values()
            .filter(|a| query.range.contains(a.date))
            .filter(|a| query.service_id.is_none_or(|id| a.service_id == id))
            .filter(|a| query.status.is_none_or(|s| a.status == s))
            .cloned()
            .collect();
        Ok(sorted_by_date(list))
    }
}

#[async_trait]
impl Registry for MemoryStore {
    async fn find_owned_pet(
        &self,
        pet_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<PetRow>, CoreError> {
        Ok(self
            .lock()?
            .pets
            .get(&pet_id)
            .filter(|p| p.owner_id == owner_id)
            .cloned())
    }

    async fn find_service(&self, service_id: Uuid) -> Result<Option<ServiceRow>, CoreError> {
        Ok(self.lock()?.services.get(&service_id).cloned())
    }

    async fn pets_by_ids(&self, ids: &[Uuid]) -> Result<Vec<PetRow>, CoreError> {
        let tables = self.lock()?;
        Ok(ids.iter().filter_map(|id| tables.pets.get(id).cloned()).collect())
    }

    async fn services_by_ids(&self, ids: &[Uuid]) -> Result<Vec<ServiceRow>, CoreError> {
        let tables = self.lock()?;
        Ok(ids
            .iter()
            .filter_map(|id| tables.services.get(id).cloned())
            .collect())
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserProfile>, CoreError> {
        let tables = self.lock()?;
        Ok(ids.iter().filter_map(|id| tables.users.get(id).cloned()).collect())
    }

    async fn list_products(&self, max_stock: Option<i32>) -> Result<Vec<ProductRow>, CoreError> {
        let mut list: Vec<ProductRow> = self
            .lock()?
            .products
            .iter()
            .filter(|p| max_stock.is_none_or(|max| p.stock <= max))
            .cloned()
            .collect();
        list.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.name.cmp(&b.name)));
        Ok(list)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn resolve_session(
        &self,
        token_hash: &str,
    ) -> Result<Option<SessionIdentity>, CoreError> {
        Ok(self.lock()?.sessions.get(token_hash).cloned())
    }
}
