// src/reports.rs
//
// Operational reports, recomputed on every request from current appointment
// and product state. Aggregation is split into pure `summarize_*` functions
// so the arithmetic can be checked without a store.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{Actor, Appointment, AppointmentStatus, DateRange, ProductRow};
use crate::policy::{self, Projection};
use crate::projection::{project, AppointmentView};
use crate::store::{AppointmentStore, RangeQuery, Registry};

/* ============================================================
   Request
   ============================================================ */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    #[serde(alias = "APPOINTMENTS")]
    Appointments,
    #[serde(alias = "PRODUCTS")]
    Products,
    #[serde(alias = "REVENUE")]
    Revenue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportRequest {
    #[serde(rename = "type")]
    pub report_type: ReportType,
    #[serde(alias = "startDate")]
    pub start_date: String,
    #[serde(alias = "endDate")]
    pub end_date: String,
    #[serde(default, alias = "serviceId")]
    pub service_id: Option<Uuid>,
    #[serde(default, alias = "lowStock")]
    pub low_stock: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Start,
    End,
}

/// RFC 3339 instant, or a bare `YYYY-MM-DD` that covers the whole day.
fn parse_bound(raw: &str, bound: Bound) -> Result<DateTime<Utc>, CoreError> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }

    let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        CoreError::Validation(format!("'{raw}' is neither an RFC 3339 instant nor YYYY-MM-DD"))
    })?;
    let naive = match bound {
        Bound::Start => day.and_hms_opt(0, 0, 0),
        Bound::End => day.and_hms_nano_opt(23, 59, 59, 999_999_999),
    }
    .ok_or_else(|| CoreError::Validation(format!("invalid date '{raw}'")))?;

    Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

impl ReportRequest {
    pub fn period(&self) -> Result<DateRange, CoreError> {
        DateRange::new(
            parse_bound(&self.start_date, Bound::Start)?,
            parse_bound(&self.end_date, Bound::End)?,
        )
    }
}

/* ============================================================
   Results
   ============================================================ */

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReportResult {
    Appointments(AppointmentsReport),
    Products(ProductsReport),
    Revenue(RevenueReport),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub scheduled: usize,
    pub confirmed: usize,
    pub completed: usize,
    pub cancelled: usize,
}

impl StatusCounts {
    pub fn sum(&self) -> usize {
        self.scheduled + self.confirmed + self.completed + self.cancelled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AppointmentSummary {
    pub total: usize,
    pub by_status: StatusCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppointmentsReport {
    pub period: DateRange,
    pub summary: AppointmentSummary,
    pub details: Vec<AppointmentView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProductSummary {
    pub total: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
    pub total_value_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductsReport {
    pub period: DateRange,
    pub summary: ProductSummary,
    pub details: Vec<ProductRow>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ServiceRevenue {
    pub count: usize,
    pub revenue_cents: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RevenueSummary {
    pub total_revenue_cents: i64,
    pub total_appointments: usize,
    pub average_ticket_cents: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevenueReport {
    pub period: DateRange,
    pub summary: RevenueSummary,
    pub revenue_by_service: BTreeMap<String, ServiceRevenue>,
    pub details: Vec<AppointmentView>,
}

/* ============================================================
   Aggregation
   ============================================================ */

pub fn summarize_appointments(appointments: &[Appointment]) -> AppointmentSummary {
    let mut by_status = StatusCounts::default();
    for a in appointments {
        match a.status {
            AppointmentStatus::Scheduled => by_status.scheduled += 1,
            AppointmentStatus::Confirmed => by_status.confirmed += 1,
            AppointmentStatus::Completed => by_status.completed += 1,
            AppointmentStatus::Cancelled => by_status.cancelled += 1,
        }
    }
    debug_assert_eq!(by_status.sum(), appointments.len());
    AppointmentSummary { total: appointments.len(), by_status }
}

/// Counts are taken over `products` as given, i.e. after any low-stock filter.
pub fn summarize_products(products: &[ProductRow], low_stock_threshold: i32) -> ProductSummary {
    ProductSummary {
        total: products.len(),
        low_stock: products.iter().filter(|p| p.stock <= low_stock_threshold).count(),
        out_of_stock: products.iter().filter(|p| p.stock == 0).count(),
        total_value_cents: products
            .iter()
            .map(|p| p.price_cents * i64::from(p.stock))
            .sum(),
    }
}

const UNKNOWN_SERVICE: &str = "(unknown service)";

/// Groups by service name at today's price; there is no price history.
pub fn summarize_revenue(
    completed: &[AppointmentView],
) -> (RevenueSummary, BTreeMap<String, ServiceRevenue>) {
    let mut by_service: BTreeMap<String, ServiceRevenue> = BTreeMap::new();
    let mut total_revenue_cents = 0i64;

    for view in completed {
        let (name, price) = match &view.service {
            Some(s) => (s.name.as_str(), s.price_cents),
            None => (UNKNOWN_SERVICE, 0),
        };
        let entry = by_service.entry(name.to_string()).or_default();
        entry.count += 1;
        entry.revenue_cents += price;
        total_revenue_cents += price;
    }

    let total_appointments = completed.len();
    let average_ticket_cents = total_revenue_cents as f64 / total_appointments.max(1) as f64;

    (
        RevenueSummary { total_revenue_cents, total_appointments, average_ticket_cents },
        by_service,
    )
}

/* ============================================================
   Generation
   ============================================================ */

pub async fn generate_report(
    store: &dyn AppointmentStore,
    registry: &dyn Registry,
    low_stock_threshold: i32,
    actor: &Actor,
    req: ReportRequest,
) -> Result<ReportResult, CoreError> {
    policy::ensure(policy::can_view_reports(actor.role), "generate reports")?;
    let period = req.period()?;

    tracing::debug!(
        report = ?req.report_type,
        start = %period.start_date,
        end = %period.end_date,
        service_id = ?req.service_id,
        low_stock = ?req.low_stock,
        "generating report"
    );

    match req.report_type {
        ReportType::Appointments => {
            let appointments = store
                .find_in_range(RangeQuery { range: period, service_id: req.service_id, status: None })
                .await?;
            debug_assert!(appointments.iter().all(|a| period.contains(a.date)));
            let summary = summarize_appointments(&appointments);
            let details = project(registry, appointments, Projection::STAFF_VIEW).await?;
            Ok(ReportResult::Appointments(AppointmentsReport { period, summary, details }))
        }
        ReportType::Products => {
            let max_stock = req.low_stock.unwrap_or(false).then_some(low_stock_threshold);
            let products = registry.list_products(max_stock).await?;
            let summary = summarize_products(&products, low_stock_threshold);
            Ok(ReportResult::Products(ProductsReport { period, summary, details: products }))
        }
        ReportType::Revenue => {
            let completed = store
                .find_in_range(RangeQuery {
                    range: period,
                    service_id: req.service_id,
                    status: Some(AppointmentStatus::Completed),
                })
                .await?;
            let details = project(registry, completed, Projection::SERVICE_ONLY).await?;
            let (summary, revenue_by_service) = summarize_revenue(&details);
            Ok(ReportResult::Revenue(RevenueReport {
                period,
                summary,
                revenue_by_service,
                details,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    use crate::models::{NewAppointment, Role};
    use crate::store::memory::MemoryStore;

    use crate::models::AppointmentStatus::*;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn request(kind: ReportType, start: &str, end: &str) -> ReportRequest {
        ReportRequest {
            report_type: kind,
            start_date: start.into(),
            end_date: end.into(),
            service_id: None,
            low_stock: None,
        }
    }

    fn staff() -> Actor {
        Actor::new(Uuid::new_v4(), Some(Role::Employee))
    }

    struct Shop {
        store: MemoryStore,
        bath: Uuid,
        groom: Uuid,
    }

    fn shop() -> Shop {
        let store = MemoryStore::new();
        let owner = store.add_user("Ana");
        let pet_id = store.add_pet(owner, "Rex");
        let bath = store.add_service("Bath", 5_000);
        let groom = store.add_service("Grooming", 8_000);

        let rows = [
            (bath, at(1, 9), Completed),
            (bath, at(2, 9), Completed),
            (groom, at(3, 9), Completed),
            (groom, at(4, 9), Cancelled),
            (bath, at(5, 9), Scheduled),
            (groom, at(6, 9), Confirmed),
            // outside March 1..10
            (bath, at(20, 9), Completed),
        ];
        for (service_id, date, status) in rows {
            store.insert_raw(NewAppointment { pet_id, service_id, user_id: owner, date }, status);
        }
        Shop { store, bath, groom }
    }

    #[test]
    fn bare_dates_cover_whole_days() {
        let req = request(ReportType::Appointments, "2024-03-01", "2024-03-10");
        let period = req.period().unwrap();
        assert_eq!(period.start_date, at(1, 0));
        assert!(period.contains(at(10, 23) + Duration::minutes(59)));
        assert!(!period.contains(at(11, 0)));
    }

    #[tokio::test]
    async fn bare_end_date_includes_appointments_later_that_day() {
        let s = shop();
        let owner = s.store.add_user("Bia");
        let pet_id = s.store.add_pet(owner, "Mia");
        let midday = at(10, 12);
        s.store.insert_raw(
            NewAppointment { pet_id, service_id: s.bath, user_id: owner, date: midday },
            Completed,
        );

        let ReportResult::Appointments(r) = generate_report(
            &s.store,
            &s.store,
            10,
            &staff(),
            request(ReportType::Appointments, "2024-03-10", "2024-03-10"),
        )
        .await
        .unwrap() else {
            panic!("wrong report type")
        };

        assert_eq!(r.summary.total, 1);
        assert_eq!(r.details[0].appointment.date, midday);

        // An explicit midnight instant keeps the narrower window.
        let ReportResult::Appointments(r) = generate_report(
            &s.store,
            &s.store,
            10,
            &staff(),
            request(ReportType::Appointments, "2024-03-10", "2024-03-10T00:00:00Z"),
        )
        .await
        .unwrap() else {
            panic!("wrong report type")
        };
        assert_eq!(r.summary.total, 0);
    }

    #[test]
    fn instants_are_taken_verbatim_and_bad_input_is_rejected() {
        let req = request(ReportType::Revenue, "2024-03-01T10:00:00Z", "2024-03-01T12:00:00+02:00");
        let period = req.period().unwrap();
        assert_eq!(period.start_date, at(1, 10));
        assert_eq!(period.end_date, at(1, 10));

        let bad = request(ReportType::Revenue, "yesterday", "2024-03-01");
        assert!(matches!(bad.period(), Err(CoreError::Validation(_))));

        let inverted = request(ReportType::Revenue, "2024-03-10", "2024-03-01");
        assert!(matches!(inverted.period(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn request_accepts_camel_case_and_uppercase_type() {
        let req: ReportRequest = serde_json::from_str(
            r#"{"type":"PRODUCTS","startDate":"2024-03-01","endDate":"2024-03-02","lowStock":true}"#,
        )
        .unwrap();
        assert_eq!(req.report_type, ReportType::Products);
        assert_eq!(req.low_stock, Some(true));
    }

    #[tokio::test]
    async fn appointment_counts_partition_the_total() {
        let s = shop();
        let report = generate_report(
            &s.store,
            &s.store,
            10,
            &staff(),
            request(ReportType::Appointments, "2024-03-01", "2024-03-10"),
        )
        .await
        .unwrap();

        let ReportResult::Appointments(r) = report else { panic!("wrong report type") };
        assert_eq!(r.summary.total, 6);
        assert_eq!(r.summary.total, r.summary.by_status.sum());
        assert_eq!(
            r.summary.by_status,
            StatusCounts { scheduled: 1, confirmed: 1, completed: 3, cancelled: 1 }
        );
        assert!(r.details.windows(2).all(|w| w[0].appointment.date <= w[1].appointment.date));
        assert!(r.details.iter().all(|d| d.user.is_some()));
    }

    #[tokio::test]
    async fn appointment_report_filters_by_service() {
        let s = shop();
        let mut req = request(ReportType::Appointments, "2024-03-01", "2024-03-31");
        req.service_id = Some(s.groom);
        let ReportResult::Appointments(r) =
            generate_report(&s.store, &s.store, 10, &staff(), req).await.unwrap()
        else {
            panic!("wrong report type")
        };
        assert_eq!(r.summary.total, 3);
        assert!(r.details.iter().all(|d| d.appointment.service_id == s.groom));
    }

    #[tokio::test]
    async fn revenue_sums_completed_at_current_price() {
        let s = shop();
        // Price changes after the fact apply retroactively.
        s.store.set_service_price(s.bath, 6_000);

        let ReportResult::Revenue(r) = generate_report(
            &s.store,
            &s.store,
            10,
            &staff(),
            request(ReportType::Revenue, "2024-03-01", "2024-03-10"),
        )
        .await
        .unwrap() else {
            panic!("wrong report type")
        };

        assert_eq!(r.summary.total_appointments, 3);
        assert_eq!(r.summary.total_revenue_cents, 6_000 * 2 + 8_000);
        assert_eq!(r.revenue_by_service["Bath"], ServiceRevenue { count: 2, revenue_cents: 12_000 });
        assert_eq!(r.revenue_by_service["Grooming"], ServiceRevenue { count: 1, revenue_cents: 8_000 });

        let by_service: i64 = r.revenue_by_service.values().map(|v| v.revenue_cents).sum();
        assert_eq!(by_service, r.summary.total_revenue_cents);
        assert!((r.summary.average_ticket_cents - 20_000.0 / 3.0).abs() < 1e-9);
        assert!(r.details.iter().all(|d| d.pet.is_none() && d.service.is_some()));
    }

    #[tokio::test]
    async fn empty_revenue_divides_by_one() {
        let s = shop();
        let ReportResult::Revenue(r) = generate_report(
            &s.store,
            &s.store,
            10,
            &staff(),
            request(ReportType::Revenue, "2023-01-01", "2023-12-31"),
        )
        .await
        .unwrap() else {
            panic!("wrong report type")
        };
        assert_eq!(r.summary.total_appointments, 0);
        assert_eq!(r.summary.total_revenue_cents, 0);
        assert_eq!(r.summary.average_ticket_cents, 0.0);
        assert!(r.revenue_by_service.is_empty());
    }

    #[test]
    fn revenue_groups_missing_service_without_breaking_identity() {
        let now = Utc::now();
        let orphan = AppointmentView {
            appointment: Appointment {
                appointment_id: Uuid::new_v4(),
                pet_id: Uuid::new_v4(),
                service_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                date: now,
                status: Completed,
                created_at: now,
                updated_at: now,
            },
            pet: None,
            service: None,
            user: None,
        };
        let (summary, by_service) = summarize_revenue(&[orphan]);
        assert_eq!(summary.total_appointments, 1);
        assert_eq!(summary.total_revenue_cents, 0);
        assert_eq!(by_service[UNKNOWN_SERVICE].count, 1);
    }

    fn stocked() -> MemoryStore {
        let store = MemoryStore::new();
        store.add_product("Kibble", 2_000, 5);
        store.add_product("Leash", 1_500, 20);
        store.add_product("Collar", 1_000, 0);
        store
    }

    #[tokio::test]
    async fn products_report_without_filter_counts_everything() {
        let store = stocked();
        let ReportResult::Products(r) = generate_report(
            &store,
            &store,
            10,
            &staff(),
            request(ReportType::Products, "2024-03-01", "2024-03-31"),
        )
        .await
        .unwrap() else {
            panic!("wrong report type")
        };

        assert_eq!(
            r.summary,
            ProductSummary {
                total: 3,
                low_stock: 2,
                out_of_stock: 1,
                total_value_cents: 2_000 * 5 + 1_500 * 20,
            }
        );
        let names: Vec<_> = r.details.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Collar", "Kibble", "Leash"]);
    }

    #[tokio::test]
    async fn products_report_with_low_stock_counts_after_filtering() {
        let store = stocked();
        let mut req = request(ReportType::Products, "2024-03-01", "2024-03-31");
        req.low_stock = Some(true);
        let ReportResult::Products(r) =
            generate_report(&store, &store, 10, &staff(), req).await.unwrap()
        else {
            panic!("wrong report type")
        };

        assert_eq!(
            r.summary,
            ProductSummary { total: 2, low_stock: 2, out_of_stock: 1, total_value_cents: 10_000 }
        );
        assert!(r.details.iter().all(|p| p.stock <= 10));
    }

    async fn revenue_json(s: &Shop) -> serde_json::Value {
        let r = generate_report(
            &s.store,
            &s.store,
            10,
            &staff(),
            request(ReportType::Revenue, "2024-03-01", "2024-03-31"),
        )
        .await
        .unwrap();
        serde_json::to_value(&r).unwrap()
    }

    #[tokio::test]
    async fn reports_are_deterministic_and_staff_only() {
        let s = shop();
        let first = revenue_json(&s).await;
        assert_eq!(first, revenue_json(&s).await);
        assert_eq!(first["type"], "revenue");
        assert_eq!(first["summary"]["total_appointments"], 4);

        let err = generate_report(
            &s.store,
            &s.store,
            10,
            &Actor::new(Uuid::new_v4(), Some(Role::Client)),
            request(ReportType::Revenue, "2024-03-01", "2024-03-31"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
    }
}
