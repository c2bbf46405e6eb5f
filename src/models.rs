// Data models for the club administration dashboards

use crate::record::{FieldValue, Record};
use crate::view::{Metric, StatsSpec};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn date_value(date: NaiveDate) -> FieldValue {
    FieldValue::Date(date.and_time(NaiveTime::MIN).and_utc())
}

/// Club member / platform user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub role: String,
    pub status: MemberStatus,
    pub join_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Active,
    Pending,
    Suspended,
    Banned,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Active => "active",
            MemberStatus::Pending => "pending",
            MemberStatus::Suspended => "suspended",
            MemberStatus::Banned => "banned",
        }
    }
}

impl Member {
    /// Keys exposed to filters and sorts
    pub const FIELD_NAMES: [&'static str; 6] = ["name", "username", "email", "role", "status", "joinDate"];

    /// Fields the member table searches across
    pub const SEARCH_FIELDS: [&'static str; 3] = ["name", "username", "email"];

    pub fn stats_spec() -> StatsSpec {
        StatsSpec::new()
            .with("active", Metric::count_where("status", "active"))
            .with("pending", Metric::count_where("status", "pending"))
            .with("suspended", Metric::count_where("status", "suspended"))
            .with("active_rate", Metric::rate("status", "active"))
    }
}

impl Record for Member {
    fn id(&self) -> &str {
        &self.id
    }

    fn collection_name() -> &'static str {
        "members"
    }

    fn fields(&self) -> HashMap<String, FieldValue> {
        Self::FIELD_NAMES
            .iter()
            .filter_map(|name| self.field(name).map(|v| (name.to_string(), v)))
            .collect()
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        let value = match name {
            "name" => FieldValue::from(self.name.as_str()),
            "username" => FieldValue::from(self.username.as_str()),
            "email" => FieldValue::from(self.email.as_str()),
            "role" => FieldValue::from(self.role.as_str()),
            "status" => FieldValue::from(self.status.as_str()),
            "joinDate" => date_value(self.join_date),
            _ => return None,
        };
        Some(value)
    }
}

/// Club sponsor and its contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sponsor {
    pub id: String,
    pub name: String,
    pub contact_email: String,
    pub tier: SponsorTier,
    pub status: SponsorStatus,
    pub amount: f64,
    pub contract_end: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SponsorTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl SponsorTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SponsorTier::Bronze => "bronze",
            SponsorTier::Silver => "silver",
            SponsorTier::Gold => "gold",
            SponsorTier::Platinum => "platinum",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SponsorStatus {
    Active,
    Pending,
    Expired,
}

impl SponsorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SponsorStatus::Active => "active",
            SponsorStatus::Pending => "pending",
            SponsorStatus::Expired => "expired",
        }
    }
}

impl Sponsor {
    /// Keys exposed to filters and sorts
    pub const FIELD_NAMES: [&'static str; 6] = ["name", "contactEmail", "tier", "status", "amount", "contractEnd"];

    pub const SEARCH_FIELDS: [&'static str; 2] = ["name", "contactEmail"];

    pub fn stats_spec() -> StatsSpec {
        StatsSpec::new()
            .with("active", Metric::count_where("status", "active"))
            .with("expired", Metric::count_where("status", "expired"))
            .with("active_value", Metric::sum_where("amount", "status", "active"))
            .with("average_value", Metric::average("amount"))
    }
}

impl Record for Sponsor {
    fn id(&self) -> &str {
        &self.id
    }

    fn collection_name() -> &'static str {
        "sponsors"
    }

    fn fields(&self) -> HashMap<String, FieldValue> {
        Self::FIELD_NAMES
            .iter()
            .filter_map(|name| self.field(name).map(|v| (name.to_string(), v)))
            .collect()
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        let value = match name {
            "name" => FieldValue::from(self.name.as_str()),
            "contactEmail" => FieldValue::from(self.contact_email.as_str()),
            "tier" => FieldValue::from(self.tier.as_str()),
            "status" => FieldValue::from(self.status.as_str()),
            "amount" => FieldValue::Float(self.amount),
            "contractEnd" => date_value(self.contract_end?),
            _ => return None,
        };
        Some(value)
    }
}

/// Ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub payer: String,
    pub description: String,
    pub amount: f64,
    pub method: String,
    pub status: PaymentStatus,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Completed,
    Pending,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Completed => "completed",
            PaymentStatus::Pending => "pending",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl Payment {
    /// Keys exposed to filters and sorts
    pub const FIELD_NAMES: [&'static str; 6] = ["payer", "description", "amount", "method", "status", "paidAt"];

    pub const SEARCH_FIELDS: [&'static str; 2] = ["payer", "description"];

    pub fn stats_spec() -> StatsSpec {
        StatsSpec::new()
            .with("revenue", Metric::sum_where("amount", "status", "completed"))
            .with("pending", Metric::count_where("status", "pending"))
            .with("failed", Metric::count_where("status", "failed"))
            .with("refunded_amount", Metric::sum_where("amount", "status", "refunded"))
            .with("success_rate", Metric::rate("status", "completed"))
    }
}

impl Record for Payment {
    fn id(&self) -> &str {
        &self.id
    }

    fn collection_name() -> &'static str {
        "payments"
    }

    fn fields(&self) -> HashMap<String, FieldValue> {
        Self::FIELD_NAMES
            .iter()
            .filter_map(|name| self.field(name).map(|v| (name.to_string(), v)))
            .collect()
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        let value = match name {
            "payer" => FieldValue::from(self.payer.as_str()),
            "description" => FieldValue::from(self.description.as_str()),
            "amount" => FieldValue::Float(self.amount),
            "method" => FieldValue::from(self.method.as_str()),
            "status" => FieldValue::from(self.status.as_str()),
            "paidAt" => FieldValue::Date(self.paid_at),
            _ => return None,
        };
        Some(value)
    }
}

/// Marketplace listing awaiting or past moderation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceItem {
    pub id: String,
    pub title: String,
    pub seller: String,
    pub category: String,
    pub price: f64,
    pub status: ListingStatus,
    pub listed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Pending,
    Approved,
    Rejected,
    Sold,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Pending => "pending",
            ListingStatus::Approved => "approved",
            ListingStatus::Rejected => "rejected",
            ListingStatus::Sold => "sold",
        }
    }
}

impl MarketplaceItem {
    /// Keys exposed to filters and sorts
    pub const FIELD_NAMES: [&'static str; 6] = ["title", "seller", "category", "price", "status", "listedAt"];

    pub const SEARCH_FIELDS: [&'static str; 3] = ["title", "seller", "category"];

    pub fn stats_spec() -> StatsSpec {
        StatsSpec::new()
            .with("pending", Metric::count_where("status", "pending"))
            .with("approved", Metric::count_where("status", "approved"))
            .with("rejected", Metric::count_where("status", "rejected"))
            .with("sold_value", Metric::sum_where("price", "status", "sold"))
    }
}

impl Record for MarketplaceItem {
    fn id(&self) -> &str {
        &self.id
    }

    fn collection_name() -> &'static str {
        "marketplace_items"
    }

    fn fields(&self) -> HashMap<String, FieldValue> {
        Self::FIELD_NAMES
            .iter()
            .filter_map(|name| self.field(name).map(|v| (name.to_string(), v)))
            .collect()
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        let value = match name {
            "title" => FieldValue::from(self.title.as_str()),
            "seller" => FieldValue::from(self.seller.as_str()),
            "category" => FieldValue::from(self.category.as_str()),
            "price" => FieldValue::Float(self.price),
            "status" => FieldValue::from(self.status.as_str()),
            "listedAt" => FieldValue::Date(self.listed_at),
            _ => return None,
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterRule, FilterSpec};
    use crate::sort::SortSpec;
    use crate::view::{compute_stats, compute_view, compute_view_at};
    use chrono::TimeZone;

    fn member(id: &str, name: &str, status: MemberStatus, joined: (i32, u32, u32)) -> Member {
        Member {
            id: id.to_string(),
            name: name.to_string(),
            username: name.to_lowercase().replace(' ', "."),
            email: format!("{}@club.test", id),
            role: "member".to_string(),
            status,
            join_date: NaiveDate::from_ymd_opt(joined.0, joined.1, joined.2).unwrap(),
        }
    }

    fn payment(id: &str, amount: f64, status: PaymentStatus) -> Payment {
        Payment {
            id: id.to_string(),
            payer: "Jo".to_string(),
            description: "Season ticket".to_string(),
            amount,
            method: "card".to_string(),
            status,
            paid_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_field_lookup_matches_field_map() {
        let m = member("1", "Ann Lee", MemberStatus::Pending, (2024, 1, 1));
        let all = m.fields();
        assert_eq!(all.len(), Member::FIELD_NAMES.len());
        for name in Member::FIELD_NAMES {
            assert_eq!(m.field(name).as_ref(), all.get(name));
        }
        assert_eq!(m.field("status"), Some(FieldValue::from("pending")));
        assert!(m.field("id").is_none());
        assert!(m.field("unknown").is_none());

        let p = payment("p1", 10.0, PaymentStatus::Completed);
        assert_eq!(p.field("amount"), Some(FieldValue::Float(10.0)));
        assert_eq!(p.fields().len(), Payment::FIELD_NAMES.len());
    }

    #[test]
    fn test_member_status_serialization() {
        let json = serde_json::to_string(&MemberStatus::Suspended).unwrap();
        assert_eq!(json, "\"suspended\"");
    }

    #[test]
    fn test_member_serializes_camel_case() {
        let m = member("1", "Ann Lee", MemberStatus::Active, (2024, 1, 1));
        let value = serde_json::to_value(&m).unwrap();
        assert_eq!(value["joinDate"], "2024-01-01");
        let back: Member = serde_json::from_value(value).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_members_filtered_and_sorted_by_join_date() {
        let members = vec![
            member("1", "Ann", MemberStatus::Active, (2024, 1, 1)),
            member("2", "Ben", MemberStatus::Suspended, (2024, 1, 10)),
            member("3", "Cat", MemberStatus::Active, (2024, 1, 5)),
        ];
        let filter = FilterSpec::new().with("status", FilterRule::exact("active"));
        let view = compute_view(&members, &filter, Some(&SortSpec::desc("joinDate")));
        let ids: Vec<&str> = view.iter().map(|m| m.id()).collect();
        assert_eq!(ids, vec!["3", "1"]);
    }

    #[test]
    fn test_member_search_fields() {
        let members = vec![
            member("1", "Ann", MemberStatus::Active, (2024, 1, 1)),
            member("johnsclub", "Zed", MemberStatus::Active, (2024, 1, 1)),
        ];
        let filter = FilterSpec::new().with("search", FilterRule::text("JOHN", Member::SEARCH_FIELDS));
        let view = compute_view(&members, &filter, None);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, "johnsclub");
    }

    #[test]
    fn test_payment_stats() {
        let payments = vec![
            payment("p1", 100.0, PaymentStatus::Completed),
            payment("p2", 40.0, PaymentStatus::Pending),
            payment("p3", 60.0, PaymentStatus::Completed),
            payment("p4", 25.0, PaymentStatus::Refunded),
        ];
        let stats = compute_stats(&payments, &Payment::stats_spec());
        assert_eq!(stats.get("count"), 4.0);
        assert_eq!(stats.get("revenue"), 160.0);
        assert_eq!(stats.get("pending"), 1.0);
        assert_eq!(stats.get("failed"), 0.0);
        assert_eq!(stats.get("refunded_amount"), 25.0);
        assert_eq!(stats.get("success_rate"), 50.0);
    }

    #[test]
    fn test_sponsors_expiring_within_days() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let sponsor = |id: &str, end: Option<(i32, u32, u32)>| Sponsor {
            id: id.to_string(),
            name: format!("Sponsor {}", id),
            contact_email: format!("{}@sponsor.test", id),
            tier: SponsorTier::Gold,
            status: SponsorStatus::Active,
            amount: 5000.0,
            contract_end: end.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
        };
        let sponsors = vec![
            sponsor("a", Some((2024, 5, 20))),
            sponsor("b", Some((2024, 8, 1))),
            sponsor("c", None),
            sponsor("d", Some((2024, 4, 1))),
        ];
        let filter = FilterSpec::new().with("contractEnd", FilterRule::within_days(30));
        let view = compute_view_at(&sponsors, &filter, None, now);
        let ids: Vec<&str> = view.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn test_marketplace_moderation_queue() {
        let item = |id: &str, price: f64, status: ListingStatus| MarketplaceItem {
            id: id.to_string(),
            title: format!("Item {}", id),
            seller: "club-shop".to_string(),
            category: "kit".to_string(),
            price,
            status,
            listed_at: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        };
        let items = vec![
            item("i1", 20.0, ListingStatus::Pending),
            item("i2", 80.0, ListingStatus::Sold),
            item("i3", 15.0, ListingStatus::Pending),
        ];
        let filter = FilterSpec::new().with("status", FilterRule::exact("pending"));
        let view = compute_view(&items, &filter, Some(&SortSpec::asc("price")));
        let ids: Vec<&str> = view.iter().map(|i| i.id()).collect();
        assert_eq!(ids, vec!["i3", "i1"]);

        let stats = compute_stats(&items, &MarketplaceItem::stats_spec());
        assert_eq!(stats.get("pending"), 2.0);
        assert_eq!(stats.get("sold_value"), 80.0);
    }
}
