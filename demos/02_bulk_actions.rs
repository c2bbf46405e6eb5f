//! Example 02: Bulk Actions
//!
//! This example selects records in a filtered view and applies bulk updates
//! and deletes against a JSONL collection, including a partial failure.
//!
//! Run with: cargo run --example 02_bulk_actions

use chrono::NaiveDate;
use clubview::backend::patch_from_pairs;
use clubview::models::{Member, MemberStatus};
use clubview::{Collaborator, CollectionView, FilterRule, JsonlCollaborator, Record};
use eyre::Result;

fn member(id: &str, name: &str, status: MemberStatus) -> Member {
    Member {
        id: id.to_string(),
        name: name.to_string(),
        username: name.to_lowercase(),
        email: format!("{}@club.test", name.to_lowercase()),
        role: "member".to_string(),
        status,
        join_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap_or_default(),
    }
}

fn main() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;

    println!("Bulk Actions Example");
    println!("====================\n");

    let backend = JsonlCollaborator::<Member>::open(temp_dir.path())?;
    println!("Collection file: {}\n", backend.path().display());
    for (id, name, status) in [
        ("m1", "Ann", MemberStatus::Pending),
        ("m2", "Ben", MemberStatus::Pending),
        ("m3", "Cat", MemberStatus::Active),
        ("m4", "Dan", MemberStatus::Pending),
    ] {
        backend.insert(&member(id, name, status))?;
    }

    let mut view = CollectionView::new(backend);
    view.refresh()?;

    println!("1. Select every pending member:");
    view.set_rule("status", FilterRule::exact("pending"));
    view.select_all_in_view();
    println!("   selected: {:?}", view.selected_ids());

    println!("\n2. Approve the selection:");
    let patch = patch_from_pairs(["status=active"])?;
    let outcome = view.bulk_update_selected(&patch);
    println!(
        "   {} updated, {} failed",
        outcome.succeeded_count(),
        outcome.failed_count()
    );

    // The filter is re-evaluated against the updated store
    println!("   still pending: {}", view.view().len());

    println!("\n3. Delete m1, m3 and a record that does not exist:");
    view.clear_rule("status");
    view.select_all_in_view();
    let ids = vec!["m1".to_string(), "m3".to_string(), "m9".to_string()];
    let outcome = view.bulk_remove(&ids);
    println!(
        "   {} deleted, {} failed",
        outcome.succeeded_count(),
        outcome.failed_count()
    );
    for failure in &outcome.failed {
        println!("   failed {}: {}", failure.id, failure.reason);
    }
    println!("   selection now: {:?}", view.selected_ids());

    println!("\n4. Reload from disk:");
    let reloaded = view.backend().load()?;
    for m in &reloaded {
        println!("   {} {} ({})", m.id(), m.name, m.status.as_str());
    }

    Ok(())
}
